// citadel_deploy/src/models/mod.rs
pub mod deployment;
pub mod roles;
pub mod token_in;
