// stepwise/src/pipeline/mod.rs

//! Defines the `Pipeline<Err>` struct, its construction, modification, and execution logic.

pub mod definition;
pub mod execution;

pub use definition::Pipeline;
pub use execution::pipe;
