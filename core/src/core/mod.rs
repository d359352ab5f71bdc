pub mod context;
pub mod control;
pub mod step;

// Re-export key types for easier access from other modules (and lib.rs)
pub use context::{Context, Handler, Key};
pub use control::StepOutput;
pub use step::StepDecl;
