// src/lib.rs

//! Stepwise: sequential async action pipelines for deployment scripting.
//!
//! A pipeline threads a string-keyed [`Context`] through an ordered list of
//! steps. Each step sees everything accumulated so far and may return a
//! partial context, which is shallow-merged (last write wins) before the next
//! step starts. The first failing step aborts the run.
//!
//! Around that core the crate provides:
//!  - Declared step inputs and outputs, checked before a run starts.
//!  - Sequential batch helpers for "do this to every item, one at a time".
//!  - Fixed-point USD price conversion on `U256`.
//!  - An opaque contract boundary (`ContractBackend`) with an in-memory backend.
//!  - USD price feeds and a JSON deployment record.
//!  - A name-keyed registry for running scenarios.

pub mod batch;
pub mod contracts;
pub mod core;
pub mod error;
pub mod mock;
pub mod pipeline;
pub mod price_feed;
pub mod pricing;
pub mod record;
pub mod registry;

// --- Re-exports for the Public API ---

pub use crate::core::context::{Context, Handler, Key};
pub use crate::core::control::StepOutput;
pub use crate::core::step::StepDecl;

pub use crate::pipeline::definition::Pipeline;
pub use crate::pipeline::execution::pipe;

pub use crate::batch::{map_sequentially, run_sequentially, run_until_missing};

pub use crate::contracts::{Contract, ContractBackend, ContractFactory, SharedBackend, Signer, Token, TxReceipt};
pub use crate::mock::MockBackend;
pub use crate::price_feed::{CoinGeckoFeed, PriceFeed, StaticFeed};
pub use crate::pricing::{ExchangeRate, PriceQuote, PricingError, UsdPrice};
pub use crate::record::DeploymentRecord;

pub use crate::error::{StepwiseError, StepwiseResult};

pub use crate::registry::Registry;

/*
    Core Workflow:
    1. Declare context keys as constants: `const GAC: Key<Contract> = Key::new("gac");`
    2. Create a `Pipeline<MyError>` from `StepDecl`s, naming what each step reads and produces.
    3. Register async handlers with `.on()`, or logging observers with `.observe()`.
    4. Register the pipeline in a `Registry` under a scenario name, or keep it standalone.
    5. Build the initial `Context` and `run` it. The final context comes back on success.
*/
