// src/lib.rs

//! shopflow: small async step pipelines for order workflows.
//!
//! A [`Pipeline`] is an ordered list of named steps. Each step may carry
//! `before`, `on` and `after` handlers; every handler receives the shared
//! [`ContextData`] and answers with [`PipelineControl::Continue`] or
//! [`PipelineControl::Stop`]. Steps can be optional or skipped by a predicate
//! over the context.
//!
//! Pipelines are registered in a [`Registry`] keyed by their context type, so
//! callers only need to build a context value and call `registry.run(ctx)`.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Registry;
