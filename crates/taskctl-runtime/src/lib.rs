//! # taskctl-runtime
//!
//! The Processor, ExecutionEngine, and TaskContext runtime built on top of
//! `taskctl-core`'s collaborator traits and data model.

pub mod execution_engine;
pub mod processor;
pub mod task_context;

pub use execution_engine::{ExecutionEngine, QueueId};
pub use processor::Processor;
pub use task_context::{Catalog, TaskContext};
