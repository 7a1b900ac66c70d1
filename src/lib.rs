//! # taskctl
//!
//! A component-based real-time control framework for robotics and
//! machine-control applications. A running system is a set of named *task
//! contexts* exposing commands, methods, attributes, and events to each
//! other, hosting user-defined programs and hierarchical state machines
//! interpreted by a per-task execution engine.
//!
//! ## Architecture
//!
//! taskctl is organized as a workspace with multiple crates:
//!
//! 1. **taskctl-core** - Collaborator traits, data model, event bus, errors
//! 2. **taskctl-runtime** - Processor, ExecutionEngine, TaskContext peer graph
//! 3. **taskctl-config** - EngineConfig loading and persistence
//! 4. **taskctl** - Demo activity binary wiring the above together
//!
//! ## Scheduling model
//!
//! One dedicated real-time thread per `ExecutionEngine`, periodically
//! invoking `step()`. That thread alone executes programs, state-machine
//! transitions, and dequeued commands; other threads only enqueue commands
//! and read catalog data.

#![allow(dead_code)]

pub use taskctl_config::EngineConfig;
pub use taskctl_core::{
    AppEvent, CommandHandle, CommandInterface, Error, FnCommand, GState, ProgramInfo,
    ProgramInterface, Result, StateInfo, StateMachineTree,
};
pub use taskctl_runtime::{ExecutionEngine, Processor, TaskContext};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time).
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration.
///
/// Sets up structured logging with console output, `RUST_LOG`
/// environment-variable support, and a directive derived from an
/// [`EngineConfig`]'s `log_level`.
pub fn init_logging(config: &EngineConfig) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_directive = config.log_level.parse().unwrap_or_else(|_| {
        tracing::Level::INFO.into()
    });
    let env_filter = EnvFilter::from_default_env().add_directive(default_directive);

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
