//! # taskctl-core
//!
//! Core traits, data model, and error types for the taskctl real-time
//! control framework. Provides the fundamental abstractions for programs,
//! state machines, commands, and cross-crate event notification.

pub mod command;
pub mod error;
pub mod event_bus;
pub mod program;
pub mod state_machine;
pub mod types;

pub use command::{CommandHandle, CommandInterface, FnCommand};

pub use program::{ProgramInfo, ProgramInterface};

pub use state_machine::{GState, StateInfo, StateMachineTree};

pub use error::{Error, PeerError, Result, StateMachineError};

// Re-export event bus for convenience.
pub use event_bus::{
    event_bus, AppEvent, CommandEvent, EngineEvent, ErrorEvent, EventBus, EventBusConfig,
    EventCategory, EventFilter, PeerEvent, ProgramEvent, StateMachineEvent, SubscriptionId,
};

// Re-export type aliases for convenience.
pub use types::{
    thread_safe, thread_safe_deque, thread_safe_map, thread_safe_none, thread_safe_rw,
    thread_safe_rw_map, ThreadSafe, ThreadSafeDeque, ThreadSafeMap, ThreadSafeOption,
    ThreadSafeRw, ThreadSafeRwMap,
};
