//! Error handling for the taskctl core
//!
//! Provides per-concern error types for the processor, the task-context peer
//! graph, and the command mailbox. All error types use `thiserror` for
//! ergonomic error handling.

use thiserror::Error;

/// Errors raised while loading or unloading state machines from a `Processor`.
///
/// Control operations other than load/unload report failure through their
/// boolean return value instead of raising; see the Processor API.
#[derive(Error, Debug, Clone)]
pub enum StateMachineError {
    /// `load_state_machine` was given a tree that is not a root.
    #[error("state machine \"{name}\" is not a root: {reason}")]
    NotARoot {
        /// Name of the offending state machine.
        name: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A name collision was found while checking a tree for load.
    #[error("state machine \"{name}\" already loaded: {reason}")]
    DuplicateName {
        /// Name of the offending state machine.
        name: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// `unload_state_machine` / `delete_state_machine` was called on a subtree
    /// that is not fully inactive.
    #[error("state machine \"{name}\" cannot be unloaded: {reason}")]
    NotInactive {
        /// Name of the offending state machine.
        name: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// `unload_state_machine` / `delete_state_machine` found a child that is
    /// not loaded in this processor.
    #[error("state machine \"{name}\" has unloaded children: {reason}")]
    DanglingChild {
        /// Name of the offending state machine.
        name: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// The named state machine is not known to this processor.
    #[error("no such state machine: {0}")]
    NotFound(String),
}

/// Errors raised from the task-context peer graph.
///
/// The primary API (`add_peer`, `connect_peers`, ...) reports failure via a
/// plain `bool`, matching the spec. These variants back the `try_*` API for
/// callers that want to know *why* an operation failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    /// The alias is already bound to a different peer.
    #[error("alias \"{0}\" is already in use")]
    AliasTaken(String),

    /// `connect_peers` was attempted while either side already knows the
    /// other under the default alias.
    #[error("\"{0}\" is already connected to \"{1}\"")]
    AlreadyConnected(String, String),

    /// `disconnect_peers` was attempted while the two sides do not both know
    /// each other.
    #[error("\"{0}\" is not connected to \"{1}\"")]
    NotConnected(String, String),

    /// No peer by that name is known.
    #[error("no such peer: {0}")]
    NotFound(String),
}

/// Unified error type for the taskctl core.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// State machine load/unload failure.
    #[error(transparent)]
    StateMachine(#[from] StateMachineError),

    /// Peer graph failure.
    #[error(transparent)]
    Peer(#[from] PeerError),

    /// Generic error for edge cases not covered above.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Construct an [`Error::Other`] from anything `Display`-able.
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}

/// Result type using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
