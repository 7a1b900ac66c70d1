//! Event type definitions for the event bus.
//!
//! This module defines all application events organized by category.
//! Events are designed to be cloneable and serializable for logging/replay.

use serde::{Deserialize, Serialize};

/// Root event enum for all application events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AppEvent {
    /// Program lifecycle events.
    Program(ProgramEvent),
    /// State machine lifecycle and transition events.
    StateMachine(StateMachineEvent),
    /// Command mailbox events.
    Command(CommandEvent),
    /// Task context peer graph events.
    Peer(PeerEvent),
    /// Execution engine lifecycle events.
    Engine(EngineEvent),
    /// Error and diagnostic events.
    Error(ErrorEvent),
}

impl AppEvent {
    /// Get the category of this event.
    pub fn category(&self) -> EventCategory {
        match self {
            AppEvent::Program(_) => EventCategory::Program,
            AppEvent::StateMachine(_) => EventCategory::StateMachine,
            AppEvent::Command(_) => EventCategory::Command,
            AppEvent::Peer(_) => EventCategory::Peer,
            AppEvent::Engine(_) => EventCategory::Engine,
            AppEvent::Error(_) => EventCategory::Error,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            AppEvent::Program(e) => e.description(),
            AppEvent::StateMachine(e) => e.description(),
            AppEvent::Command(e) => e.description(),
            AppEvent::Peer(e) => e.description(),
            AppEvent::Engine(e) => e.description(),
            AppEvent::Error(e) => e.description(),
        }
    }
}

/// Event category for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Program lifecycle events.
    Program,
    /// State machine lifecycle and transition events.
    StateMachine,
    /// Command mailbox events.
    Command,
    /// Task context peer graph events.
    Peer,
    /// Execution engine lifecycle events.
    Engine,
    /// Error and diagnostic events.
    Error,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Program => write!(f, "Program"),
            EventCategory::StateMachine => write!(f, "StateMachine"),
            EventCategory::Command => write!(f, "Command"),
            EventCategory::Peer => write!(f, "Peer"),
            EventCategory::Engine => write!(f, "Engine"),
            EventCategory::Error => write!(f, "Error"),
        }
    }
}

/// Program lifecycle events, emitted by a `Processor` around its program
/// table mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgramEvent {
    /// A program was loaded.
    Loaded {
        /// Program name.
        name: String,
    },
    /// A program was unloaded.
    Unloaded {
        /// Program name.
        name: String,
    },
    /// A program started free-running.
    Started {
        /// Program name.
        name: String,
    },
    /// A program was stopped.
    Stopped {
        /// Program name.
        name: String,
    },
    /// A single step was requested.
    SteppingRequested {
        /// Program name.
        name: String,
    },
    /// A program was reset to its initial logical position.
    Reset {
        /// Program name.
        name: String,
    },
}

impl ProgramEvent {
    fn description(&self) -> String {
        match self {
            ProgramEvent::Loaded { name } => format!("Program loaded: {}", name),
            ProgramEvent::Unloaded { name } => format!("Program unloaded: {}", name),
            ProgramEvent::Started { name } => format!("Program started: {}", name),
            ProgramEvent::Stopped { name } => format!("Program stopped: {}", name),
            ProgramEvent::SteppingRequested { name } => format!("Program step requested: {}", name),
            ProgramEvent::Reset { name } => format!("Program reset: {}", name),
        }
    }
}

/// State machine lifecycle and transition events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StateMachineEvent {
    /// A state machine was loaded into a processor.
    Loaded {
        /// State machine name.
        name: String,
    },
    /// A state machine was unloaded.
    Unloaded {
        /// State machine name.
        name: String,
    },
    /// A state machine moved from `Inactive` to `Active`.
    Activated {
        /// State machine name.
        name: String,
    },
    /// A state machine moved from `Stopped` back to `Inactive`.
    Deactivated {
        /// State machine name.
        name: String,
    },
    /// A state machine started or resumed running.
    Started {
        /// State machine name.
        name: String,
    },
    /// A state machine was paused.
    Paused {
        /// State machine name.
        name: String,
    },
    /// A state machine was stopped.
    Stopped {
        /// State machine name.
        name: String,
    },
    /// A state machine was reset to its initial state.
    Reset {
        /// State machine name.
        name: String,
    },
    /// The internal current state changed.
    Transitioned {
        /// State machine name.
        name: String,
        /// Previous internal state name.
        from: String,
        /// New internal state name.
        to: String,
    },
}

impl StateMachineEvent {
    fn description(&self) -> String {
        match self {
            StateMachineEvent::Loaded { name } => format!("State machine loaded: {}", name),
            StateMachineEvent::Unloaded { name } => format!("State machine unloaded: {}", name),
            StateMachineEvent::Activated { name } => format!("State machine activated: {}", name),
            StateMachineEvent::Deactivated { name } => format!("State machine deactivated: {}", name),
            StateMachineEvent::Started { name } => format!("State machine started: {}", name),
            StateMachineEvent::Paused { name } => format!("State machine paused: {}", name),
            StateMachineEvent::Stopped { name } => format!("State machine stopped: {}", name),
            StateMachineEvent::Reset { name } => format!("State machine reset: {}", name),
            StateMachineEvent::Transitioned { name, from, to } => {
                format!("{}: {} -> {}", name, from, to)
            }
        }
    }
}

/// Command mailbox events, emitted by a `Processor::do_step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommandEvent {
    /// A command was accepted into the mailbox.
    Accepted {
        /// The command's log label.
        label: String,
    },
    /// A command was rejected because the mailbox was occupied.
    Rejected {
        /// The command's log label.
        label: String,
    },
    /// A command was executed on the real-time step.
    Executed {
        /// The command's log label.
        label: String,
    },
    /// A queued command was abandoned before it executed.
    Abandoned {
        /// The command's log label.
        label: String,
    },
}

impl CommandEvent {
    fn description(&self) -> String {
        match self {
            CommandEvent::Accepted { label } => format!("Command accepted: {}", label),
            CommandEvent::Rejected { label } => format!("Command rejected: {}", label),
            CommandEvent::Executed { label } => format!("Command executed: {}", label),
            CommandEvent::Abandoned { label } => format!("Command abandoned: {}", label),
        }
    }
}

/// Task context peer graph events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PeerEvent {
    /// A peer was added to a task context's peer map.
    Added {
        /// Name of the task context the peer was added to.
        owner: String,
        /// Name (alias) of the added peer.
        peer: String,
    },
    /// A peer was removed from a task context's peer map.
    Removed {
        /// Name of the task context the peer was removed from.
        owner: String,
        /// Name (alias) of the removed peer.
        peer: String,
    },
    /// Two task contexts were connected as mutual peers.
    Connected {
        /// First task context's name.
        a: String,
        /// Second task context's name.
        b: String,
    },
    /// Two task contexts were disconnected.
    Disconnected {
        /// First task context's name.
        a: String,
        /// Second task context's name.
        b: String,
    },
}

impl PeerEvent {
    fn description(&self) -> String {
        match self {
            PeerEvent::Added { owner, peer } => format!("{} gained peer {}", owner, peer),
            PeerEvent::Removed { owner, peer } => format!("{} lost peer {}", owner, peer),
            PeerEvent::Connected { a, b } => format!("{} <-> {} connected", a, b),
            PeerEvent::Disconnected { a, b } => format!("{} <-> {} disconnected", a, b),
        }
    }
}

/// Execution engine lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// The engine's periodic driver started.
    Started {
        /// Configured tick period, in milliseconds.
        tick_period_ms: u64,
    },
    /// The engine's periodic driver stopped.
    Stopped,
    /// A tick took longer than its configured budget.
    TickOverrun {
        /// Actual tick duration, in milliseconds.
        actual_ms: u64,
        /// Configured tick budget, in milliseconds.
        budget_ms: u64,
    },
}

impl EngineEvent {
    fn description(&self) -> String {
        match self {
            EngineEvent::Started { tick_period_ms } => {
                format!("Engine started at {} ms/tick", tick_period_ms)
            }
            EngineEvent::Stopped => "Engine stopped".to_string(),
            EngineEvent::TickOverrun {
                actual_ms,
                budget_ms,
            } => format!("Tick overrun: {} ms (budget {} ms)", actual_ms, budget_ms),
        }
    }
}

/// Error severity levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Non-critical warning that does not block operation.
    Warning,
    /// Error that may be recoverable.
    Error,
    /// Critical error requiring immediate attention.
    Critical,
}

/// Error and diagnostic events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ErrorEvent {
    /// Warning (non-blocking).
    Warning {
        /// Warning code identifier.
        code: String,
        /// Human-readable warning message.
        message: String,
    },
    /// Error (may be recoverable).
    Error {
        /// Error code identifier.
        code: String,
        /// Human-readable error message.
        message: String,
        /// Whether recovery is possible without user intervention.
        recoverable: bool,
    },
    /// Critical error (requires attention).
    Critical {
        /// Critical error code identifier.
        code: String,
        /// Human-readable critical error message.
        message: String,
    },
}

impl ErrorEvent {
    fn description(&self) -> String {
        match self {
            ErrorEvent::Warning { code, message } => format!("Warning [{}]: {}", code, message),
            ErrorEvent::Error { code, message, .. } => format!("Error [{}]: {}", code, message),
            ErrorEvent::Critical { code, message } => format!("Critical [{}]: {}", code, message),
        }
    }

    /// Get the severity of this error event.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ErrorEvent::Warning { .. } => ErrorSeverity::Warning,
            ErrorEvent::Error { .. } => ErrorSeverity::Error,
            ErrorEvent::Critical { .. } => ErrorSeverity::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_category() {
        let event = AppEvent::Program(ProgramEvent::Started {
            name: "main".to_string(),
        });
        assert_eq!(event.category(), EventCategory::Program);

        let event = AppEvent::StateMachine(StateMachineEvent::Activated {
            name: "supervisor".to_string(),
        });
        assert_eq!(event.category(), EventCategory::StateMachine);
    }

    #[test]
    fn test_event_description() {
        let event = AppEvent::Peer(PeerEvent::Connected {
            a: "arm".to_string(),
            b: "gripper".to_string(),
        });
        assert!(event.description().contains("arm"));
        assert!(event.description().contains("gripper"));
    }

    #[test]
    fn test_event_serialization() {
        let event = AppEvent::Command(CommandEvent::Accepted {
            label: "home".to_string(),
        });
        let json = serde_json::to_string(&event).expect("should serialize");
        let parsed: AppEvent = serde_json::from_str(&json).expect("should deserialize");

        if let AppEvent::Command(CommandEvent::Accepted { label }) = parsed {
            assert_eq!(label, "home");
        } else {
            panic!("wrong event type after deserialization");
        }
    }

    #[test]
    fn test_error_severity() {
        let warning = ErrorEvent::Warning {
            code: "W001".to_string(),
            message: "Test".to_string(),
        };
        assert_eq!(warning.severity(), ErrorSeverity::Warning);

        let error = ErrorEvent::Error {
            code: "E001".to_string(),
            message: "Test".to_string(),
            recoverable: true,
        };
        assert_eq!(error.severity(), ErrorSeverity::Error);

        let critical = ErrorEvent::Critical {
            code: "C001".to_string(),
            message: "Test".to_string(),
        };
        assert_eq!(critical.severity(), ErrorSeverity::Critical);
    }
}
