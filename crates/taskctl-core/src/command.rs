//! The command collaborator contract.
//!
//! A command is a deferred unit of work submitted from one thread and
//! executed on the real-time thread during `Processor::do_step`. The
//! processor never interprets success or failure; it treats the command as
//! consumed once `execute()` returns.

use std::fmt;
use std::sync::Arc;

/// A deferred, one-shot action executed by a `Processor` on its own thread.
///
/// `execute()` must be non-blocking and bounded: it runs on the real-time
/// step and cannot sleep, lock against the step itself, or wait on I/O.
pub trait CommandInterface: Send + Sync {
    /// Perform the action. The processor does not interpret the outcome.
    fn execute(&self);

    /// A short name used only for logging; has no semantic meaning.
    fn label(&self) -> &str {
        "command"
    }
}

/// A handle to a submitted command, compared by pointer identity.
///
/// This is the idiomatic Rust equivalent of the C++ source's raw
/// `CommandInterface*` identity comparison: two handles are "the same
/// command" iff they point at the same allocation.
pub type CommandHandle = Arc<dyn CommandInterface>;

/// Wraps a plain closure as a [`CommandInterface`], for callers that don't
/// want to define a struct for a one-off command.
pub struct FnCommand<F: Fn() + Send + Sync> {
    label: String,
    f: F,
}

impl<F: Fn() + Send + Sync> FnCommand<F> {
    /// Create a new closure-backed command with the given log label.
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F: Fn() + Send + Sync> CommandInterface for FnCommand<F> {
    fn execute(&self) {
        (self.f)();
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for dyn CommandInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandInterface")
            .field("label", &self.label())
            .finish()
    }
}
