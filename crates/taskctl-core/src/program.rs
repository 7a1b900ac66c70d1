//! The program collaborator contract and the per-processor bookkeeping
//! (`ProgramInfo`) built around it.

use std::fmt;
use std::sync::Arc;

/// An opaque, resumable program stepped by a `Processor`.
///
/// The granularity of one `execute()` call (one instruction, one basic
/// block, ...) is the program's own business; the processor never subdivides
/// it. Both `reset()` and `execute()` must be non-blocking and bounded.
pub trait ProgramInterface: Send + Sync {
    /// Stable name, used as the processor-wide lookup key.
    fn name(&self) -> &str;

    /// Return the program to its initial logical position.
    ///
    /// Only called by the processor while the program is neither `running`
    /// nor `stepping`.
    fn reset(&self);

    /// Advance by one logical step.
    fn execute(&self);
}

/// Per-program bookkeeping owned by a `Processor`.
///
/// Invariants: `name` is unique within the owning processor; the program may
/// not be reset or deleted while `running` or `stepping` is set.
pub struct ProgramInfo {
    name: String,
    program: Arc<dyn ProgramInterface>,
    running: bool,
    stepping: bool,
}

impl ProgramInfo {
    /// Wrap a freshly loaded program. Does not call `reset()`; the caller
    /// (`Processor::load_program`) does that once, after insertion succeeds.
    pub fn new(program: Arc<dyn ProgramInterface>) -> Self {
        let name = program.name().to_string();
        Self {
            name,
            program,
            running: false,
            stepping: false,
        }
    }

    /// The program's stable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the program is in free-running mode.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a single-step execution is pending for the next tick.
    pub fn is_stepping(&self) -> bool {
        self.stepping
    }

    /// A program may be reset or deleted only when neither flag is set.
    pub fn is_idle(&self) -> bool {
        !self.running && !self.stepping
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn set_stepping(&mut self, stepping: bool) {
        self.stepping = stepping;
    }

    pub fn reset(&self) {
        self.program.reset();
    }

    pub fn execute_if_running(&self) {
        if self.running {
            self.program.execute();
        }
    }

    /// Executes once and clears `stepping` if it was set; returns whether it
    /// actually stepped.
    pub fn execute_if_stepping(&mut self) -> bool {
        if self.stepping {
            self.program.execute();
            self.stepping = false;
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for ProgramInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramInfo")
            .field("name", &self.name)
            .field("running", &self.running)
            .field("stepping", &self.stepping)
            .finish()
    }
}
