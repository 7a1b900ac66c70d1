//! A thin, `Arc`-shareable facade over a [`Processor`], serializing access
//! for the `TaskContext`s that share it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use taskctl_core::event_bus::{event_bus, AppEvent, EngineEvent};
use taskctl_core::CommandHandle;

use crate::processor::Processor;

/// A command's queue position, returned by [`ExecutionEngine::queue_command`].
/// `0` means the command was rejected (mailbox full or engine stopped).
pub type QueueId = u64;

/// Serializes access to a [`Processor`] so multiple `TaskContext`s can share
/// one real-time thread of control.
///
/// Mirrors the teacher's engine/processor split: the engine owns the
/// run/stop flag and the monotonically increasing queue-id counter; the
/// processor owns the program, state-machine, and mailbox tables.
pub struct ExecutionEngine {
    processor: Processor,
    running: AtomicBool,
    next_id: AtomicU64,
}

impl ExecutionEngine {
    /// Create a stopped engine wrapping an empty processor.
    pub fn new() -> Self {
        Self {
            processor: Processor::new(),
            running: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    /// Wrap in an `Arc` for sharing across `TaskContext`s.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Access the underlying processor for program/state-machine management.
    pub fn processor(&self) -> &Processor {
        &self.processor
    }

    /// Mark the engine running and publish [`EngineEvent::Started`].
    pub fn start(&self, tick_period_ms: u64) {
        self.running.store(true, Ordering::SeqCst);
        event_bus()
            .publish(AppEvent::Engine(EngineEvent::Started { tick_period_ms }))
            .ok();
    }

    /// Mark the engine stopped and publish [`EngineEvent::Stopped`].
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        event_bus().publish(AppEvent::Engine(EngineEvent::Stopped)).ok();
    }

    /// Whether [`Self::start`] has been called without a matching
    /// [`Self::stop`].
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Advance the wrapped processor by one tick. No-op while stopped.
    pub fn step(&self) {
        if self.is_running() {
            self.processor.do_step();
        }
    }

    /// Submit a command for execution on the next tick. Returns a nonzero
    /// id on acceptance, `0` if the engine is stopped or the mailbox is
    /// already occupied.
    pub fn queue_command(&self, command: CommandHandle) -> QueueId {
        if !self.is_running() {
            return 0;
        }
        if self.processor.process(command) {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        } else {
            0
        }
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskctl_core::FnCommand;

    #[test]
    fn queue_command_rejected_while_stopped() {
        let engine = ExecutionEngine::new();
        let cmd: CommandHandle = Arc::new(FnCommand::new("c", || {}));
        assert_eq!(engine.queue_command(cmd), 0);
    }

    #[test]
    fn queue_command_assigns_increasing_ids_once_started() {
        let engine = ExecutionEngine::new();
        engine.start(10);
        let c1: CommandHandle = Arc::new(FnCommand::new("c1", || {}));
        let id1 = engine.queue_command(c1);
        assert_ne!(id1, 0);

        engine.step();
        let c2: CommandHandle = Arc::new(FnCommand::new("c2", || {}));
        let id2 = engine.queue_command(c2);
        assert!(id2 > id1);
    }

    #[test]
    fn step_is_noop_while_stopped() {
        use std::sync::atomic::{AtomicUsize, Ordering as O};
        use taskctl_core::ProgramInterface;

        struct P(AtomicUsize);
        impl ProgramInterface for P {
            fn name(&self) -> &str {
                "p"
            }
            fn reset(&self) {}
            fn execute(&self) {
                self.0.fetch_add(1, O::SeqCst);
            }
        }

        let engine = ExecutionEngine::new();
        let p = Arc::new(P(AtomicUsize::new(0)));
        engine.processor().load_program(p.clone());
        engine.processor().start_program("p");
        engine.step();
        assert_eq!(p.0.load(O::SeqCst), 0, "stopped engine must not step");

        engine.start(10);
        engine.step();
        assert_eq!(p.0.load(O::SeqCst), 1);
    }
}
