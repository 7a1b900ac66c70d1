//! The state-machine collaborator contract and the per-processor bookkeeping
//! (`StateInfo`) that drives it through the lifecycle in the module docs.
//!
//! State diagram (per loaded state machine):
//!
//! ```text
//! inactive --activate--> active --start--> running
//!    ^                     ^  ^               |
//!    |                     |  |--- reset -----+
//! deactivate               |                  |
//!    |                     +-- pause <--------+
//! stopped <------- stop ---+                  |
//!    ^                                        |
//!    +-------------- stop --------------------+
//! ```
//!
//! Any transition not shown is rejected: the owning `Processor` control call
//! returns `false` without touching `gstate`.

use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Caps fixpoint-seeking in [`perform_due_work`] so a misbehaving
/// `StateMachineTree` (one whose transitions never stabilize) cannot hang the
/// real-time thread. Not part of the documented state diagram; a defensive
/// addition only.
const MAX_FIXPOINT_ITERATIONS: usize = 10_000;

/// An opaque hierarchical state container driven by a `Processor`.
///
/// `request_next_state` must be non-blocking and bounded: it is the
/// processor's only way to advance a machine and runs on the real-time step.
pub trait StateMachineTree: Send + Sync {
    /// Stable name, used as the processor-wide lookup key.
    fn name(&self) -> &str;

    /// Bring the whole subtree into its initial inactive representation.
    fn activate(&self);

    /// Bring the whole subtree out of its inactive representation.
    fn deactivate(&self);

    /// Transition to the designated start state.
    fn request_initial_state(&self);

    /// Transition to the designated end state.
    fn request_final_state(&self);

    /// Evaluate all outgoing transitions of the current state and move once.
    /// Returns the resulting current state name (possibly unchanged, meaning
    /// no transition was enabled).
    fn request_next_state(&self) -> String;

    /// Observe the current state name without mutation.
    fn current_state(&self) -> String;

    /// The parent of this node, or `None` if this is a root.
    fn parent(&self) -> Option<Arc<dyn StateMachineTree>>;

    /// Direct children of this node, in no particular required order.
    fn children(&self) -> Vec<Arc<dyn StateMachineTree>>;
}

/// The "global" lifecycle state of a loaded state machine, distinct from
/// whatever internal state the `StateMachineTree` itself is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GState {
    /// Loaded but not yet activated; the tree has no internal state.
    Inactive,
    /// Activated, not yet started.
    Active,
    /// Started; `run` is being driven every tick.
    Running,
    /// Stopped via `request_final_state`; may be reset or deactivated.
    Stopped,
    /// Paused mid-run; may be stopped or resumed via `start`.
    Paused,
    /// Set by `Processor::delete_state_machine` on every node of the
    /// target subtree immediately before it is dropped from the table,
    /// once the `Inactive`/all-children-loaded preconditions have already
    /// been checked. Observable only to a `gstate()` caller racing the
    /// delete under the same structural lock; never the steady state of a
    /// loaded machine.
    ToDelete,
}

/// A pending, one-shot or persistent action installed by a control call and
/// consumed by the processor on its next tick.
///
/// `Start` is special: once taken, it reinstalls itself as `Run` so the
/// processor keeps driving the machine on every subsequent tick until a
/// `pause` or `stop` clears the slot. `activate`/`deactivate` are not
/// represented here — they take effect immediately, outside the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAction {
    Start,
    Run,
    Pause,
    Stop,
    Reset,
}

/// A unit of collaborator-facing work extracted from a `StateInfo` while its
/// processor-side bookkeeping lock is held, to be run after the lock is
/// released. Keeps the structural lock's critical section to bookkeeping
/// only, never to user code.
pub enum DueWork {
    /// Advance by exactly one transition.
    RunOnce(Arc<dyn StateMachineTree>),
    /// Advance until two successive transitions agree, capped defensively.
    RunToFixpoint(Arc<dyn StateMachineTree>),
    /// Transition to the designated end state.
    Stop(Arc<dyn StateMachineTree>),
    /// Transition to the designated start state.
    Reset(Arc<dyn StateMachineTree>),
}

/// Run a [`DueWork`] item. Must be called without the owning processor's
/// state-machine lock held.
pub fn perform_due_work(work: DueWork, name: &str) {
    match work {
        DueWork::RunOnce(tree) => {
            tree.request_next_state();
        }
        DueWork::RunToFixpoint(tree) => {
            let mut current = tree.current_state();
            for _ in 0..MAX_FIXPOINT_ITERATIONS {
                let next = tree.request_next_state();
                if next == current {
                    return;
                }
                current = next;
            }
            warn!(
                state_machine = %name,
                "request_next_state did not reach a fixpoint after {} iterations; giving up for this tick",
                MAX_FIXPOINT_ITERATIONS
            );
        }
        DueWork::Stop(tree) => tree.request_final_state(),
        DueWork::Reset(tree) => tree.request_initial_state(),
    }
}

/// Per-state-machine bookkeeping owned by a `Processor`.
pub struct StateInfo {
    name: String,
    tree: Arc<dyn StateMachineTree>,
    gstate: GState,
    action: Option<PendingAction>,
    stepping: bool,
}

impl StateInfo {
    /// Wrap a freshly loaded (but not yet registered) state machine node.
    /// Stepping defaults to `true`, matching the source.
    pub fn new(tree: Arc<dyn StateMachineTree>) -> Self {
        let name = tree.name().to_string();
        Self {
            name,
            tree,
            gstate: GState::Inactive,
            action: None,
            stepping: true,
        }
    }

    /// The state machine's stable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying collaborator tree.
    pub fn tree(&self) -> &Arc<dyn StateMachineTree> {
        &self.tree
    }

    /// Current lifecycle state.
    pub fn gstate(&self) -> GState {
        self.gstate
    }

    /// Whether single-transition-per-tick mode is enabled.
    pub fn is_stepping(&self) -> bool {
        self.stepping
    }

    pub fn set_stepping(&mut self, stepping: bool) {
        self.stepping = stepping;
    }

    /// `activate` is immediate: no deferral through the action slot.
    /// Returns `false` (no-op) unless currently `Inactive`.
    pub fn try_activate(&mut self) -> bool {
        if self.gstate != GState::Inactive {
            return false;
        }
        self.tree.activate();
        self.action = None;
        self.gstate = GState::Active;
        true
    }

    /// `deactivate` is immediate. Returns `false` unless currently `Stopped`.
    pub fn try_deactivate(&mut self) -> bool {
        if self.gstate != GState::Stopped {
            return false;
        }
        self.tree.deactivate();
        self.action = None;
        self.gstate = GState::Inactive;
        true
    }

    /// Schedule `start`. Returns `false` unless currently `Active`.
    pub fn try_start(&mut self) -> bool {
        if self.gstate != GState::Active {
            return false;
        }
        self.action = Some(PendingAction::Start);
        true
    }

    /// Schedule `pause`. Returns `false` unless currently `Running`.
    pub fn try_pause(&mut self) -> bool {
        if self.gstate != GState::Running {
            return false;
        }
        self.action = Some(PendingAction::Pause);
        true
    }

    /// Schedule `stop`. Returns `false` unless currently `Paused`, `Active`,
    /// or `Running`.
    pub fn try_stop(&mut self) -> bool {
        if !matches!(self.gstate, GState::Paused | GState::Active | GState::Running) {
            return false;
        }
        self.action = Some(PendingAction::Stop);
        true
    }

    /// Schedule `reset`. Returns `false` unless currently `Stopped`.
    pub fn try_reset(&mut self) -> bool {
        if self.gstate != GState::Stopped {
            return false;
        }
        self.action = Some(PendingAction::Reset);
        true
    }

    /// Consume the pending action, if any, applying its `gstate`/`action`
    /// bookkeeping synchronously and returning the collaborator-facing work
    /// (if any) for the caller to run once the structural lock is released.
    pub fn take_due_work(&mut self) -> Option<DueWork> {
        let action = self.action?;
        match action {
            PendingAction::Start => {
                self.gstate = GState::Running;
                self.action = Some(PendingAction::Run);
                Some(self.run_work())
            }
            PendingAction::Run => Some(self.run_work()),
            PendingAction::Pause => {
                self.gstate = GState::Paused;
                self.action = None;
                None
            }
            PendingAction::Stop => {
                self.gstate = GState::Stopped;
                self.action = None;
                Some(DueWork::Stop(self.tree.clone()))
            }
            PendingAction::Reset => {
                self.gstate = GState::Active;
                self.action = None;
                Some(DueWork::Reset(self.tree.clone()))
            }
        }
    }

    /// Mark this entry for removal. Called by `Processor::delete_state_machine`
    /// only after confirming the node is `Inactive`; the processor drops the
    /// entry from its table in the same call.
    pub fn mark_to_delete(&mut self) {
        self.gstate = GState::ToDelete;
        self.action = None;
    }

    fn run_work(&self) -> DueWork {
        if self.stepping {
            DueWork::RunOnce(self.tree.clone())
        } else {
            DueWork::RunToFixpoint(self.tree.clone())
        }
    }
}

impl fmt::Debug for StateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateInfo")
            .field("name", &self.name)
            .field("gstate", &self.gstate)
            .field("stepping", &self.stepping)
            .field("has_pending_action", &self.action.is_some())
            .finish()
    }
}
