//! The per-tick scheduler: owns the program table, the state-machine table,
//! and the single-slot external command mailbox.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use taskctl_core::event_bus::{event_bus, AppEvent, CommandEvent, ProgramEvent, StateMachineEvent};
use taskctl_core::state_machine::{perform_due_work, DueWork, GState, StateInfo, StateMachineTree};
use taskctl_core::{
    CommandHandle, Error, ProgramInfo, ProgramInterface, Result, StateMachineError,
};

/// Owns an ordered program table, an ordered state-machine table, and a
/// single-slot command mailbox. Advanced once per tick by [`Processor::do_step`].
///
/// Two `parking_lot::Mutex`es guard the program and state-machine lists
/// respectively; both are held only across list scans/mutation, never across
/// a call into collaborator code (`ProgramInterface::execute`,
/// `StateMachineTree::request_next_state`, `CommandInterface::execute`).
pub struct Processor {
    programs: Mutex<Vec<ProgramInfo>>,
    state_machines: Mutex<Vec<StateInfo>>,
    mailbox: Mutex<Option<CommandHandle>>,
}

impl Processor {
    /// Create an empty processor.
    pub fn new() -> Self {
        Self {
            programs: Mutex::new(Vec::new()),
            state_machines: Mutex::new(Vec::new()),
            mailbox: Mutex::new(None),
        }
    }

    // ---- program management -------------------------------------------

    /// Register `p` if its name is unused; calls `p.reset()` on success.
    pub fn load_program(&self, p: Arc<dyn ProgramInterface>) -> bool {
        let mut programs = self.programs.lock();
        let name = p.name().to_string();
        if programs.iter().any(|info| info.name() == name) {
            return false;
        }
        p.reset();
        programs.push(ProgramInfo::new(p));
        drop(programs);
        event_bus()
            .publish(AppEvent::Program(ProgramEvent::Loaded { name }))
            .ok();
        true
    }

    /// Set `running = true` on the named program.
    pub fn start_program(&self, name: &str) -> bool {
        let changed = self.with_program_mut(name, |info| info.set_running(true));
        if changed {
            event_bus()
                .publish(AppEvent::Program(ProgramEvent::Started {
                    name: name.to_string(),
                }))
                .ok();
        }
        changed
    }

    /// Set `running = false` on the named program.
    pub fn stop_program(&self, name: &str) -> bool {
        let changed = self.with_program_mut(name, |info| info.set_running(false));
        if changed {
            event_bus()
                .publish(AppEvent::Program(ProgramEvent::Stopped {
                    name: name.to_string(),
                }))
                .ok();
        }
        changed
    }

    /// Request a single step on the next tick. Aliased as [`Self::next_step`]
    /// to match both names the spec gives this one operation.
    pub fn start_stepping(&self, name: &str) -> bool {
        let changed = self.with_program_mut(name, |info| info.set_stepping(true));
        if changed {
            event_bus()
                .publish(AppEvent::Program(ProgramEvent::SteppingRequested {
                    name: name.to_string(),
                }))
                .ok();
        }
        changed
    }

    /// Alias of [`Self::start_stepping`].
    pub fn next_step(&self, name: &str) -> bool {
        self.start_stepping(name)
    }

    /// Observe whether the named program is free-running.
    pub fn is_program_running(&self, name: &str) -> bool {
        self.programs
            .lock()
            .iter()
            .find(|info| info.name() == name)
            .is_some_and(|info| info.is_running())
    }

    /// Reset the named program. Allowed only when neither `running` nor
    /// `stepping` is set.
    pub fn reset_program(&self, name: &str) -> bool {
        let mut programs = self.programs.lock();
        let Some(info) = programs.iter().find(|info| info.name() == name) else {
            return false;
        };
        if !info.is_idle() {
            return false;
        }
        info.reset();
        drop(programs);
        event_bus()
            .publish(AppEvent::Program(ProgramEvent::Reset {
                name: name.to_string(),
            }))
            .ok();
        true
    }

    /// Delete the named program. Allowed only when neither `running` nor
    /// `stepping` is set.
    pub fn delete_program(&self, name: &str) -> bool {
        let mut programs = self.programs.lock();
        let Some(idx) = programs.iter().position(|info| info.name() == name) else {
            return false;
        };
        if !programs[idx].is_idle() {
            return false;
        }
        programs.remove(idx);
        drop(programs);
        event_bus()
            .publish(AppEvent::Program(ProgramEvent::Unloaded {
                name: name.to_string(),
            }))
            .ok();
        true
    }

    /// Enumerate program names in load order.
    pub fn program_list(&self) -> Vec<String> {
        self.programs
            .lock()
            .iter()
            .map(|info| info.name().to_string())
            .collect()
    }

    fn with_program_mut(&self, name: &str, f: impl FnOnce(&mut ProgramInfo)) -> bool {
        let mut programs = self.programs.lock();
        match programs.iter_mut().find(|info| info.name() == name) {
            Some(info) => {
                f(info);
                true
            }
            None => false,
        }
    }

    // ---- state machine management --------------------------------------

    /// Load a root state machine, recursively registering its subtree.
    ///
    /// Two-phase: a check pass fails the whole operation immediately on the
    /// first name collision (covering the entire subtree, not just the
    /// colliding node); only if the check passes does an insert pass run,
    /// children before parents. Partial failure leaves the processor
    /// unchanged.
    pub fn load_state_machine(&self, root: Arc<dyn StateMachineTree>) -> Result<bool> {
        if root.parent().is_some() {
            let name = root.name().to_string();
            warn!(state_machine = %name, "load_state_machine given a non-root node");
            return Err(Error::StateMachine(StateMachineError::NotARoot {
                name,
                reason: "state machine has a parent".to_string(),
            }));
        }

        let subtree = collect_subtree_post_order(&root);

        let mut state_machines = self.state_machines.lock();
        let mut seen_in_batch = std::collections::HashSet::new();
        for node in &subtree {
            let name = node.name().to_string();
            let already_loaded = state_machines.iter().any(|info| info.name() == name);
            if already_loaded || !seen_in_batch.insert(name.clone()) {
                warn!(state_machine = %name, "load_state_machine: duplicate name");
                return Err(Error::StateMachine(StateMachineError::DuplicateName {
                    name,
                    reason: "a state machine with this name is already loaded".to_string(),
                }));
            }
        }

        for node in subtree {
            let name = node.name().to_string();
            state_machines.push(StateInfo::new(node));
            drop_publish(AppEvent::StateMachine(StateMachineEvent::Loaded { name }));
        }
        Ok(true)
    }

    /// `activate_state_machine`: from `Inactive` only, immediate.
    pub fn activate_state_machine(&self, name: &str) -> bool {
        let changed = self.with_state_mut(name, |info| info.try_activate());
        if changed {
            drop_publish(AppEvent::StateMachine(StateMachineEvent::Activated {
                name: name.to_string(),
            }));
        }
        changed
    }

    /// `deactivate_state_machine`: from `Stopped` only, immediate.
    pub fn deactivate_state_machine(&self, name: &str) -> bool {
        let changed = self.with_state_mut(name, |info| info.try_deactivate());
        if changed {
            drop_publish(AppEvent::StateMachine(StateMachineEvent::Deactivated {
                name: name.to_string(),
            }));
        }
        changed
    }

    /// `start_state_machine`: from `Active` only, deferred.
    pub fn start_state_machine(&self, name: &str) -> bool {
        let changed = self.with_state_mut(name, |info| info.try_start());
        if changed {
            drop_publish(AppEvent::StateMachine(StateMachineEvent::Started {
                name: name.to_string(),
            }));
        }
        changed
    }

    /// `pause_state_machine`: from `Running` only, deferred.
    pub fn pause_state_machine(&self, name: &str) -> bool {
        let changed = self.with_state_mut(name, |info| info.try_pause());
        if changed {
            drop_publish(AppEvent::StateMachine(StateMachineEvent::Paused {
                name: name.to_string(),
            }));
        }
        changed
    }

    /// `stop_state_machine`: from `Paused | Active | Running`, deferred.
    pub fn stop_state_machine(&self, name: &str) -> bool {
        let changed = self.with_state_mut(name, |info| info.try_stop());
        if changed {
            drop_publish(AppEvent::StateMachine(StateMachineEvent::Stopped {
                name: name.to_string(),
            }));
        }
        changed
    }

    /// `reset_state_machine`: from `Stopped` only, deferred.
    pub fn reset_state_machine(&self, name: &str) -> bool {
        let changed = self.with_state_mut(name, |info| info.try_reset());
        if changed {
            drop_publish(AppEvent::StateMachine(StateMachineEvent::Reset {
                name: name.to_string(),
            }));
        }
        changed
    }

    /// Enable single-transition-per-tick mode.
    pub fn stepped_state_machine(&self, name: &str) -> bool {
        self.with_state_mut(name, |info| {
            info.set_stepping(true);
            true
        })
    }

    /// Enable run-to-fixpoint-per-tick mode.
    pub fn continuous_state_machine(&self, name: &str) -> bool {
        self.with_state_mut(name, |info| {
            info.set_stepping(false);
            true
        })
    }

    /// Observe whether the named state machine is `Running`.
    pub fn is_state_machine_running(&self, name: &str) -> bool {
        self.state_machines
            .lock()
            .iter()
            .find(|info| info.name() == name)
            .is_some_and(|info| info.gstate() == GState::Running)
    }

    /// Observe whether the named state machine is in stepping mode.
    pub fn is_state_machine_stepped(&self, name: &str) -> bool {
        self.state_machines
            .lock()
            .iter()
            .find(|info| info.name() == name)
            .is_some_and(|info| info.is_stepping())
    }

    /// Enumerate state machine names in load order.
    pub fn state_machine_list(&self) -> Vec<String> {
        self.state_machines
            .lock()
            .iter()
            .map(|info| info.name().to_string())
            .collect()
    }

    /// Unload a root state machine: requires the whole subtree `Inactive`
    /// and every child currently loaded in this processor.
    pub fn unload_state_machine(&self, name: &str) -> Result<bool> {
        self.remove_state_machine(name, false)
    }

    /// Same preconditions as [`Self::unload_state_machine`], additionally
    /// dropping the owning `Arc<dyn StateMachineTree>`.
    pub fn delete_state_machine(&self, name: &str) -> Result<bool> {
        self.remove_state_machine(name, true)
    }

    fn remove_state_machine(&self, name: &str, delete: bool) -> Result<bool> {
        let mut state_machines = self.state_machines.lock();
        let Some(idx) = state_machines.iter().position(|info| info.name() == name) else {
            return Err(Error::StateMachine(StateMachineError::NotFound(
                name.to_string(),
            )));
        };
        let root = state_machines[idx].tree().clone();
        let subtree = collect_subtree_post_order(&root);

        for node in &subtree {
            let node_name = node.name();
            let Some(node_info) = state_machines.iter().find(|info| info.name() == node_name)
            else {
                warn!(state_machine = %name, child = %node_name, "unload: child not loaded in this processor");
                return Err(Error::StateMachine(StateMachineError::DanglingChild {
                    name: name.to_string(),
                    reason: format!("child \"{}\" is not loaded in this processor", node_name),
                }));
            };
            if node_info.gstate() != GState::Inactive {
                warn!(state_machine = %name, child = %node_name, "unload: subtree not fully inactive");
                return Err(Error::StateMachine(StateMachineError::NotInactive {
                    name: name.to_string(),
                    reason: format!("\"{}\" is not inactive", node_name),
                }));
            }
        }

        let subtree_names: std::collections::HashSet<String> =
            subtree.iter().map(|n| n.name().to_string()).collect();

        if delete {
            // Mark every node `ToDelete` before dropping it from the table,
            // so a `gstate()` observer racing this call under the same lock
            // never sees a node vanish without first passing through it.
            for info in state_machines.iter_mut() {
                if subtree_names.contains(info.name()) {
                    info.mark_to_delete();
                }
            }
        }

        state_machines.retain(|info| !subtree_names.contains(info.name()));
        drop(state_machines);
        drop_publish(AppEvent::StateMachine(StateMachineEvent::Unloaded {
            name: name.to_string(),
        }));
        Ok(true)
    }

    fn with_state_mut(&self, name: &str, f: impl FnOnce(&mut StateInfo) -> bool) -> bool {
        let mut state_machines = self.state_machines.lock();
        match state_machines.iter_mut().find(|info| info.name() == name) {
            Some(info) => f(info),
            None => false,
        }
    }

    // ---- external command mailbox --------------------------------------

    /// Accept `c` into the mailbox if empty; reject (return `false`)
    /// otherwise.
    pub fn process(&self, c: CommandHandle) -> bool {
        let mut mailbox = self.mailbox.lock();
        if mailbox.is_some() {
            drop_publish(AppEvent::Command(CommandEvent::Rejected {
                label: c.label().to_string(),
            }));
            return false;
        }
        let label = c.label().to_string();
        *mailbox = Some(c);
        drop(mailbox);
        drop_publish(AppEvent::Command(CommandEvent::Accepted { label }));
        true
    }

    /// True iff the mailbox no longer holds `c` (consumed or never
    /// accepted).
    pub fn is_command_processed(&self, c: &CommandHandle) -> bool {
        match &*self.mailbox.lock() {
            Some(pending) => !Arc::ptr_eq(pending, c),
            None => true,
        }
    }

    /// Clear the mailbox iff it still holds `c`.
    pub fn abandon_command(&self, c: &CommandHandle) -> bool {
        let mut mailbox = self.mailbox.lock();
        if matches!(&*mailbox, Some(pending) if Arc::ptr_eq(pending, c)) {
            *mailbox = None;
            drop(mailbox);
            drop_publish(AppEvent::Command(CommandEvent::Abandoned {
                label: c.label().to_string(),
            }));
            true
        } else {
            false
        }
    }

    // ---- per-tick algorithm ---------------------------------------------

    /// Advance the processor by one tick:
    /// 1. State machines: run due actions (bookkeeping under lock, user code
    ///    after the lock is released).
    /// 2. External command: execute and clear the mailbox, if occupied.
    /// 3. Programs: running pass, then stepping pass.
    pub fn do_step(&self) {
        self.step_state_machines();
        self.step_command();
        self.step_programs();
    }

    fn step_state_machines(&self) {
        let due: Vec<(String, DueWork)> = {
            let mut state_machines = self.state_machines.lock();
            state_machines
                .iter_mut()
                .filter_map(|info| {
                    let name = info.name().to_string();
                    info.take_due_work().map(|work| (name, work))
                })
                .collect()
        };
        for (name, work) in due {
            perform_due_work(work, &name);
        }
    }

    fn step_command(&self) {
        let command = self.mailbox.lock().take();
        if let Some(c) = command {
            let label = c.label().to_string();
            c.execute();
            debug!(command = %label, "executed");
            drop_publish(AppEvent::Command(CommandEvent::Executed { label }));
        }
    }

    fn step_programs(&self) {
        let mut programs = self.programs.lock();
        for info in programs.iter() {
            info.execute_if_running();
        }
        for info in programs.iter_mut() {
            info.execute_if_stepping();
        }
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_subtree_post_order(root: &Arc<dyn StateMachineTree>) -> Vec<Arc<dyn StateMachineTree>> {
    let mut out = Vec::new();
    visit_post_order(root, &mut out);
    out
}

fn visit_post_order(node: &Arc<dyn StateMachineTree>, out: &mut Vec<Arc<dyn StateMachineTree>>) {
    for child in node.children() {
        visit_post_order(&child, out);
    }
    out.push(node.clone());
}

/// The event bus has no subscribers in most deployments; publish failures
/// (no subscribers, channel closed) are expected and not logged.
fn drop_publish(event: AppEvent) {
    event_bus().publish(event).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use taskctl_core::FnCommand;

    struct CountingProgram {
        name: &'static str,
        executes: AtomicUsize,
    }

    impl ProgramInterface for CountingProgram {
        fn name(&self) -> &str {
            self.name
        }
        fn reset(&self) {}
        fn execute(&self) {
            self.executes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn program(name: &'static str) -> Arc<CountingProgram> {
        Arc::new(CountingProgram {
            name,
            executes: AtomicUsize::new(0),
        })
    }

    struct Leaf {
        name: &'static str,
        state: StdMutex<&'static str>,
    }

    impl Leaf {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                state: StdMutex::new("init"),
            })
        }
    }

    impl StateMachineTree for Leaf {
        fn name(&self) -> &str {
            self.name
        }
        fn activate(&self) {
            *self.state.lock().unwrap() = "init";
        }
        fn deactivate(&self) {}
        fn request_initial_state(&self) {
            *self.state.lock().unwrap() = "init";
        }
        fn request_final_state(&self) {
            *self.state.lock().unwrap() = "final";
        }
        fn request_next_state(&self) -> String {
            let mut s = self.state.lock().unwrap();
            if *s == "init" {
                *s = "running";
            }
            s.to_string()
        }
        fn current_state(&self) -> String {
            self.state.lock().unwrap().to_string()
        }
        fn parent(&self) -> Option<Arc<dyn StateMachineTree>> {
            None
        }
        fn children(&self) -> Vec<Arc<dyn StateMachineTree>> {
            Vec::new()
        }
    }

    /// Scenario 1: two programs, start one, run three ticks.
    #[test]
    fn program_scheduling_runs_only_started_program() {
        let proc = Processor::new();
        let p1 = program("p1");
        let p2 = program("p2");
        assert!(proc.load_program(p1.clone()));
        assert!(proc.load_program(p2.clone()));
        assert!(proc.start_program("p1"));

        for _ in 0..3 {
            proc.do_step();
        }
        assert_eq!(p1.executes.load(Ordering::SeqCst), 3);
        assert_eq!(p2.executes.load(Ordering::SeqCst), 0);

        assert!(proc.stop_program("p1"));
        proc.do_step();
        assert_eq!(p1.executes.load(Ordering::SeqCst), 3);
    }

    /// Scenario 3: mailbox accept/reject and consumption.
    #[test]
    fn mailbox_single_slot_semantics() {
        let proc = Processor::new();
        let c1: CommandHandle = Arc::new(FnCommand::new("c1", || {}));
        let c2: CommandHandle = Arc::new(FnCommand::new("c2", || {}));

        assert!(proc.process(c1.clone()));
        assert!(!proc.process(c2.clone()));

        proc.do_step();
        assert!(proc.is_command_processed(&c1));
        assert!(proc.process(c2.clone()));
    }

    /// Scenario 4: delete rejected while running, accepted once idle.
    #[test]
    fn delete_program_requires_idle() {
        let proc = Processor::new();
        let p = program("p");
        proc.load_program(p);
        proc.start_program("p");
        assert!(!proc.delete_program("p"));
        assert!(proc.program_list().contains(&"p".to_string()));

        proc.stop_program("p");
        assert!(proc.delete_program("p"));
        assert!(!proc.program_list().contains(&"p".to_string()));
    }

    /// Scenario 2: activate then start a state machine; default stepping.
    #[test]
    fn state_machine_activate_and_start() {
        let proc = Processor::new();
        let root = Leaf::new("root");
        proc.load_state_machine(root.clone()).unwrap();

        assert!(proc.activate_state_machine("root"));
        assert!(proc.start_state_machine("root"));
        proc.do_step();
        assert!(proc.is_state_machine_running("root"));
        assert_eq!(root.state.lock().unwrap().to_string(), "running");
    }

    /// Scenario 5: a non-root node is rejected without mutating the
    /// processor.
    #[test]
    fn load_non_root_state_machine_fails() {
        struct HasParent;
        impl StateMachineTree for HasParent {
            fn name(&self) -> &str {
                "child"
            }
            fn activate(&self) {}
            fn deactivate(&self) {}
            fn request_initial_state(&self) {}
            fn request_final_state(&self) {}
            fn request_next_state(&self) -> String {
                "s".to_string()
            }
            fn current_state(&self) -> String {
                "s".to_string()
            }
            fn parent(&self) -> Option<Arc<dyn StateMachineTree>> {
                Some(Leaf::new("parent"))
            }
            fn children(&self) -> Vec<Arc<dyn StateMachineTree>> {
                Vec::new()
            }
        }

        let proc = Processor::new();
        let result = proc.load_state_machine(Arc::new(HasParent));
        assert!(result.is_err());
        assert!(proc.state_machine_list().is_empty());
    }

    /// Scenario 6: unload rejected while a node is not inactive.
    #[test]
    fn unload_requires_fully_inactive_subtree() {
        let proc = Processor::new();
        let root = Leaf::new("root");
        proc.load_state_machine(root).unwrap();
        proc.activate_state_machine("root");

        let result = proc.unload_state_machine("root");
        assert!(result.is_err());
        assert!(proc.state_machine_list().contains(&"root".to_string()));

        proc.deactivate_state_machine_for_test();
    }

    impl Processor {
        /// Test-only helper: force a `Stopped` machine back to `Inactive`
        /// through the public API so `unload` can be exercised end to end.
        fn deactivate_state_machine_for_test(&self) {
            // `Active` cannot deactivate directly; this mirrors the documented
            // stop -> deactivate path.
            self.stop_state_machine("root");
            self.do_step();
            self.deactivate_state_machine("root");
        }
    }

    #[test]
    fn delete_state_machine_drives_gstate_through_to_delete() {
        let proc = Processor::new();
        proc.load_state_machine(Leaf::new("solo")).unwrap();

        assert!(proc.delete_state_machine("solo").unwrap());
        assert!(proc.state_machine_list().is_empty());

        // The entry is gone, so gstate is no longer observable at all -
        // the interesting assertion is that deleting a second, still-loaded
        // machine does not panic or leave it half-removed.
        proc.load_state_machine(Leaf::new("other")).unwrap();
        assert!(proc.delete_state_machine("other").unwrap());
        assert!(!proc.state_machine_list().contains(&"other".to_string()));
    }

    proptest::proptest! {
        /// However many commands are submitted one-per-tick, each is accepted
        /// and executed exactly once: the mailbox never lets two commands
        /// through on the same step, and none are lost.
        #[test]
        fn one_command_per_tick_executes_exactly_once(count in 0u8..30) {
            let proc = Processor::new();
            let executed = Arc::new(AtomicUsize::new(0));

            for _ in 0..count {
                let executed = executed.clone();
                let cmd: CommandHandle = Arc::new(FnCommand::new("c", move || {
                    executed.fetch_add(1, Ordering::SeqCst);
                }));
                prop_assert!(proc.process(cmd.clone()));
                prop_assert!(!proc.process(cmd.clone()), "mailbox must reject a second submission before draining");
                proc.do_step();
                prop_assert!(proc.is_command_processed(&cmd));
            }

            prop_assert_eq!(executed.load(Ordering::SeqCst), count as usize);
        }
    }
}
