use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use taskctl::{
    CommandHandle, EngineConfig, Error, FnCommand, ProgramInterface, StateMachineTree, TaskContext,
};
use tracing::info;

/// A trivial program that counts how many times it has been stepped.
struct Heartbeat {
    ticks: AtomicUsize,
}

impl ProgramInterface for Heartbeat {
    fn name(&self) -> &str {
        "heartbeat"
    }
    fn reset(&self) {
        self.ticks.store(0, Ordering::SeqCst);
    }
    fn execute(&self) {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        info!(ticks = n, "heartbeat");
    }
}

/// A two-state "idle" / "armed" supervisor, advancing once per tick.
struct Supervisor {
    armed: std::sync::atomic::AtomicBool,
}

impl StateMachineTree for Supervisor {
    fn name(&self) -> &str {
        "supervisor"
    }
    fn activate(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
    fn deactivate(&self) {}
    fn request_initial_state(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
    fn request_final_state(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
    fn request_next_state(&self) -> String {
        self.armed.store(true, Ordering::SeqCst);
        self.current_state()
    }
    fn current_state(&self) -> String {
        if self.armed.load(Ordering::SeqCst) {
            "armed".to_string()
        } else {
            "idle".to_string()
        }
    }
    fn parent(&self) -> Option<Arc<dyn StateMachineTree>> {
        None
    }
    fn children(&self) -> Vec<Arc<dyn StateMachineTree>> {
        Vec::new()
    }
}

fn main() -> anyhow::Result<()> {
    let config = EngineConfig::load(&EngineConfig::default_path())?;
    taskctl::init_logging(&config)?;

    // "arm" owns a program and a state machine; "controller" is a peer that
    // only queues commands into arm's engine.
    let arm = TaskContext::new("arm");
    let controller = TaskContext::new("controller");
    TaskContext::connect_peers(&arm, &controller);

    arm.engine()
        .processor()
        .load_program(Arc::new(Heartbeat {
            ticks: AtomicUsize::new(0),
        }));
    arm.engine()
        .processor()
        .load_state_machine(Arc::new(Supervisor {
            armed: std::sync::atomic::AtomicBool::new(false),
        }))?;
    arm.engine().processor().activate_state_machine("supervisor");
    arm.engine().processor().start_state_machine("supervisor");
    arm.engine().processor().start_program("heartbeat");
    arm.engine().start(config.tick_period_ms);

    // The peer submits a one-shot command into arm's mailbox.
    let peer = controller.peer("arm").expect("arm is a connected peer");
    let home: CommandHandle = Arc::new(FnCommand::new("home", || {
        info!("homing axes");
    }));
    if peer.queue_command(home) == 0 {
        return Err(Error::other("controller could not queue the home command").into());
    }

    for _ in 0..20 {
        arm.engine().step();
        thread::sleep(Duration::from_millis(config.tick_period_ms));
    }

    arm.engine().stop();
    Ok(())
}
