//! A named node in the peer graph: owns (or shares) an [`ExecutionEngine`]
//! and exposes read-mostly catalogs peers may query.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use taskctl_core::event_bus::{event_bus, AppEvent, PeerEvent};
use taskctl_core::{CommandHandle, Error, PeerError, Result};

use crate::execution_engine::{ExecutionEngine, QueueId};

/// A read-mostly name -> descriptor registry, used for the four factory
/// catalogs plus the attribute and event services. The core only promises
/// lookup/insert/remove; marshalling an actual invocation is the concern of
/// whatever external collaborator owns the described object.
#[derive(Default)]
pub struct Catalog {
    entries: RwLock<HashMap<String, String>>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite a descriptor.
    pub fn add(&self, name: impl Into<String>, descriptor: impl Into<String>) {
        self.entries.write().insert(name.into(), descriptor.into());
    }

    /// Drop an entry; returns whether it existed.
    pub fn remove(&self, name: &str) -> bool {
        self.entries.write().remove(name).is_some()
    }

    /// Look up a descriptor by name.
    pub fn get(&self, name: &str) -> Option<String> {
        self.entries.read().get(name).cloned()
    }

    /// All registered names.
    pub fn names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

/// A named node in the peer graph.
///
/// Owns (or shares, via `Arc`) one [`ExecutionEngine`] and a non-owning map
/// of peer-name (alias) to peer, plus four query catalogs and an attribute
/// and event repository.
pub struct TaskContext {
    name: RwLock<String>,
    engine: Arc<ExecutionEngine>,
    peers: RwLock<HashMap<String, Weak<TaskContext>>>,
    commands: Catalog,
    methods: Catalog,
    data: Catalog,
    attributes: Catalog,
    events: Catalog,
}

impl TaskContext {
    /// Create a task context that owns a private engine.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_engine(name, ExecutionEngine::shared())
    }

    /// Create a task context sharing an existing (possibly already-shared)
    /// engine with other task contexts.
    pub fn with_engine(name: impl Into<String>, engine: Arc<ExecutionEngine>) -> Arc<Self> {
        Arc::new(Self {
            name: RwLock::new(name.into()),
            engine,
            peers: RwLock::new(HashMap::new()),
            commands: Catalog::new(),
            methods: Catalog::new(),
            data: Catalog::new(),
            attributes: Catalog::new(),
            events: Catalog::new(),
        })
    }

    /// The task context's current name.
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Rename this task context. Does not touch any peer's alias for it;
    /// existing peers keep referring to it under the alias they bound.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }

    /// The (possibly shared) engine driving this task context.
    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// Submit a command to this task context's engine, reporting only
    /// whether it was accepted.
    pub fn execute_command(&self, command: CommandHandle) -> bool {
        self.engine.queue_command(command) != 0
    }

    /// Submit a command to this task context's engine, returning its queue
    /// id (`0` if rejected).
    pub fn queue_command(&self, command: CommandHandle) -> QueueId {
        self.engine.queue_command(command)
    }

    // ---- peer graph -----------------------------------------------------

    /// Insert `peer` under `alias`, or under `peer.name()` if `alias` is
    /// empty. One-way; fails (returns `false`) if the alias is already
    /// bound.
    pub fn add_peer(&self, peer: &Arc<TaskContext>, alias: &str) -> bool {
        self.try_add_peer(peer, alias).is_ok()
    }

    /// Fallible form of [`Self::add_peer`].
    pub fn try_add_peer(&self, peer: &Arc<TaskContext>, alias: &str) -> Result<()> {
        let key = if alias.is_empty() {
            peer.name()
        } else {
            alias.to_string()
        };
        let mut peers = self.peers.write();
        if peers.contains_key(&key) {
            return Err(Error::Peer(PeerError::AliasTaken(key)));
        }
        peers.insert(key.clone(), Arc::downgrade(peer));
        drop(peers);
        let owner = self.name();
        debug!(owner = %owner, peer = %key, "peer added");
        event_bus()
            .publish(AppEvent::Peer(PeerEvent::Added { owner, peer: key }))
            .ok();
        Ok(())
    }

    /// Remove the peer bound to `name`, if any.
    pub fn remove_peer(&self, name: &str) -> bool {
        let removed = self.peers.write().remove(name).is_some();
        if removed {
            event_bus()
                .publish(AppEvent::Peer(PeerEvent::Removed {
                    owner: self.name(),
                    peer: name.to_string(),
                }))
                .ok();
        }
        removed
    }

    /// Atomic two-way add under each side's default alias (the other's
    /// `name()`). Fails if either side already knows the other under that
    /// alias.
    pub fn connect_peers(a: &Arc<TaskContext>, b: &Arc<TaskContext>) -> bool {
        Self::try_connect_peers(a, b).is_ok()
    }

    /// Fallible form of [`Self::connect_peers`].
    pub fn try_connect_peers(a: &Arc<TaskContext>, b: &Arc<TaskContext>) -> Result<()> {
        let a_key = b.name();
        let b_key = a.name();
        {
            let a_peers = a.peers.read();
            let b_peers = b.peers.read();
            if a_peers.contains_key(&a_key) || b_peers.contains_key(&b_key) {
                return Err(Error::Peer(PeerError::AlreadyConnected(a.name(), b.name())));
            }
        }
        a.peers.write().insert(a_key, Arc::downgrade(b));
        b.peers.write().insert(b_key, Arc::downgrade(a));
        event_bus()
            .publish(AppEvent::Peer(PeerEvent::Connected {
                a: a.name(),
                b: b.name(),
            }))
            .ok();
        Ok(())
    }

    /// Atomic two-way removal. Fails unless both sides currently know each
    /// other under the other's name.
    pub fn disconnect_peers(a: &Arc<TaskContext>, b: &Arc<TaskContext>) -> bool {
        Self::try_disconnect_peers(a, b).is_ok()
    }

    /// Fallible form of [`Self::disconnect_peers`].
    pub fn try_disconnect_peers(a: &Arc<TaskContext>, b: &Arc<TaskContext>) -> Result<()> {
        let a_key = b.name();
        let b_key = a.name();
        {
            let a_peers = a.peers.read();
            let b_peers = b.peers.read();
            if !a_peers.contains_key(&a_key) || !b_peers.contains_key(&b_key) {
                return Err(Error::Peer(PeerError::NotConnected(a.name(), b.name())));
            }
        }
        a.peers.write().remove(&a_key);
        b.peers.write().remove(&b_key);
        event_bus()
            .publish(AppEvent::Peer(PeerEvent::Disconnected {
                a: a.name(),
                b: b.name(),
            }))
            .ok();
        Ok(())
    }

    /// Names of all currently known peers.
    pub fn peer_list(&self) -> Vec<String> {
        self.peers.read().keys().cloned().collect()
    }

    /// Whether a peer is bound to `name`.
    pub fn has_peer(&self, name: &str) -> bool {
        self.peers.read().contains_key(name)
    }

    /// Resolve the peer bound to `name`, if it is still alive.
    pub fn peer(&self, name: &str) -> Option<Arc<TaskContext>> {
        self.peers.read().get(name)?.upgrade()
    }

    // ---- catalogs ---------------------------------------------------------

    /// Command factory catalog.
    pub fn commands(&self) -> &Catalog {
        &self.commands
    }

    /// Method factory catalog.
    pub fn methods(&self) -> &Catalog {
        &self.methods
    }

    /// Data source factory catalog.
    pub fn data(&self) -> &Catalog {
        &self.data
    }

    /// Attribute repository.
    pub fn attributes(&self) -> &Catalog {
        &self.attributes
    }

    /// Event service catalog.
    pub fn events(&self) -> &Catalog {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskctl_core::FnCommand;

    #[test]
    fn add_peer_rejects_duplicate_alias() {
        let a = TaskContext::new("a");
        let b = TaskContext::new("b");
        let c = TaskContext::new("c");
        assert!(a.add_peer(&b, ""));
        assert!(!a.add_peer(&c, "b"), "alias \"b\" already bound");
        assert!(a.has_peer("b"));
    }

    #[test]
    fn connect_peers_is_two_way_and_atomic() {
        let a = TaskContext::new("a");
        let b = TaskContext::new("b");
        assert!(TaskContext::connect_peers(&a, &b));
        assert!(a.has_peer("b"));
        assert!(b.has_peer("a"));

        assert!(!TaskContext::connect_peers(&a, &b), "already connected");
    }

    #[test]
    fn disconnect_peers_round_trips() {
        let a = TaskContext::new("a");
        let b = TaskContext::new("b");
        TaskContext::connect_peers(&a, &b);
        assert!(TaskContext::disconnect_peers(&a, &b));
        assert!(!a.has_peer("b"));
        assert!(!b.has_peer("a"));
        assert!(!TaskContext::disconnect_peers(&a, &b), "not connected anymore");
    }

    #[test]
    fn shared_engine_serializes_two_contexts() {
        let engine = ExecutionEngine::shared();
        let a = TaskContext::with_engine("a", engine.clone());
        let b = TaskContext::with_engine("b", engine.clone());
        assert!(Arc::ptr_eq(a.engine(), b.engine()));

        engine.start(10);
        let cmd: CommandHandle = Arc::new(FnCommand::new("c", || {}));
        assert_ne!(a.queue_command(cmd), 0);
    }

    #[test]
    fn set_name_changes_what_name_reports() {
        let ctx = TaskContext::new("arm");
        assert_eq!(ctx.name(), "arm");
        ctx.set_name("arm-2");
        assert_eq!(ctx.name(), "arm-2");
    }

    #[test]
    fn execute_command_reports_acceptance() {
        let ctx = TaskContext::new("arm");
        let cmd: CommandHandle = Arc::new(FnCommand::new("c", || {}));
        assert!(!ctx.execute_command(cmd), "engine not started yet");

        ctx.engine().start(10);
        let cmd: CommandHandle = Arc::new(FnCommand::new("c", || {}));
        assert!(ctx.execute_command(cmd));

        let rejected: CommandHandle = Arc::new(FnCommand::new("c2", || {}));
        assert!(!ctx.execute_command(rejected), "mailbox already occupied");
    }

    #[test]
    fn catalog_add_remove_lookup() {
        let ctx = TaskContext::new("a");
        ctx.commands().add("home", "homes the axis");
        assert_eq!(ctx.commands().get("home").as_deref(), Some("homes the axis"));
        assert!(ctx.commands().remove("home"));
        assert!(ctx.commands().get("home").is_none());
    }

    #[test]
    fn dropped_peer_is_stale_not_panicking() {
        let a = TaskContext::new("a");
        {
            let b = TaskContext::new("b");
            a.add_peer(&b, "");
            assert!(a.peer("b").is_some());
        }
        assert!(a.peer("b").is_none(), "weak ref should no longer upgrade");
        assert!(a.has_peer("b"), "the stale entry itself is not auto-removed");
    }
}
