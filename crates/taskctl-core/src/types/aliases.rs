//! Type aliases for commonly used complex types.
//!
//! Complex types like `Arc<Mutex<HashMap<...>>>` are hard to read at a
//! glance; these aliases give the common shapes used throughout the
//! processor and peer graph a name.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Uses `parking_lot::Mutex` rather than `std::sync::Mutex`: no poisoning to
/// unwrap, and the real-time thread never blocks behind a poisoned lock.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// A thread-safe optional wrapper for lazily-initialized cross-thread state.
pub type ThreadSafeOption<T> = Arc<Mutex<Option<T>>>;

/// A thread-safe deque, used for FIFO buffers.
pub type ThreadSafeDeque<T> = Arc<Mutex<VecDeque<T>>>;

/// A thread-safe hash map for cross-thread key-value storage.
pub type ThreadSafeMap<K, V> = Arc<Mutex<HashMap<K, V>>>;

/// A thread-safe reader-writer lock wrapper for read-heavy workloads.
///
/// Used for catalogs (commands/methods/data/attributes) that peers read far
/// more often than the owning task writes.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

/// A thread-safe reader-writer hash map.
pub type ThreadSafeRwMap<K, V> = Arc<RwLock<HashMap<K, V>>>;

/// Create a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

/// Create a new `ThreadSafeOption<T>` initialized to `None`.
#[inline]
pub fn thread_safe_none<T>() -> ThreadSafeOption<T> {
    Arc::new(Mutex::new(None))
}

/// Create a new empty `ThreadSafeDeque<T>`.
#[inline]
pub fn thread_safe_deque<T>() -> ThreadSafeDeque<T> {
    Arc::new(Mutex::new(VecDeque::new()))
}

/// Create a new empty `ThreadSafeMap<K, V>`.
#[inline]
pub fn thread_safe_map<K, V>() -> ThreadSafeMap<K, V> {
    Arc::new(Mutex::new(HashMap::new()))
}

/// Create a new `ThreadSafeRw<T>` from a value.
#[inline]
pub fn thread_safe_rw<T>(value: T) -> ThreadSafeRw<T> {
    Arc::new(RwLock::new(value))
}

/// Create a new empty `ThreadSafeRwMap<K, V>`.
#[inline]
pub fn thread_safe_rw_map<K, V>() -> ThreadSafeRwMap<K, V> {
    Arc::new(RwLock::new(HashMap::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_safe_roundtrip() {
        let value: ThreadSafe<i32> = thread_safe(42);
        assert_eq!(*value.lock(), 42);
        *value.lock() = 7;
        assert_eq!(*value.lock(), 7);
    }

    #[test]
    fn thread_safe_map_roundtrip() {
        let map: ThreadSafeMap<String, i32> = thread_safe_map();
        map.lock().insert("a".into(), 1);
        assert_eq!(map.lock().get("a"), Some(&1));
    }

    #[test]
    fn thread_safe_rw_roundtrip() {
        let value: ThreadSafeRw<i32> = thread_safe_rw(10);
        assert_eq!(*value.read(), 10);
        *value.write() = 20;
        assert_eq!(*value.read(), 20);
    }

    #[test]
    fn thread_safe_deque_fifo() {
        let deque: ThreadSafeDeque<i32> = thread_safe_deque();
        deque.lock().push_back(1);
        deque.lock().push_back(2);
        assert_eq!(deque.lock().pop_front(), Some(1));
    }
}
