//! Type aliases for shared state used across crates.
//!
//! Uses `parking_lot` locks rather than `std::sync` ones.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A thread-safe hash map for cross-thread key-value storage.
pub type ThreadSafeMap<K, V> = Arc<Mutex<HashMap<K, V>>>;

/// A progress callback receiving (pass index, shapes produced by that pass).
pub type PassCallback<'a> = &'a mut dyn FnMut(usize, usize);

/// Create a new empty `ThreadSafeMap<K, V>`.
#[inline]
pub fn thread_safe_map<K, V>() -> ThreadSafeMap<K, V> {
    Arc::new(Mutex::new(HashMap::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_safe_map_shared_between_clones() {
        let map: ThreadSafeMap<u32, &str> = thread_safe_map();
        let other = Arc::clone(&map);
        other.lock().insert(1, "one");
        assert_eq!(map.lock().get(&1), Some(&"one"));
    }

    #[test]
    fn test_thread_safe_map_across_threads() {
        let map: ThreadSafeMap<u32, u32> = thread_safe_map();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let map = Arc::clone(&map);
                std::thread::spawn(move || {
                    map.lock().insert(i, i * 10);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(map.lock().len(), 4);
        assert_eq!(map.lock().get(&3), Some(&30));
    }
}
