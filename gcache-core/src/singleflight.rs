//! # Single-Flight Call Coalescing
//!
//! Guarantees at-most-one concurrent execution of a closure per key: if `N`
//! threads call `do_call` with the same key while an earlier call for that
//! key is still running, all `N` observe the result of that one call rather
//! than each re-running it.
//!
//! ## Design Principles
//!
//! 1. **Short-Lived Table Entries**: a key's entry exists only while its
//!    call is in flight; it is removed immediately on completion. This is
//!    deduplication, not caching — the cache lives one layer up.
//! 2. **No Lock Held Across the Call**: the group lock protects the table,
//!    never the closure itself, so one slow call cannot stall unrelated keys.

use std::sync::Arc;

use ahash::RandomState;
use parking_lot::{Condvar, Mutex};

struct Call<T: Clone> {
    done: Mutex<bool>,
    condvar: Condvar,
    result: Mutex<Option<Result<T, Arc<dyn std::error::Error + Send + Sync>>>>,
}

impl<T: Clone> Call<T> {
    fn new() -> Self {
        Call {
            done: Mutex::new(false),
            condvar: Condvar::new(),
            result: Mutex::new(None),
        }
    }

    fn finish(&self, result: Result<T, Arc<dyn std::error::Error + Send + Sync>>) {
        *self.result.lock() = Some(result);
        let mut done = self.done.lock();
        *done = true;
        self.condvar.notify_all();
    }

    fn wait(&self) -> Result<T, Arc<dyn std::error::Error + Send + Sync>> {
        let mut done = self.done.lock();
        while !*done {
            self.condvar.wait(&mut done);
        }
        self.result
            .lock()
            .clone()
            .expect("result set before done flag")
    }
}

/// Per-group table of in-flight calls, keyed by the string key being loaded.
///
/// `T` is the value type produced by the closures passed to `do_call`; it
/// must be cheaply cloneable since every waiter receives its own copy of the
/// one producer's result.
pub struct SingleFlight<T: Clone> {
    calls: Mutex<hashbrown::HashMap<String, Arc<Call<T>>, RandomState>>,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        SingleFlight {
            calls: Mutex::new(hashbrown::HashMap::default()),
        }
    }

    /// Runs `f` for `key`, or waits for and returns the result of an
    /// already-in-flight call for the same key.
    ///
    /// `f`'s error type is erased to `Arc<dyn Error + Send + Sync>` so it can
    /// be cheaply shared with every waiter without requiring `E: Clone`.
    pub fn do_call<E, F>(&self, key: &str, f: F) -> Result<T, Arc<dyn std::error::Error + Send + Sync>>
    where
        E: std::error::Error + Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        {
            let mut calls = self.calls.lock();
            if let Some(existing) = calls.get(key).cloned() {
                drop(calls);
                return existing.wait();
            }
            let call = Arc::new(Call::new());
            calls.insert(key.to_string(), call);
        }

        let call = {
            let calls = self.calls.lock();
            calls.get(key).cloned().expect("just inserted")
        };

        let result = f().map_err(|e| Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>);
        call.finish(result.clone());

        self.calls.lock().remove(key);

        result
    }
}
