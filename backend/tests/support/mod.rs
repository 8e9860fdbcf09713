//! Shared helpers for integration tests.

use parking_lot::Mutex;

/// Process environment is global; tests touching it take turns.
static ENV: Mutex<()> = parking_lot::const_mutex(());

/// Restores the captured variables when dropped, including on panic.
struct Restore(Vec<(String, Option<String>)>);

impl Drop for Restore {
    fn drop(&mut self) {
        for (key, value) in self.0.drain(..) {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Run `f` with `vars` applied (`None` unsets) and restore them afterwards.
pub fn with_scoped_env<R>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
    let _turn = ENV.lock();
    let mut saved: Vec<(String, Option<String>)> = Vec::with_capacity(vars.len());
    for (key, _) in vars {
        if !saved.iter().any(|(k, _)| k == key) {
            saved.push((key.to_string(), std::env::var(key).ok()));
        }
    }
    let _restore = Restore(saved);

    for (key, value) in vars {
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
    f()
}
