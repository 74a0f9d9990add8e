//! Shared helpers for tests that read `BANDROOM_*` variables

use std::env;
use std::sync::{Mutex, MutexGuard};

// Serializes every test in this crate that touches the environment
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Variables read by config loading
pub const BANDROOM_VARS: &[&str] = &[
    "BANDROOM_CONFIG",
    "BANDROOM_DATA_DIR",
    "BANDROOM_DB_FILE",
    "BANDROOM_VERBOSE",
    "BANDROOM_MAX_ATTEMPTS",
];

/// Clears the given variables for the lifetime of the guard, then restores them
pub struct EnvGuard {
    _lock: MutexGuard<'static, ()>,
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn new(vars: &[&str]) -> Self {
        let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let saved = vars
            .iter()
            .map(|&name| (name.to_string(), env::var(name).ok()))
            .collect();
        for name in vars {
            env::remove_var(name);
        }
        Self { _lock: lock, saved }
    }

    /// Clears every `BANDROOM_*` variable config loading reads
    pub fn clean() -> Self {
        Self::new(BANDROOM_VARS)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(v) => env::set_var(name, v),
                None => env::remove_var(name),
            }
        }
    }
}
