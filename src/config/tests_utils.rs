//! Shared test utilities for config module tests.

use std::sync::Mutex;

/// Mutex to serialize environment variable tests and prevent race conditions.
pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Set an environment variable. Callers must hold `ENV_MUTEX`.
pub fn set_env_var(name: &str, value: &str) {
    // SAFETY: env-mutating tests are serialized by ENV_MUTEX.
    unsafe { std::env::set_var(name, value) };
}

/// Clean up environment variables used by mnemo config.
pub fn cleanup_env_vars(vars: &[&str]) {
    for var in vars {
        // SAFETY: env-mutating tests are serialized by ENV_MUTEX.
        unsafe { std::env::remove_var(var) };
    }
}
