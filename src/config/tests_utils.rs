//! Shared test utilities for config module tests.

use std::sync::Mutex;

/// Mutex to serialize environment variable tests and prevent race conditions.
pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Every environment variable read by the config layer.
pub const CONFIG_ENV_VARS: [&str; 6] = [
    "VECTORMEM_MEMORY_FILE",
    "VECTORMEM_EMBEDDING_MODEL",
    "VECTORMEM_CHUNKING_MODE",
    "VECTORMEM_WINDOW_SIZE",
    "VECTORMEM_OVERLAP",
    "VECTORMEM_EMBED_AT_SEARCH",
];

/// Clean up environment variables used by vectormem config.
pub fn cleanup_env_vars() {
    for var in CONFIG_ENV_VARS {
        // SAFETY: callers hold ENV_MUTEX, so no other test touches the environment.
        unsafe { std::env::remove_var(var) };
    }
}

/// Set one environment variable while holding ENV_MUTEX.
pub fn set_env_var(name: &str, value: &str) {
    // SAFETY: callers hold ENV_MUTEX, so no other test touches the environment.
    unsafe { std::env::set_var(name, value) };
}
