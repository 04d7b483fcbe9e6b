use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::{DEFAULT_CONFIG_PATH, StaticConfig};

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Falls back to in-memory defaults when `init_config()` has not been called,
/// so library code and tests never panic on a missing config.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// Initialize the global configuration from "config.toml" in the current directory.
///
/// # Examples
/// ```no_run
/// use commentary::config::init_config;
/// init_config();
/// ```
pub fn init_config() {
    init_config_from(DEFAULT_CONFIG_PATH);
}

/// Initialize the global configuration from an explicit path.
///
/// If the global config was already initialized (e.g. by an early `get_config()`),
/// the loaded values replace it.
pub fn init_config_from(path: &str) {
    let loaded = StaticConfig::load(path);
    match CONFIG.get() {
        Some(existing) => existing.store(Arc::new(loaded)),
        None => {
            if let Err(cell) = CONFIG.set(ArcSwap::from_pointee(loaded.clone())) {
                drop(cell);
                if let Some(existing) = CONFIG.get() {
                    existing.store(Arc::new(loaded));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_config_without_init_uses_defaults() {
        let config = get_config();
        assert!(!config.server.api_prefix.is_empty());
        assert!(config.comments.max_page_size >= 1);
    }
}
