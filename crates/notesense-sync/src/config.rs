//! Timing configuration for the sync engine.

use std::time::Duration;

use notesense_core::defaults;

/// Debounce delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Quiet period before a field edit is written.
    pub edit_delay_ms: u64,
    /// Quiet period before a search query is sent.
    pub search_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            edit_delay_ms: defaults::EDIT_DEBOUNCE_MS,
            search_delay_ms: defaults::SEARCH_DEBOUNCE_MS,
        }
    }
}

impl SyncConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTESENSE_EDIT_DEBOUNCE_MS` | `500` | Edit write-back delay |
    /// | `NOTESENSE_SEARCH_DEBOUNCE_MS` | `300` | Search delay |
    pub fn from_env() -> Self {
        let edit_delay_ms = std::env::var(defaults::ENV_EDIT_DEBOUNCE_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::EDIT_DEBOUNCE_MS);

        let search_delay_ms = std::env::var(defaults::ENV_SEARCH_DEBOUNCE_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::SEARCH_DEBOUNCE_MS);

        Self {
            edit_delay_ms,
            search_delay_ms,
        }
    }

    pub fn with_edit_delay_ms(mut self, ms: u64) -> Self {
        self.edit_delay_ms = ms;
        self
    }

    pub fn with_search_delay_ms(mut self, ms: u64) -> Self {
        self.search_delay_ms = ms;
        self
    }

    pub fn edit_delay(&self) -> Duration {
        Duration::from_millis(self.edit_delay_ms)
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.edit_delay(), Duration::from_millis(500));
        assert_eq!(config.search_delay(), Duration::from_millis(300));
    }

    #[test]
    fn test_builders() {
        let config = SyncConfig::default()
            .with_edit_delay_ms(10)
            .with_search_delay_ms(20);
        assert_eq!(config.edit_delay_ms, 10);
        assert_eq!(config.search_delay_ms, 20);
    }
}
