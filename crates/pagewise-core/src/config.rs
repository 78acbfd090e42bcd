//! Paging configuration.

use serde::{Deserialize, Serialize};

/// Default largest gap, in pages, closed by walking forward from a known
/// cursor instead of issuing an offset query.
pub const DEFAULT_MAX_CURSOR_WALK: usize = 4;

/// Default number of page links rendered around the current page.
pub const DEFAULT_LINK_WINDOW: usize = 10;

/// Tuning knobs for [`PagedQuery`](crate::paging::PagedQuery).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    /// Largest gap between the nearest known cursor and a requested page
    /// that is closed by fetching the intermediate pages by cursor. Larger
    /// gaps are closed with one offset query.
    pub max_cursor_walk: usize,

    /// Write newly discovered cursors to the attached cursor store.
    pub persist_cursors: bool,

    /// Default window size for page links.
    pub link_window: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            max_cursor_walk: DEFAULT_MAX_CURSOR_WALK,
            persist_cursors: true,
            link_window: DEFAULT_LINK_WINDOW,
        }
    }
}

impl PagingConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum cursor walk. Zero disables walking.
    pub fn with_max_cursor_walk(mut self, pages: usize) -> Self {
        self.max_cursor_walk = pages;
        self
    }

    /// Stop writing cursors to the cursor store; lookups still happen.
    pub fn without_persistence(mut self) -> Self {
        self.persist_cursors = false;
        self
    }

    /// Set the default link window.
    pub fn with_link_window(mut self, window: usize) -> Self {
        self.link_window = window;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PagingConfig::default();
        assert_eq!(config.max_cursor_walk, DEFAULT_MAX_CURSOR_WALK);
        assert!(config.persist_cursors);
        assert_eq!(config.link_window, DEFAULT_LINK_WINDOW);
    }

    #[test]
    fn test_builder() {
        let config = PagingConfig::new()
            .with_max_cursor_walk(0)
            .without_persistence()
            .with_link_window(6);
        assert_eq!(config.max_cursor_walk, 0);
        assert!(!config.persist_cursors);
        assert_eq!(config.link_window, 6);
    }

    #[test]
    fn test_partial_json() {
        let config: PagingConfig = serde_json::from_str(r#"{ "max_cursor_walk": 2 }"#).unwrap();
        assert_eq!(config.max_cursor_walk, 2);
        assert!(config.persist_cursors);
        assert_eq!(config.link_window, DEFAULT_LINK_WINDOW);
    }
}
