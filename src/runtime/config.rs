//! Engine configuration

use super::memory::MAX_PAGES;

/// Default ceiling on nested calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Default ceiling on table length.
pub const DEFAULT_MAX_TABLE_SIZE: u32 = 10_000_000;

/// Resource ceilings applied by a [`super::Store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Nested calls beyond this depth trap with `CallStackExhausted`.
    pub max_call_depth: usize,
    /// Hard page ceiling for every memory, regardless of its declared maximum.
    pub max_memory_pages: u32,
    pub max_table_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_memory_pages: MAX_PAGES,
            max_table_size: DEFAULT_MAX_TABLE_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_max_memory_pages(mut self, pages: u32) -> Self {
        self.max_memory_pages = pages.min(MAX_PAGES);
        self
    }

    pub fn with_max_table_size(mut self, size: u32) -> Self {
        self.max_table_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_call_depth, 1024);
        assert_eq!(config.max_memory_pages, 65536);
    }

    #[test]
    fn test_page_ceiling_is_clamped() {
        let config = EngineConfig::default().with_max_memory_pages(100_000);
        assert_eq!(config.max_memory_pages, MAX_PAGES);
        assert_eq!(EngineConfig::default().with_max_memory_pages(2).max_memory_pages, 2);
    }
}
