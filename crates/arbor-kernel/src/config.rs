//! Kernel configuration, loaded from RON.
//!
//! Every section and field has a default, so a config file only needs the
//! values it changes:
//!
//! ```ron
//! (
//!     root_id: "root",
//!     search: (limit: 20, prefix: true),
//!     view: (show_backlinks: true),
//!     log: (filter: "arbor_store=debug,info"),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use arbor_index::{DEFAULT_MIN_TOKEN_LEN, DEFAULT_SEARCH_LIMIT, SearchMode, SearchOptions};
use arbor_types::BlockId;
use arbor_view::ViewOptions;

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Well-known root block; import fallback target.
    pub root_id: BlockId,
    pub search: SearchConfig,
    pub view: ViewDefaults,
    pub log: LogConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            root_id: BlockId::root(),
            search: SearchConfig::default(),
            view: ViewDefaults::default(),
            log: LogConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Parse from RON text.
    pub fn from_ron(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Load from a `.ron` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&text)?;
        tracing::debug!(path = %path.display(), "loaded kernel config");
        Ok(config)
    }
}

/// Full-text search settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Shorter tokens are not indexed.
    pub min_token_len: usize,
    pub limit: usize,
    pub mode: SearchMode,
    pub prefix: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
            limit: DEFAULT_SEARCH_LIMIT,
            mode: SearchMode::All,
            prefix: false,
        }
    }
}

impl SearchConfig {
    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            mode: self.mode,
            limit: self.limit,
            prefix: self.prefix,
        }
    }
}

/// Panel defaults applied by [`crate::Kernel::default_options`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewDefaults {
    pub root_level: usize,
    pub show_backlinks: bool,
    pub show_potential_links: bool,
    pub show_block_properties: bool,
    pub potential_links_limit: usize,
}

impl Default for ViewDefaults {
    fn default() -> Self {
        Self {
            root_level: 0,
            show_backlinks: false,
            show_potential_links: false,
            show_block_properties: false,
            potential_links_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl ViewDefaults {
    pub fn options(&self) -> ViewOptions {
        ViewOptions {
            root_level: self.root_level,
            show_backlinks: self.show_backlinks,
            show_potential_links: self.show_potential_links,
            show_block_properties: self.show_block_properties,
            potential_links_limit: self.potential_links_limit,
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.root_id, BlockId::root());
        assert_eq!(config.search.limit, DEFAULT_SEARCH_LIMIT);
        assert_eq!(config.log.filter, "info");
        assert!(!config.view.options().enlarge_root_block);
    }

    #[test]
    fn test_partial_ron() {
        let config = KernelConfig::from_ron(
            r#"(
                root_id: "top",
                search: (limit: 5, mode: any),
                view: (show_backlinks: true, root_level: 1),
            )"#,
        )
        .unwrap();
        assert_eq!(config.root_id, BlockId::from("top"));
        assert_eq!(config.search.options().mode, SearchMode::Any);
        assert_eq!(config.search.options().limit, 5);
        assert_eq!(config.search.min_token_len, DEFAULT_MIN_TOKEN_LEN);

        let view = config.view.options();
        assert!(view.show_backlinks);
        assert_eq!(view.root_level, 1);
        assert!(!view.show_potential_links);
        assert_eq!(view.potential_links_limit, DEFAULT_SEARCH_LIMIT);
    }

    #[test]
    fn test_empty_ron_is_default() {
        assert_eq!(KernelConfig::from_ron("()").unwrap(), KernelConfig::default());
    }

    #[test]
    fn test_bad_ron() {
        assert!(KernelConfig::from_ron("(root_id: 12,").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "(log: (filter: \"debug\", ansi: false))").unwrap();
        let config = KernelConfig::load(file.path()).unwrap();
        assert_eq!(config.log.filter, "debug");
        assert!(!config.log.ansi);

        assert!(KernelConfig::load("/nonexistent/arbor.ron").is_err());
    }
}
