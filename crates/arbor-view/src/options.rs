//! Projection options.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Caller-owned expand/collapse overrides keyed by item id. Absent means
/// collapsed.
pub type ExpandedState = HashMap<String, bool>;

/// Flags controlling a projection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    /// Display level assigned to each root.
    pub root_level: usize,
    /// Emit the root as a single `root-block` row ahead of its children.
    pub enlarge_root_block: bool,
    pub show_backlinks: bool,
    pub show_potential_links: bool,
    pub add_side_pane_header: bool,
    pub show_block_properties: bool,
    /// Cap on `potential-links-block` rows per root, counted after
    /// filtering; 0 means unbounded.
    pub potential_links_limit: usize,
}

impl ViewOptions {
    /// Reject option combinations that can't be rendered.
    pub fn validate(&self, root_count: usize) -> Result<(), ConfigError> {
        if self.enlarge_root_block && self.add_side_pane_header {
            return Err(ConfigError::EnlargeWithSidePaneHeader);
        }
        if self.enlarge_root_block && root_count > 1 {
            return Err(ConfigError::EnlargeWithMultipleRoots(root_count));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let ok = ViewOptions::default();
        assert!(ok.validate(3).is_ok());

        let both = ViewOptions {
            enlarge_root_block: true,
            add_side_pane_header: true,
            ..Default::default()
        };
        assert_eq!(both.validate(1), Err(ConfigError::EnlargeWithSidePaneHeader));

        let multi = ViewOptions { enlarge_root_block: true, ..Default::default() };
        assert!(multi.validate(1).is_ok());
        assert_eq!(multi.validate(2), Err(ConfigError::EnlargeWithMultipleRoots(2)));
    }
}
