//! Human-readable folder paths from parent links.

use bridge_traits::storage::{FolderLookup, FolderNode};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Walks deeper than this are treated as malformed
pub const MAX_FOLDER_DEPTH: usize = 64;

/// Resolves parent chains into `Root/Child/Grandchild` strings.
///
/// Owned by a single sync pass. Every lookup, successful or not, is memoized
/// so sibling files cost one remote call per distinct ancestor.
#[derive(Debug, Default)]
pub struct FolderPathResolver {
    folders: HashMap<String, Option<FolderNode>>,
    lookups: usize,
}

impl FolderPathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of remote lookups issued so far
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    /// Path of the folder `parent_id`, root first
    ///
    /// Returns `""` for `None`. A failed lookup truncates the path: the
    /// failing folder and everything above it are omitted.
    pub async fn resolve<L>(&mut self, lookup: &L, parent_id: Option<&str>) -> String
    where
        L: FolderLookup + ?Sized,
    {
        let mut names = Vec::new();
        let mut visited = HashSet::new();
        let mut current = parent_id.map(str::to_string);

        while let Some(folder_id) = current.take() {
            if !visited.insert(folder_id.clone()) {
                warn!(folder_id = %folder_id, "Folder cycle detected, truncating path");
                break;
            }
            if names.len() >= MAX_FOLDER_DEPTH {
                warn!(folder_id = %folder_id, depth = names.len(), "Folder chain too deep, truncating path");
                break;
            }

            let Some(node) = self.folder(lookup, &folder_id).await else {
                break;
            };
            names.push(node.name);
            current = node.parent_id;
        }

        names.reverse();
        names.join("/")
    }

    async fn folder<L>(&mut self, lookup: &L, folder_id: &str) -> Option<FolderNode>
    where
        L: FolderLookup + ?Sized,
    {
        if let Some(cached) = self.folders.get(folder_id) {
            return cached.clone();
        }

        self.lookups += 1;
        let node = match lookup.folder(folder_id).await {
            Ok(node) => {
                debug!(folder_id, name = %node.name, "Resolved folder");
                Some(node)
            }
            Err(e) => {
                warn!(folder_id, error = %e, "Folder lookup failed, truncating path");
                None
            }
        };

        self.folders.insert(folder_id.to_string(), node.clone());
        node
    }
}

/// `folder/name` with leading and trailing slashes removed
pub fn document_file_name(folder_path: &str, name: &str) -> String {
    format!("{}/{}", folder_path, name)
        .trim_matches('/')
        .to_string()
}
