//! Record store layout: the watched root and its category sub-directories.

use std::path::{Path, PathBuf};

use findmy_core::RecordCategory;

/// Default store root relative to the home directory.
const DEFAULT_STORE_DIR: &str = "Library/com.apple.icloud.searchpartyd";

/// The on-disk record store: an injected root directory with one fixed-name
/// sub-directory per record category.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    /// A store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The platform default root, `~/Library/com.apple.icloud.searchpartyd`.
    pub fn default_root() -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(home.join(DEFAULT_STORE_DIR)))
    }

    /// The watched root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory holding one record category.
    pub fn category_dir(&self, category: RecordCategory) -> PathBuf {
        self.root.join(category.dir_name())
    }

    /// Classify a changed path by which category directory prefixes it.
    /// Paths outside all four categories are `None` and must be ignored.
    pub fn category_of(&self, path: &Path) -> Option<RecordCategory> {
        RecordCategory::ALL
            .into_iter()
            .find(|category| path.starts_with(self.category_dir(*category)))
    }
}
