//! filesystem capability provided by the host
//!
//! The core never touches the disk directly. A [FileSystem] is handed in by whoever embeds the library; hosts without
//! one (sandboxed editors, tests) simply pass none and every lookup degrades to "not found".
use std::path::Path;

pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
}

/// The local disk
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// In-memory test double for [FileSystem]
#[cfg(test)]
pub(crate) mod memory {
    use super::FileSystem;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;

    /// In-memory files, keyed by exact path
    ///
    /// Counts successful reads so callers can observe caching.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryFileSystem {
        files: RwLock<HashMap<PathBuf, String>>,
        reads: AtomicUsize,
    }

    impl MemoryFileSystem {
        pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
            self.files
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(path.into(), contents.into());
        }

        pub fn remove(&self, path: &Path) -> Option<String> {
            self.files
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .remove(path)
        }

        /// Number of successful [FileSystem::read_to_string] calls so far
        pub fn reads(&self) -> usize {
            self.reads.load(Ordering::Relaxed)
        }
    }

    impl FileSystem for MemoryFileSystem {
        fn exists(&self, path: &Path) -> bool {
            self.files
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .contains_key(path)
        }

        fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
            let files = self
                .files
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let contents = files.get(path).cloned().ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist", path.display()),
                )
            })?;
            self.reads.fetch_add(1, Ordering::Relaxed);
            Ok(contents)
        }
    }
}
