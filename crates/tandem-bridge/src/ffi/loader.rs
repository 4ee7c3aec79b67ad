//! Dynamic library loading for the native boundary
//!
//! Resolves the foreign runtime's boundary library using `libloading`,
//! handling platform naming conventions and configured search paths.

use libloading::Library;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why the boundary library could not be bound
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// No candidate file exists on any search path
    #[error("Library not found: {0}")]
    LibraryNotFound(String),
    /// A required `tandem_*` export is missing
    #[error("Symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound { library: String, symbol: String },
    /// The file exists but the platform loader rejected it
    #[error("Failed to load library: {0}")]
    LoadFailed(String),
}

/// Normalize a library path to forward slashes
///
/// Paths handed over by the foreign runtime may use either separator.
///
/// ```
/// # use tandem_bridge::ffi::normalize_library_path;
/// assert_eq!(normalize_library_path(r"C:\libs\bridge.dll"), "C:/libs/bridge.dll");
/// ```
pub fn normalize_library_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Finds and opens boundary libraries, caching each resolved file
///
/// # Safety
///
/// Opening a library runs its initializers inside this process, so only
/// trusted libraries should be named in configuration.
pub struct LibraryLoader {
    /// Opened libraries keyed by resolved path
    loaded: HashMap<PathBuf, Arc<Library>>,
    /// Directories to probe, highest priority first
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Loader over the working directory and the system library directories
    pub fn new() -> Self {
        Self {
            loaded: HashMap::new(),
            search_paths: Self::default_search_paths(),
        }
    }

    /// Create a loader that searches `paths` before the defaults
    pub fn with_search_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut loader = Self::new();
        let mut custom: Vec<PathBuf> = paths.into_iter().collect();
        custom.append(&mut loader.search_paths);
        loader.search_paths = custom;
        loader
    }

    /// The working directory followed by the platform's library directories
    fn default_search_paths() -> Vec<PathBuf> {
        let system: &[&str] = if cfg!(target_os = "windows") {
            &["C:\\Windows\\System32"]
        } else if cfg!(target_os = "macos") {
            &["/usr/lib", "/usr/local/lib", "/opt/homebrew/lib"]
        } else {
            &["/usr/lib", "/usr/local/lib", "/lib", "/usr/lib64", "/lib64"]
        };

        let mut paths: Vec<PathBuf> = std::env::current_dir().into_iter().collect();
        paths.extend(system.iter().map(PathBuf::from));
        #[cfg(target_os = "windows")]
        {
            if let Ok(system_root) = std::env::var("SystemRoot") {
                paths.push(PathBuf::from(system_root).join("System32"));
            }
        }
        paths
    }

    /// Candidate file names for a short library name, in priority order
    ///
    /// - Linux: lib{name}.so
    /// - macOS: lib{name}.dylib or lib{name}.so
    /// - Windows: {name}.dll
    fn candidate_file_names(name: &str) -> Vec<String> {
        let extensions: &[&str] = if cfg!(target_os = "windows") {
            &["dll"]
        } else if cfg!(target_os = "macos") {
            &["dylib", "so"]
        } else {
            &["so"]
        };
        let prefixes: &[&str] = if cfg!(target_os = "windows") {
            &["", "lib"]
        } else {
            &["lib", ""]
        };

        let mut names = Vec::new();
        for prefix in prefixes {
            for ext in extensions {
                names.push(format!("{}{}.{}", prefix, name, ext));
            }
        }
        names
    }

    /// Resolve a library name or path to an existing file
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let normalized = normalize_library_path(name);
        let path = Path::new(&normalized);
        if path.exists() && (path.is_absolute() || path.components().count() > 1) {
            return Some(path.to_path_buf());
        }

        let candidates = Self::candidate_file_names(&normalized);
        for search_path in &self.search_paths {
            for filename in &candidates {
                let full_path = search_path.join(filename);
                if full_path.exists() {
                    return Some(full_path);
                }
            }
        }

        None
    }

    /// Load a library by short name or path
    ///
    /// Returns the cached instance when the same file was loaded before.
    ///
    /// # Safety
    ///
    /// Loading a dynamic library executes its initialization code. The caller
    /// must ensure the library is trusted.
    pub fn load(&mut self, name: &str) -> Result<Arc<Library>, LoadError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| LoadError::LibraryNotFound(name.to_string()))?;

        if let Some(library) = self.loaded.get(&path) {
            return Ok(Arc::clone(library));
        }

        debug!(path = %path.display(), "loading boundary library");
        let library =
            unsafe { Library::new(&path).map_err(|e| LoadError::LoadFailed(e.to_string()))? };
        let library = Arc::new(library);
        self.loaded.insert(path, Arc::clone(&library));
        Ok(library)
    }

    /// Probe `path` before every other search path
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.insert(0, path);
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Number of distinct library files opened so far
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_search_paths_not_empty() {
        let paths = LibraryLoader::default_search_paths();
        assert!(!paths.is_empty());

        if let Ok(cwd) = std::env::current_dir() {
            assert_eq!(paths[0], cwd);
        }
    }

    #[test]
    fn test_library_not_found() {
        let mut loader = LibraryLoader::new();
        let result = loader.load("nonexistent_library_xyz");
        assert!(matches!(result, Err(LoadError::LibraryNotFound(_))));
        assert_eq!(loader.loaded_count(), 0);
    }

    #[test]
    fn test_custom_search_paths_come_first() {
        let loader = LibraryLoader::with_search_paths(vec![PathBuf::from("/custom/a")]);
        assert_eq!(loader.search_paths()[0], PathBuf::from("/custom/a"));

        let mut loader = LibraryLoader::new();
        loader.add_search_path(PathBuf::from("/custom/b"));
        assert_eq!(loader.search_paths()[0], PathBuf::from("/custom/b"));
    }

    #[test]
    fn test_resolve_in_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join(&LibraryLoader::candidate_file_names("probe")[0]);
        std::fs::write(&file, b"").unwrap();

        let loader = LibraryLoader::with_search_paths(vec![dir.path().to_path_buf()]);
        assert_eq!(loader.resolve("probe"), Some(file));
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_library.so");
        std::fs::write(&file, b"plain text").unwrap();

        let mut loader = LibraryLoader::new();
        let result = loader.load(file.to_str().unwrap());
        assert!(matches!(result, Err(LoadError::LoadFailed(_))));
    }

    #[test]
    fn test_normalize_library_path() {
        assert_eq!(normalize_library_path("a\\b\\c.so"), "a/b/c.so");
        assert_eq!(normalize_library_path("/usr/lib/x.so"), "/usr/lib/x.so");
    }
}
