//! Reference-counted resource cache
//!
//! A [`ResourceLoader`] maps resource keys to loaded assets. Loading a cached
//! key hands out the same [`AssetHandle`] and bumps its count; unloading
//! decrements it, and the asset is released through
//! [`ResourceSource::unload_item`] only when the count reaches zero.
//!
//! Keys are slash separated. The first segment names a working directory
//! under the loader root, which lets a folder carry a `<dir>_meta.ron` file
//! that maps leaf names to real file names:
//!
//! ```text
//! "Player/idle"  ->  <root>/Player/  +  leaf "idle"
//! ```

use std::any::type_name;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;

use super::handle::AssetHandle;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while loading or releasing content
#[derive(Debug, Clone, PartialEq)]
pub enum ContentError {
    /// The key could not be resolved to a resource
    UnknownResourceKey(String),
    /// The handle's key has no entry in this cache, or the entry is another one
    UnknownAsset(String),
    /// The handle was never loaded through a cache
    DetachedAsset,
    /// Reading a file failed
    Io(String),
    /// A metadata or resource file is malformed
    Parse(String),
    /// Every slot of a fixed-size pool is taken
    PoolExhausted { capacity: usize },
    /// A required service is not registered
    MissingService(&'static str),
    /// A thread panicked while holding a shared cache or pool
    LockPoisoned(&'static str),
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownResourceKey(key) => write!(f, "Unknown resource key: {key}"),
            Self::UnknownAsset(key) => write!(f, "Asset '{key}' is not in this cache"),
            Self::DetachedAsset => write!(f, "Asset was not loaded through a cache"),
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Parse(e) => write!(f, "Parse error: {e}"),
            Self::PoolExhausted { capacity } => {
                write!(f, "Pool exhausted: {capacity} instances maximum")
            }
            Self::MissingService(name) => write!(f, "Missing service: {name}"),
            Self::LockPoisoned(what) => write!(f, "Lock poisoned: {what}"),
        }
    }
}

impl std::error::Error for ContentError {}

// ============================================================================
// Content paths
// ============================================================================

/// A resource key split into its working directory and leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPath {
    key: String,
    working_dir: Option<String>,
    leaf: String,
}

impl ContentPath {
    /// Split `key` at its first separator
    pub fn parse(key: impl Into<String>) -> Self {
        let key = key.into();
        let (working_dir, leaf) = match key.split_once('/') {
            Some((dir, leaf)) if !dir.is_empty() => (Some(dir.to_string()), leaf.to_string()),
            _ => (None, key.trim_start_matches('/').to_string()),
        };
        Self {
            key,
            working_dir,
            leaf,
        }
    }

    /// The full key, as given
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    #[must_use]
    pub fn leaf(&self) -> &str {
        &self.leaf
    }

    /// `<root>/<working_dir>`, or `root` itself without a working directory
    #[must_use]
    pub fn directory(&self, root: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) => root.join(dir),
            None => root.to_path_buf(),
        }
    }

    /// Per-folder metadata file, if the key has a working directory
    #[must_use]
    pub fn meta_file(&self, root: &Path) -> Option<PathBuf> {
        self.working_dir
            .as_ref()
            .map(|dir| root.join(dir).join(format!("{dir}_meta.ron")))
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Read and parse a RON file
pub fn read_ron<T: DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let text = fs::read_to_string(path)
        .map_err(|e| ContentError::Io(format!("{}: {e}", path.display())))?;
    ron::from_str(&text).map_err(|e| ContentError::Parse(format!("{}: {e}", path.display())))
}

/// `<directory>/<file_name>`, or `<directory>/<fallback>` with a warning when
/// the file does not exist
pub fn existing_or_fallback(directory: &Path, file_name: &str, fallback: &str) -> PathBuf {
    let file = directory.join(file_name);
    if file.exists() {
        return file;
    }
    log::warn!("{} not found, using {fallback}", file.display());
    directory.join(fallback)
}

/// Look up `path.leaf()` in the folder metadata, if the folder has any
pub fn read_meta_entry<M: DeserializeOwned>(
    root: &Path,
    path: &ContentPath,
) -> Result<Option<M>, ContentError> {
    let Some(meta_file) = path.meta_file(root) else {
        return Ok(None);
    };
    if !meta_file.exists() {
        return Ok(None);
    }
    let mut entries: FxHashMap<String, M> = read_ron(&meta_file)?;
    Ok(entries.remove(path.leaf()))
}

// ============================================================================
// Loader
// ============================================================================

/// Produces and disposes one kind of resource
pub trait ResourceSource: Send {
    type Asset: Send + Sync + 'static;

    /// Load the resource for `path` from under `root`
    fn load_item(&mut self, root: &Path, path: &ContentPath) -> Result<Self::Asset, ContentError>;

    /// Dispose of a resource whose last reference was released
    fn unload_item(&mut self, _asset: &AssetHandle<Self::Asset>) {}
}

/// A cached resource and the number of holders
#[derive(Debug)]
pub struct ResourceReference<T> {
    pub handle: AssetHandle<T>,
    pub count: usize,
}

/// Reference-counted cache over a [`ResourceSource`]
pub struct ResourceLoader<S: ResourceSource> {
    root: PathBuf,
    source: S,
    resources: FxHashMap<String, ResourceReference<S::Asset>>,
}

impl<S: ResourceSource> ResourceLoader<S> {
    /// Create a loader reading from `root`
    pub fn new(root: impl Into<PathBuf>, source: S) -> Self {
        Self {
            root: root.into(),
            source,
            resources: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Get the cached asset for `key`, loading it on first use
    pub fn load_content(&mut self, key: &str) -> Result<AssetHandle<S::Asset>, ContentError> {
        if let Some(reference) = self.resources.get_mut(key) {
            reference.count += 1;
            log::trace!("Reusing '{key}' ({} references)", reference.count);
            return Ok(reference.handle.clone());
        }

        let path = ContentPath::parse(key);
        let asset = self.source.load_item(&self.root, &path)?;
        let handle = AssetHandle::cached(key, asset);
        log::debug!("Loaded '{key}'");
        self.resources.insert(
            key.to_string(),
            ResourceReference {
                handle: handle.clone(),
                count: 1,
            },
        );
        Ok(handle)
    }

    /// Drop one reference to `handle`. Returns true if the asset was released.
    ///
    /// The handle must be the entry this cache holds for its key; a handle
    /// from another cache with the same key is refused.
    pub fn unload_content(&mut self, handle: &AssetHandle<S::Asset>) -> Result<bool, ContentError> {
        let key = handle.key().ok_or(ContentError::DetachedAsset)?;
        match self.resources.get(key) {
            Some(reference) if reference.handle == *handle => Ok(self.release(key)),
            _ => Err(ContentError::UnknownAsset(key.to_string())),
        }
    }

    /// Drop one reference to whatever `key` is cached as
    pub fn unload_key(&mut self, key: &str) -> Result<bool, ContentError> {
        if !self.resources.contains_key(key) {
            return Err(ContentError::UnknownResourceKey(key.to_string()));
        }
        Ok(self.release(key))
    }

    fn release(&mut self, key: &str) -> bool {
        let Some(reference) = self.resources.get_mut(key) else {
            return false;
        };
        reference.count = reference.count.saturating_sub(1);
        if reference.count > 0 {
            log::trace!("Dropped '{key}' ({} references)", reference.count);
            return false;
        }
        if let Some(reference) = self.resources.remove(key) {
            self.source.unload_item(&reference.handle);
            log::debug!("Released '{key}'");
        }
        true
    }

    /// Current reference count for `key`
    #[must_use]
    pub fn reference_count(&self, key: &str) -> Option<usize> {
        self.resources.get(key).map(|reference| reference.count)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.resources.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Release everything regardless of reference counts
    pub fn clear(&mut self) {
        for (key, reference) in self.resources.drain() {
            self.source.unload_item(&reference.handle);
            log::debug!("Released '{key}'");
        }
    }
}

/// A cache other loaders build on, such as textures under atlases
pub type SharedLoader<S> = Arc<Mutex<ResourceLoader<S>>>;

impl<S: ResourceSource> ResourceLoader<S> {
    #[must_use]
    pub fn into_shared(self) -> SharedLoader<S> {
        Arc::new(Mutex::new(self))
    }
}

/// Lock a shared cache
pub fn lock_loader<S: ResourceSource>(
    loader: &SharedLoader<S>,
) -> Result<MutexGuard<'_, ResourceLoader<S>>, ContentError> {
    loader.lock().map_err(|_| ContentError::LockPoisoned(type_name::<S>()))
}

impl<S: ResourceSource + fmt::Debug> fmt::Debug for ResourceLoader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("root", &self.root)
            .field("source", &self.source)
            .field("cached", &self.resources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Hands out the key as the asset and records releases
    struct EchoSource {
        released: Arc<Mutex<Vec<String>>>,
    }

    impl ResourceSource for EchoSource {
        type Asset = String;

        fn load_item(&mut self, _root: &Path, path: &ContentPath) -> Result<String, ContentError> {
            if path.leaf() == "missing" {
                return Err(ContentError::UnknownResourceKey(path.key().to_string()));
            }
            Ok(path.key().to_string())
        }

        fn unload_item(&mut self, asset: &AssetHandle<String>) {
            self.released.lock().unwrap().push(asset.get().clone());
        }
    }

    fn echo_loader() -> (ResourceLoader<EchoSource>, Arc<Mutex<Vec<String>>>) {
        let released = Arc::new(Mutex::new(Vec::new()));
        let loader = ResourceLoader::new(
            "Content",
            EchoSource {
                released: Arc::clone(&released),
            },
        );
        (loader, released)
    }

    #[test]
    fn test_release_after_last_unload() {
        let (mut loader, released) = echo_loader();

        let first = loader.load_content("Sprites/hero").unwrap();
        let second = loader.load_content("Sprites/hero").unwrap();
        assert_eq!(first, second);
        assert_eq!(loader.reference_count("Sprites/hero"), Some(2));

        assert!(!loader.unload_content(&first).unwrap());
        assert!(released.lock().unwrap().is_empty());

        assert!(loader.unload_content(&second).unwrap());
        assert_eq!(*released.lock().unwrap(), ["Sprites/hero"]);
        assert!(loader.is_empty());
    }

    #[test]
    fn test_unload_unknown_asset() {
        let (mut loader, _) = echo_loader();
        let (mut other, _) = echo_loader();
        let stray = AssetHandle::new("stray".to_string());
        let foreign = other.load_content("Sprites/hero").unwrap();
        loader.load_content("Sprites/hero").unwrap();

        assert_eq!(loader.unload_content(&stray), Err(ContentError::DetachedAsset));
        assert_eq!(
            loader.unload_content(&foreign),
            Err(ContentError::UnknownAsset("Sprites/hero".to_string()))
        );
        assert_eq!(loader.reference_count("Sprites/hero"), Some(1));
        assert_eq!(
            loader.unload_key("nothing"),
            Err(ContentError::UnknownResourceKey("nothing".to_string()))
        );
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let (mut loader, _) = echo_loader();
        assert!(loader.load_content("Sprites/missing").is_err());
        assert!(!loader.contains("Sprites/missing"));
    }

    #[test]
    fn test_clear_releases_everything() {
        let (mut loader, released) = echo_loader();
        loader.load_content("a").unwrap();
        loader.load_content("a").unwrap();
        loader.load_content("b").unwrap();

        loader.clear();

        let mut names = released.lock().unwrap().clone();
        names.sort();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_content_path_split() {
        let path = ContentPath::parse("Player/idle");
        assert_eq!(path.working_dir(), Some("Player"));
        assert_eq!(path.leaf(), "idle");
        assert_eq!(
            path.meta_file(Path::new("Atlases")),
            Some(PathBuf::from("Atlases/Player/Player_meta.ron"))
        );

        let flat = ContentPath::parse("logo");
        assert_eq!(flat.working_dir(), None);
        assert_eq!(flat.leaf(), "logo");
        assert_eq!(flat.directory(Path::new("Atlases")), PathBuf::from("Atlases"));
        assert_eq!(flat.meta_file(Path::new("Atlases")), None);
    }
}
