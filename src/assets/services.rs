//! Type-keyed service container
//!
//! Holds the loaders and other shared state that components reach for while
//! loading content and that scene creators receive when building a scene.

use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::core::config::EngineConfig;

use super::atlas::TextureAtlasSource;
use super::font::{TextureFontLoader, TextureFontSource};
use super::loader::{ContentError, ResourceLoader};
use super::sound::{SoundFxLoader, SoundFxSource};
use super::texture::{TextureProvider, texture_loader};

/// One instance per type of anything `Send + 'static`
#[derive(Default)]
pub struct Services {
    entries: FxHashMap<TypeId, Box<dyn Any + Send>>,
}

impl Services {
    /// Create an empty container
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Texture, atlas, font and sound loaders rooted as `config` describes.
    /// Fonts draw their atlases from the shared atlas cache, and atlases their
    /// base textures from the shared texture cache.
    pub fn standard(config: &EngineConfig, provider: Arc<dyn TextureProvider>) -> Self {
        let textures = texture_loader(config.texture_root(), provider).into_shared();
        let atlas_source = TextureAtlasSource::new(Arc::clone(&textures));
        let atlases = ResourceLoader::new(config.atlas_root(), atlas_source).into_shared();

        let mut services = Self::new();
        services.insert::<TextureFontLoader>(ResourceLoader::new(
            config.font_root(),
            TextureFontSource::new(Arc::clone(&atlases)),
        ));
        services.insert(atlases);
        services.insert(textures);
        services.insert::<SoundFxLoader>(ResourceLoader::new(
            config.sound_root(),
            SoundFxSource::new(config.sound_pool_capacity),
        ));
        services.insert(config.clone());
        services
    }

    /// Store a service, returning the one it replaces
    pub fn insert<T: Send + 'static>(&mut self, service: T) -> Option<T> {
        self.entries
            .insert(TypeId::of::<T>(), Box::new(service))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    #[must_use]
    pub fn get<T: Send + 'static>(&self) -> Option<&T> {
        self.entries.get(&TypeId::of::<T>())?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Send + 'static>(&mut self) -> Option<&mut T> {
        self.entries.get_mut(&TypeId::of::<T>())?.downcast_mut::<T>()
    }

    /// Like [`get_mut`](Self::get_mut), reporting a missing service as an error
    pub fn require<T: Send + 'static>(&mut self) -> Result<&mut T, ContentError> {
        self.get_mut::<T>()
            .ok_or(ContentError::MissingService(type_name::<T>()))
    }

    pub fn remove<T: Send + 'static>(&mut self) -> Option<T> {
        self.entries
            .remove(&TypeId::of::<T>())
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    #[must_use]
    pub fn contains<T: Send + 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::texture::testing::FakeTextures;
    use crate::assets::{SharedAtlasLoader, SharedTextureLoader};

    #[test]
    fn test_insert_get_replace() {
        let mut services = Services::new();
        assert_eq!(services.insert(5_u32), None);
        assert_eq!(services.insert(7_u32), Some(5));
        services.insert("name".to_string());

        assert_eq!(services.get::<u32>(), Some(&7));
        *services.get_mut::<String>().unwrap() += "d";
        assert_eq!(services.get::<String>().map(String::as_str), Some("named"));
        assert_eq!(services.len(), 2);
    }

    #[test]
    fn test_require_reports_missing() {
        let mut services = Services::new();
        assert!(matches!(
            services.require::<SoundFxLoader>(),
            Err(ContentError::MissingService(_))
        ));
    }

    #[test]
    fn test_standard_services() {
        let config = EngineConfig::default();
        let services = Services::standard(&config, Arc::new(FakeTextures::default()));

        assert!(services.contains::<SharedTextureLoader>());
        assert!(services.contains::<SharedAtlasLoader>());
        assert!(services.contains::<TextureFontLoader>());
        assert!(services.contains::<SoundFxLoader>());
        assert_eq!(services.get::<EngineConfig>().map(|c| c.sound_pool_capacity), Some(64));
    }
}
