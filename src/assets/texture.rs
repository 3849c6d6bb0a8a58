//! Textures, resolved through a host-provided texture provider

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::render::{Rect, TextureHandle};

use super::handle::AssetHandle;
use super::loader::{ContentError, ContentPath, ResourceLoader, ResourceSource, SharedLoader};

/// A texture uploaded by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// The whole texture as a rectangle at the origin
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }
}

/// Host capability that turns image files into textures
pub trait TextureProvider: Send + Sync {
    /// Load the image at `path`
    fn load_texture(&self, path: &Path) -> Result<Texture, ContentError>;

    /// Free a texture nobody references anymore
    fn release_texture(&self, _texture: &Texture) {}
}

/// [`ResourceSource`] producing textures from `<root>/<key>`
#[derive(Clone)]
pub struct TextureSource {
    provider: Arc<dyn TextureProvider>,
}

impl TextureSource {
    pub fn new(provider: Arc<dyn TextureProvider>) -> Self {
        Self { provider }
    }
}

impl fmt::Debug for TextureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureSource").finish_non_exhaustive()
    }
}

impl ResourceSource for TextureSource {
    type Asset = Texture;

    fn load_item(&mut self, root: &Path, path: &ContentPath) -> Result<Texture, ContentError> {
        self.provider.load_texture(&root.join(path.key()))
    }

    fn unload_item(&mut self, asset: &AssetHandle<Texture>) {
        self.provider.release_texture(asset.get());
    }
}

/// Reference-counted texture cache
pub type TextureLoader = ResourceLoader<TextureSource>;

/// One texture cache shared by every loader that needs base textures
pub type SharedTextureLoader = SharedLoader<TextureSource>;

/// Create a texture cache over `provider`
pub fn texture_loader(
    root: impl Into<PathBuf>,
    provider: Arc<dyn TextureProvider>,
) -> TextureLoader {
    ResourceLoader::new(root, TextureSource::new(provider))
}


#[cfg(test)]
mod tests {
    use super::testing::FakeTextures;
    use super::*;

    #[test]
    fn test_texture_paths_join_root() {
        let provider = Arc::new(FakeTextures::default());
        let mut loader = texture_loader("Content/Textures", provider.clone());

        let texture = loader.load_content("Tiles/grass.png").unwrap();
        assert_eq!(texture.bounds(), Rect::new(0, 0, 64, 32));
        assert_eq!(
            *provider.loaded.lock().unwrap(),
            [Path::new("Content/Textures/Tiles/grass.png").display().to_string()]
        );

        loader.unload_content(&texture).unwrap();
        assert_eq!(*provider.released.lock().unwrap(), [TextureHandle(1)]);
    }
}
