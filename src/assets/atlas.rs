//! Texture atlases: named sub-rectangles of one base texture
//!
//! Atlas files are RON documents:
//!
//! ```ron
//! (
//!     texture_path: "Player/hero.png",
//!     frames: [
//!         (bounds: (x: 0, y: 0, width: 16, height: 16)),
//!         (bounds: (x: 16, y: 0, width: 16, height: 16), flip: Horizontal),
//!     ],
//! )
//! ```
//!
//! A key `Dir/leaf` resolves to `<root>/Dir/leaf.ron`, unless
//! `<root>/Dir/Dir_meta.ron` maps `leaf` to another file:
//!
//! ```ron
//! { "leaf": (atlas_path: "hero_atlas.ron") }
//! ```
//!
//! A missing atlas file falls back to `DefaultAtlas.ron` in the same folder.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::render::{FlipMode, Rect};

use super::handle::AssetHandle;
use super::loader::{
    ContentError, ContentPath, ResourceLoader, ResourceSource, SharedLoader, existing_or_fallback,
    lock_loader, read_meta_entry, read_ron,
};
use super::texture::{SharedTextureLoader, Texture};

/// File used when an atlas cannot be found
pub const DEFAULT_ATLAS_FILE: &str = "DefaultAtlas.ron";

/// One region of an atlas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureFrame {
    pub bounds: Rect,
    #[serde(default)]
    pub flip: FlipMode,
}

impl TextureFrame {
    #[must_use]
    pub const fn new(bounds: Rect, flip: FlipMode) -> Self {
        Self { bounds, flip }
    }
}

/// Frames cut from one base texture. Frame 0 always spans the whole texture.
#[derive(Debug)]
pub struct TextureAtlas {
    texture: AssetHandle<Texture>,
    frames: Vec<TextureFrame>,
}

impl TextureAtlas {
    /// Build an atlas, inserting the whole-texture frame first if missing
    #[must_use]
    pub fn new(texture: AssetHandle<Texture>, mut frames: Vec<TextureFrame>) -> Self {
        let whole = texture.bounds();
        if frames.first().is_none_or(|f| f.bounds != whole) {
            frames.insert(0, TextureFrame::new(whole, FlipMode::None));
        }
        Self { texture, frames }
    }

    #[must_use]
    pub fn texture(&self) -> &AssetHandle<Texture> {
        &self.texture
    }

    #[must_use]
    pub fn frames(&self) -> &[TextureFrame] {
        &self.frames
    }

    /// Get a frame, falling back to the whole texture when out of range
    #[must_use]
    pub fn frame(&self, index: usize) -> &TextureFrame {
        self.frames.get(index).unwrap_or(&self.frames[0])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Never true: frame 0 always exists
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// On-disk atlas description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasDocument {
    /// Texture key, relative to the texture root
    pub texture_path: String,
    #[serde(default)]
    pub frames: Vec<TextureFrame>,
}

/// Per-folder metadata entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasMeta {
    pub atlas_path: String,
}

/// [`ResourceSource`] producing atlases. Base textures come from the shared
/// texture cache, so a texture reached through an atlas and one loaded
/// directly are the same entry.
#[derive(Debug)]
pub struct TextureAtlasSource {
    textures: SharedTextureLoader,
}

impl TextureAtlasSource {
    pub fn new(textures: SharedTextureLoader) -> Self {
        Self { textures }
    }

    #[must_use]
    pub fn textures(&self) -> &SharedTextureLoader {
        &self.textures
    }
}

impl ResourceSource for TextureAtlasSource {
    type Asset = TextureAtlas;

    fn load_item(&mut self, root: &Path, path: &ContentPath) -> Result<TextureAtlas, ContentError> {
        let directory = path.directory(root);
        let file_name = match read_meta_entry::<AtlasMeta>(root, path)? {
            Some(meta) => meta.atlas_path,
            None => format!("{}.ron", path.leaf()),
        };

        let file = existing_or_fallback(&directory, &file_name, DEFAULT_ATLAS_FILE);
        let document: AtlasDocument = read_ron(&file)?;
        let texture = lock_loader(&self.textures)?.load_content(&document.texture_path)?;
        Ok(TextureAtlas::new(texture, document.frames))
    }

    fn unload_item(&mut self, asset: &AssetHandle<TextureAtlas>) {
        let released = lock_loader(&self.textures)
            .and_then(|mut textures| textures.unload_content(asset.texture()));
        if let Err(e) = released {
            log::warn!("Failed to release atlas texture: {e}");
        }
    }
}

/// Reference-counted atlas cache
pub type TextureAtlasLoader = ResourceLoader<TextureAtlasSource>;

/// Atlas cache shared with the font loader
pub type SharedAtlasLoader = SharedLoader<TextureAtlasSource>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::texture::testing::FakeTextures;
    use crate::assets::texture::texture_loader;
    use crate::render::TextureHandle;
    use std::fs;
    use std::sync::Arc;

    fn atlas_loader(root: &Path, provider: Arc<FakeTextures>) -> TextureAtlasLoader {
        let textures = texture_loader(root.join("Textures"), provider).into_shared();
        ResourceLoader::new(root.join("Atlases"), TextureAtlasSource::new(textures))
    }

    fn write(path: &Path, text: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_frame_zero_is_whole_texture() {
        let texture = AssetHandle::new(Texture {
            handle: TextureHandle(1),
            width: 64,
            height: 32,
        });
        let atlas = TextureAtlas::new(
            texture,
            vec![TextureFrame::new(Rect::new(0, 0, 16, 16), FlipMode::None)],
        );

        assert_eq!(atlas.len(), 2);
        assert_eq!(atlas.frame(0).bounds, Rect::new(0, 0, 64, 32));
        assert_eq!(atlas.frame(1).bounds, Rect::new(0, 0, 16, 16));
        // Out of range falls back to the whole texture
        assert_eq!(atlas.frame(9).bounds, Rect::new(0, 0, 64, 32));
    }

    #[test]
    fn test_meta_file_redirects_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let atlases = dir.path().join("Atlases");
        write(
            &atlases.join("Hero/Hero_meta.ron"),
            r#"{ "walk": (atlas_path: "hero_sheet.ron") }"#,
        );
        write(
            &atlases.join("Hero/hero_sheet.ron"),
            r#"(
                texture_path: "hero.png",
                frames: [(bounds: (x: 0, y: 0, width: 8, height: 8), flip: Horizontal)],
            )"#,
        );

        let provider = Arc::new(FakeTextures::default());
        let mut loader = atlas_loader(dir.path(), provider.clone());
        let atlas = loader.load_content("Hero/walk").unwrap();

        assert_eq!(atlas.len(), 2);
        assert_eq!(atlas.frame(1).flip, FlipMode::Horizontal);
        assert!(provider.loaded.lock().unwrap()[0].ends_with("hero.png"));
    }

    #[test]
    fn test_missing_atlas_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("Atlases/Props/DefaultAtlas.ron"),
            r#"(texture_path: "missing.png")"#,
        );

        let provider = Arc::new(FakeTextures::default());
        let mut loader = atlas_loader(dir.path(), provider);
        let atlas = loader.load_content("Props/barrel").unwrap();

        assert_eq!(atlas.len(), 1);
    }

    #[test]
    fn test_release_frees_base_texture() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("Atlases/ui.ron"), r#"(texture_path: "ui.png")"#);

        let provider = Arc::new(FakeTextures::default());
        let mut loader = atlas_loader(dir.path(), provider.clone());
        let atlas = loader.load_content("ui").unwrap();
        assert!(loader.source().textures().lock().unwrap().contains("ui.png"));

        assert!(loader.unload_content(&atlas).unwrap());
        assert!(!loader.source().textures().lock().unwrap().contains("ui.png"));
        assert_eq!(provider.released.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_atlas_texture_shares_direct_cache_entry() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("Atlases/ui.ron"), r#"(texture_path: "ui.png")"#);

        let provider = Arc::new(FakeTextures::default());
        let mut loader = atlas_loader(dir.path(), provider.clone());
        let shared = Arc::clone(loader.source().textures());
        let direct = shared.lock().unwrap().load_content("ui.png").unwrap();
        let atlas = loader.load_content("ui").unwrap();

        assert_eq!(*atlas.texture(), direct);
        assert_eq!(shared.lock().unwrap().reference_count("ui.png"), Some(2));
        assert_eq!(provider.loaded.lock().unwrap().len(), 1);

        loader.unload_content(&atlas).unwrap();
        assert_eq!(shared.lock().unwrap().reference_count("ui.png"), Some(1));
    }
}
