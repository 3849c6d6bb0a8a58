//! Content loading
//!
//! Provides reference-counted resource management with:
//! - Shared, id-compared asset handles
//! - A cache per resource kind with per-folder metadata lookup
//! - Texture, atlas and sound effect loaders
//! - A type-keyed service container handed to components and scene creators

mod atlas;
mod font;
mod handle;
mod loader;
mod services;
mod sound;
mod texture;

pub use atlas::{
    AtlasDocument, AtlasMeta, DEFAULT_ATLAS_FILE, SharedAtlasLoader, TextureAtlas,
    TextureAtlasLoader, TextureAtlasSource, TextureFrame,
};
pub use font::{
    COLOR_ESCAPE, DEFAULT_FONT_FILE, FontDocument, FontMeta, TextPlacement, TextureFont,
    TextureFontChar, TextureFontLoader, TextureFontSource,
};
pub use handle::AssetHandle;
pub use loader::{
    ContentError, ContentPath, ResourceLoader, ResourceReference, ResourceSource, SharedLoader,
    existing_or_fallback, lock_loader, read_meta_entry, read_ron,
};
pub use services::Services;
pub use sound::{
    PlaybackState, STREAM_CHUNK_BYTES, STREAM_HEADER_BYTES, SharedSoundPool, SoundFx, SoundFxLoader,
    SoundFxReference, SoundFxSource, SoundMeta, SoundPool,
};
pub use texture::{
    SharedTextureLoader, Texture, TextureLoader, TextureProvider, TextureSource, texture_loader,
};

#[cfg(test)]
pub(crate) use font::testing as font_testing;
#[cfg(test)]
pub(crate) use texture::testing;
