//! Bitmap fonts whose glyphs are atlas frames
//!
//! Font files are RON documents:
//!
//! ```ron
//! (
//!     atlas_path: "Fonts/pixel",
//!     character_spacing: 1,
//!     space_width: 4,
//!     line_height: 10,
//!     characters: {
//!         'A': (frame_id: 1, kerning_width: 5),
//!         'B': (frame_id: 2, kerning_width: 5),
//!     },
//! )
//! ```
//!
//! Keys resolve like atlas keys: `Dir/leaf` reads `<root>/Dir/leaf.ron`,
//! unless `<root>/Dir/Dir_meta.ron` maps `leaf` to `(font_path: "...")`. A
//! missing file falls back to `DefaultFont.ron` in the same folder.
//!
//! Inside a string, `§` followed by ten decimal digits switches the draw
//! color to that packed value for the rest of the string. Malformed escapes
//! are skipped without changing the color.

use std::path::Path;
use std::str::Chars;

use glam::Vec2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::object::rotate;
use crate::render::{Color, DrawCall, DrawSurface, FlipMode, Rect};

use super::atlas::{SharedAtlasLoader, TextureAtlas};
use super::handle::AssetHandle;
use super::loader::{
    ContentError, ContentPath, ResourceLoader, ResourceSource, existing_or_fallback, lock_loader,
    read_meta_entry, read_ron,
};

/// File used when a font cannot be found
pub const DEFAULT_FONT_FILE: &str = "DefaultFont.ron";

/// Starts an inline color change
pub const COLOR_ESCAPE: char = '§';

const COLOR_DIGITS: usize = 10;

/// Glyph metrics for one character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureFontChar {
    /// Atlas frame holding the glyph
    pub frame_id: usize,
    /// Advance before character spacing, in pixels
    pub kerning_width: i32,
}

impl TextureFontChar {
    #[must_use]
    pub const fn new(frame_id: usize, kerning_width: i32) -> Self {
        Self {
            frame_id,
            kerning_width,
        }
    }
}

/// On-disk font description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontDocument {
    /// Atlas key, relative to the atlas root
    pub atlas_path: String,
    #[serde(default)]
    pub character_spacing: i32,
    pub space_width: i32,
    pub line_height: i32,
    #[serde(default)]
    pub characters: FxHashMap<char, TextureFontChar>,
}

/// Per-folder metadata entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontMeta {
    pub font_path: String,
}

/// Where and how a string is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    /// Screen position of the first line's top-left
    pub position: Vec2,
    pub scale: f32,
    /// Radians; lines rotate about `position`
    pub rotation: f32,
    pub depth: f32,
    pub alpha: f32,
}

impl Default for TextPlacement {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            scale: 1.0,
            rotation: 0.0,
            depth: 0.0,
            alpha: 1.0,
        }
    }
}

enum Glyph {
    Recolor(Color),
    Space,
    Char(TextureFontChar),
}

struct Glyphs<'a> {
    font: &'a TextureFont,
    chars: Chars<'a>,
}

impl Iterator for Glyphs<'_> {
    type Item = Glyph;

    fn next(&mut self) -> Option<Glyph> {
        loop {
            match self.chars.next()? {
                COLOR_ESCAPE => {
                    let digits: String = self.chars.by_ref().take(COLOR_DIGITS).collect();
                    if let Some(color) = parse_color(&digits) {
                        return Some(Glyph::Recolor(color));
                    }
                }
                ' ' => return Some(Glyph::Space),
                c => {
                    if let Some(glyph) = self.font.characters.get(&c) {
                        return Some(Glyph::Char(*glyph));
                    }
                }
            }
        }
    }
}

fn parse_color(digits: &str) -> Option<Color> {
    if digits.len() != COLOR_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().map(Color::from_packed)
}

/// A bitmap font over one atlas
#[derive(Debug)]
pub struct TextureFont {
    atlas: AssetHandle<TextureAtlas>,
    characters: FxHashMap<char, TextureFontChar>,
    pub character_spacing: i32,
    pub space_width: i32,
    pub line_height: i32,
}

impl TextureFont {
    pub fn new(
        atlas: AssetHandle<TextureAtlas>,
        characters: FxHashMap<char, TextureFontChar>,
        character_spacing: i32,
        space_width: i32,
        line_height: i32,
    ) -> Self {
        Self {
            atlas,
            characters,
            character_spacing,
            space_width,
            line_height,
        }
    }

    fn from_document(atlas: AssetHandle<TextureAtlas>, document: FontDocument) -> Self {
        Self::new(
            atlas,
            document.characters,
            document.character_spacing,
            document.space_width,
            document.line_height,
        )
    }

    #[must_use]
    pub fn atlas(&self) -> &AssetHandle<TextureAtlas> {
        &self.atlas
    }

    #[must_use]
    pub fn character(&self, c: char) -> Option<&TextureFontChar> {
        self.characters.get(&c)
    }

    fn glyphs<'a>(&'a self, line: &'a str) -> Glyphs<'a> {
        Glyphs {
            font: self,
            chars: line.chars(),
        }
    }

    fn advance(&self, glyph: &Glyph) -> i32 {
        match glyph {
            Glyph::Recolor(_) => 0,
            Glyph::Space => self.space_width,
            Glyph::Char(c) => c.kerning_width + self.character_spacing,
        }
    }

    /// Width of one line in unscaled pixels. Characters the font lacks take
    /// no space.
    #[must_use]
    pub fn measure_line(&self, line: &str) -> i32 {
        self.glyphs(line).map(|g| self.advance(&g)).sum()
    }

    /// Width of the widest line by the height of all lines
    #[must_use]
    pub fn measure_string(&self, text: &str) -> Vec2 {
        let (lines, width) = text
            .split('\n')
            .fold((0, 0), |(count, width), line| (count + 1, width.max(self.measure_line(line))));
        Vec2::new(width as f32, (lines * self.line_height) as f32)
    }

    /// Per-line x offsets that center each line on the draw position
    #[must_use]
    pub fn centering_offsets(&self, text: &str) -> Vec<i32> {
        text.split('\n').map(|line| -self.measure_line(line) / 2).collect()
    }

    /// Per-line x offsets that center each line within the widest one
    #[must_use]
    pub fn block_centering_offsets(&self, text: &str) -> Vec<i32> {
        let widths: Vec<i32> = text.split('\n').map(|line| self.measure_line(line)).collect();
        let widest = widths.iter().copied().max().unwrap_or(0);
        widths.into_iter().map(|w| (widest - w) / 2).collect()
    }

    /// Draw `text` one glyph per call. `line_offsets` shifts each line along
    /// the rotated x axis; missing entries count as zero.
    pub fn draw_string(
        &self,
        surface: &mut dyn DrawSurface,
        text: &str,
        color: Color,
        line_offsets: &[i32],
        placement: &TextPlacement,
    ) {
        let mut color = color;
        let texture = self.atlas.texture().handle;

        for (index, line) in text.split('\n').enumerate() {
            let mut pen = Vec2::new(
                line_offsets.get(index).copied().unwrap_or(0) as f32,
                (index as i32 * self.line_height) as f32,
            );

            for glyph in self.glyphs(line) {
                if let Glyph::Recolor(next) = glyph {
                    color = next;
                    continue;
                }
                if let Glyph::Char(c) = glyph {
                    let frame = self.atlas.frame(c.frame_id);
                    let position =
                        placement.position + rotate(pen, placement.rotation) * placement.scale;
                    let size = frame.bounds.size() * placement.scale;
                    surface.draw(DrawCall {
                        texture: Some(texture),
                        destination: Rect::from_position_size(position, size),
                        source: frame.bounds,
                        tint: color.faded(placement.alpha),
                        rotation: placement.rotation,
                        origin: Vec2::ZERO,
                        flip: FlipMode::None,
                        depth: placement.depth,
                        alpha: placement.alpha,
                    });
                }
                pen.x += self.advance(&glyph) as f32;
            }
        }
    }
}

/// [`ResourceSource`] producing fonts. Glyph atlases come from the shared
/// atlas cache.
#[derive(Debug)]
pub struct TextureFontSource {
    atlases: SharedAtlasLoader,
}

impl TextureFontSource {
    pub fn new(atlases: SharedAtlasLoader) -> Self {
        Self { atlases }
    }

    #[must_use]
    pub fn atlases(&self) -> &SharedAtlasLoader {
        &self.atlases
    }
}

impl ResourceSource for TextureFontSource {
    type Asset = TextureFont;

    fn load_item(&mut self, root: &Path, path: &ContentPath) -> Result<TextureFont, ContentError> {
        let file_name = match read_meta_entry::<FontMeta>(root, path)? {
            Some(meta) => meta.font_path,
            None => format!("{}.ron", path.leaf()),
        };

        let file = existing_or_fallback(&path.directory(root), &file_name, DEFAULT_FONT_FILE);
        let document: FontDocument = read_ron(&file)?;
        let atlas = lock_loader(&self.atlases)?.load_content(&document.atlas_path)?;
        Ok(TextureFont::from_document(atlas, document))
    }

    fn unload_item(&mut self, asset: &AssetHandle<TextureFont>) {
        let released = lock_loader(&self.atlases)
            .and_then(|mut atlases| atlases.unload_content(asset.atlas()));
        if let Err(e) = released {
            log::warn!("Failed to release font atlas: {e}");
        }
    }
}

/// Reference-counted font cache
pub type TextureFontLoader = ResourceLoader<TextureFontSource>;

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::assets::{Texture, TextureFrame};
    use crate::render::TextureHandle;

    /// Font over a 5x8 glyph grid: 'A' is frame 1 and 'B' frame 2
    pub fn two_letter_font() -> TextureFont {
        let texture = AssetHandle::new(Texture {
            handle: TextureHandle(9),
            width: 64,
            height: 8,
        });
        let atlas = AssetHandle::new(TextureAtlas::new(
            texture,
            vec![
                TextureFrame::new(Rect::new(0, 0, 5, 8), FlipMode::None),
                TextureFrame::new(Rect::new(5, 0, 5, 8), FlipMode::None),
            ],
        ));
        let mut characters = FxHashMap::default();
        characters.insert('A', TextureFontChar::new(1, 5));
        characters.insert('B', TextureFontChar::new(2, 4));
        TextureFont::new(atlas, characters, 1, 3, 10)
    }
}
