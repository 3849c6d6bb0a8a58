//! Draw surface abstraction
//!
//! The scene graph never touches pixels. Components describe batched sprite
//! draws as [`DrawCall`]s and hand them to a host-provided [`DrawSurface`].

mod rect;

pub use rect::Rect;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Opaque texture identifier issued by a texture provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

/// RGBA color with 8-bit channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Create a color from channels
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Decode a packed `0xAABBGGRR` value
    #[must_use]
    pub const fn from_packed(value: u32) -> Self {
        Self::rgba(
            (value & 0xFF) as u8,
            ((value >> 8) & 0xFF) as u8,
            ((value >> 16) & 0xFF) as u8,
            (value >> 24) as u8,
        )
    }

    /// Premultiplied fade: every channel scaled by `alpha`
    #[must_use]
    pub fn faded(self, alpha: f32) -> Self {
        let alpha = alpha.clamp(0.0, 1.0);
        let scale = |c: u8| (f32::from(c) * alpha).round() as u8;
        Self::rgba(scale(self.r), scale(self.g), scale(self.b), scale(self.a))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Sprite mirroring applied at draw time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlipMode {
    #[default]
    None,
    Horizontal,
    Vertical,
}

/// One batched sprite draw
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Texture to sample
    pub texture: Option<TextureHandle>,
    /// Destination on screen, in scaled pixels
    pub destination: Rect,
    /// Source region within the texture
    pub source: Rect,
    /// Tint, already multiplied by the effective alpha
    pub tint: Color,
    /// Rotation in radians
    pub rotation: f32,
    /// Rotation origin within the source region
    pub origin: Vec2,
    /// Mirroring
    pub flip: FlipMode,
    /// Layer depth
    pub depth: f32,
    /// Effective alpha the draw was issued with
    pub alpha: f32,
}

impl Default for DrawCall {
    fn default() -> Self {
        Self {
            texture: None,
            destination: Rect::default(),
            source: Rect::default(),
            tint: Color::WHITE,
            rotation: 0.0,
            origin: Vec2::ZERO,
            flip: FlipMode::None,
            depth: 0.0,
            alpha: 1.0,
        }
    }
}

/// Host-provided sink for draw calls
pub trait DrawSurface {
    /// Queue one draw call
    fn draw(&mut self, call: DrawCall);

    /// Flush the queued draws to the screen
    fn present(&mut self) {}
}

/// A surface that records every call, for headless hosts and tests
#[derive(Debug, Default)]
pub struct RecordingSurface {
    /// Calls queued since the last `present`
    pub calls: Vec<DrawCall>,
    /// Number of `present` calls
    pub frames_presented: u64,
    /// Calls flushed by the most recent `present`
    pub last_frame: Vec<DrawCall>,
}

impl RecordingSurface {
    /// Create an empty recording surface
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DrawSurface for RecordingSurface {
    fn draw(&mut self, call: DrawCall) {
        self.calls.push(call);
    }

    fn present(&mut self) {
        self.last_frame = std::mem::take(&mut self.calls);
        self.frames_presented += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_faded() {
        let color = Color::rgba(200, 100, 50, 255).faded(0.5);
        assert_eq!(color, Color::rgba(100, 50, 25, 128));
    }

    #[test]
    fn test_color_from_packed() {
        assert_eq!(Color::from_packed(0xFF00_00FF), Color::rgba(255, 0, 0, 255));
    }

    #[test]
    fn test_recording_surface_present() {
        let mut surface = RecordingSurface::new();
        surface.draw(DrawCall {
            texture: None,
            destination: Rect::new(0, 0, 1, 1),
            source: Rect::new(0, 0, 1, 1),
            tint: Color::WHITE,
            rotation: 0.0,
            origin: Vec2::ZERO,
            flip: FlipMode::None,
            depth: 0.0,
            alpha: 1.0,
        });
        surface.present();

        assert!(surface.calls.is_empty());
        assert_eq!(surface.last_frame.len(), 1);
        assert_eq!(surface.frames_presented, 1);
    }
}
