//! Draws a string in a bitmap font at the owner's position

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::assets::{AssetHandle, ContentError, TextPlacement, TextureFont, TextureFontLoader};
use crate::render::Color;

use super::{ComponentState, ContentContext, DrawContext, GameComponent};

/// How lines are placed relative to the owner's position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextCentering {
    /// Every line starts at the position
    #[default]
    None,
    /// Every line is centered on the position
    Origin,
    /// Lines are centered within the widest line, which starts at the position
    Block,
}

/// Text component.
///
/// The font is loaded from the first content path. Centering offsets are
/// cached and recomputed whenever the text, centering or font changes.
#[derive(Debug)]
pub struct TextComponent {
    state: ComponentState,
    text: String,
    centering: TextCentering,
    font: Option<AssetHandle<TextureFont>>,
    /// Whether `font` came from the font loader and must be given back
    loaded: bool,
    offsets: Vec<i32>,
    /// Base color; `§` escapes in the text override it
    pub color: Color,
    /// Layer depth
    pub depth: f32,
}

impl TextComponent {
    /// Text drawn in the font at `font_key`
    pub fn new(
        font_key: impl Into<String>,
        text: impl Into<String>,
        color: Color,
        centering: TextCentering,
    ) -> Self {
        let mut component = Self::without_font(text, color, centering);
        component.state = ComponentState::default().with_content_paths([font_key.into()]);
        component
    }

    /// Text with no font yet. Nothing draws until one is set.
    pub fn without_font(text: impl Into<String>, color: Color, centering: TextCentering) -> Self {
        let mut component = Self {
            state: ComponentState::default(),
            text: text.into(),
            centering,
            font: None,
            loaded: false,
            offsets: Vec::new(),
            color,
            depth: 0.0,
        };
        component.recalculate_offsets();
        component
    }

    #[must_use]
    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.text {
            self.text = text;
            self.recalculate_offsets();
        }
    }

    #[must_use]
    pub fn centering(&self) -> TextCentering {
        self.centering
    }

    pub fn set_centering(&mut self, centering: TextCentering) {
        if centering != self.centering {
            self.centering = centering;
            self.recalculate_offsets();
        }
    }

    #[must_use]
    pub fn font(&self) -> Option<&AssetHandle<TextureFont>> {
        self.font.as_ref()
    }

    /// Use a font obtained elsewhere. It is not returned on unload.
    pub fn set_font(&mut self, font: AssetHandle<TextureFont>) {
        self.font = Some(font);
        self.loaded = false;
        self.recalculate_offsets();
    }

    /// Per-line x offsets, in unscaled pixels
    #[must_use]
    pub fn centering_offsets(&self) -> &[i32] {
        &self.offsets
    }

    fn recalculate_offsets(&mut self) {
        self.offsets = match (&self.font, self.centering) {
            (Some(font), TextCentering::Origin) => font.centering_offsets(&self.text),
            (Some(font), TextCentering::Block) => font.block_centering_offsets(&self.text),
            _ => vec![0; self.text.split('\n').count()],
        };
    }
}

impl GameComponent for TextComponent {
    fn type_name(&self) -> &'static str {
        "TextComponent"
    }

    fn state(&self) -> &ComponentState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ComponentState {
        &mut self.state
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn load_content(&mut self, ctx: &mut ContentContext<'_>) -> Result<(), ContentError> {
        if self.loaded {
            return Ok(());
        }
        let Some(key) = self.state.content_paths.first() else {
            return Ok(());
        };
        self.font = Some(ctx.services.require::<TextureFontLoader>()?.load_content(key)?);
        self.loaded = true;
        self.recalculate_offsets();
        Ok(())
    }

    fn unload_content(&mut self, ctx: &mut ContentContext<'_>) -> Result<(), ContentError> {
        if !self.loaded {
            return Ok(());
        }
        if let Some(font) = self.font.take() {
            self.loaded = false;
            ctx.services.require::<TextureFontLoader>()?.unload_content(&font)?;
        }
        Ok(())
    }

    fn draw(&mut self, ctx: &mut DrawContext<'_>) {
        let Some(font) = &self.font else {
            return;
        };
        let Ok(pose) = ctx.world.global_pose(ctx.object) else {
            return;
        };

        let placement = TextPlacement {
            position: ctx.to_screen(pose.position).floor(),
            scale: pose.scale * ctx.viewport_scale,
            rotation: pose.rotation,
            depth: self.depth,
            alpha: ctx.alpha,
        };
        font.draw_string(&mut *ctx.surface, &self.text, self.color, &self.offsets, &placement);
    }
}
