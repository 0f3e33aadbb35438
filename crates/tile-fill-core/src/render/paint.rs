use crate::error::{Result, TileFillError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// RGBA color with components in `[0, 1]`. Serialized as `[r, g, b, a]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 1.0
    }
}

impl From<[f32; 4]> for Color {
    fn from(v: [f32; 4]) -> Self {
        Color::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Color> for [f32; 4] {
    fn from(c: Color) -> Self {
        c.to_array()
    }
}

/// Which half of the frame is being drawn.
///
/// Opaque geometry is drawn first (front to back), translucent geometry afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderPass {
    Opaque,
    Translucent,
}

impl FromStr for RenderPass {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "opaque" => Ok(Self::Opaque),
            "translucent" => Ok(Self::Translucent),
            _ => Err(()),
        }
    }
}

/// Frame of reference for `fill-translate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslateAnchor {
    /// Translation is relative to the map (rotates with it).
    #[default]
    Map,
    /// Translation is relative to the screen.
    Viewport,
}

impl FromStr for TranslateAnchor {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "map" => Ok(Self::Map),
            "viewport" => Ok(Self::Viewport),
            _ => Err(()),
        }
    }
}

/// Cross-fade between two sprite images while zooming between their style stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatternFade {
    pub from: String,
    pub to: String,
    #[serde(default = "one")]
    pub from_scale: f32,
    #[serde(default = "one")]
    pub to_scale: f32,
    /// Blend factor: 0 shows `from`, 1 shows `to`.
    #[serde(default)]
    pub t: f32,
}

/// Evaluated paint properties of a fill layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FillPaint {
    #[serde(rename = "fill-color", default = "default_color")]
    pub color: Color,
    #[serde(rename = "fill-opacity", default = "one")]
    pub opacity: f32,
    #[serde(rename = "fill-pattern", default)]
    pub pattern: Option<PatternFade>,
    #[serde(rename = "fill-outline-color", default)]
    pub outline_color: Option<Color>,
    #[serde(rename = "fill-translate", default)]
    pub translate: [f32; 2],
    #[serde(rename = "fill-translate-anchor", default)]
    pub translate_anchor: TranslateAnchor,
    #[serde(rename = "fill-antialias", default = "default_antialias")]
    pub antialias: bool,
}

impl Default for FillPaint {
    fn default() -> Self {
        Self {
            color: default_color(),
            opacity: 1.0,
            pattern: None,
            outline_color: None,
            translate: [0.0, 0.0],
            translate_anchor: TranslateAnchor::Map,
            antialias: default_antialias(),
        }
    }
}

impl FillPaint {
    /// Parse paint properties from a style JSON object. Unknown keys are rejected.
    pub fn from_json(s: &str) -> Result<Self> {
        let paint: FillPaint = serde_json::from_str(s)?;
        paint.validate()?;
        Ok(paint)
    }

    pub fn validate(&self) -> Result<()> {
        let unit = |v: f32| (0.0..=1.0).contains(&v);
        let check_color = |name: &str, c: &Color| {
            if c.to_array().iter().all(|v| unit(*v)) {
                Ok(())
            } else {
                Err(TileFillError::InvalidInput(format!(
                    "{name} components must be in [0, 1], got {:?}",
                    c.to_array()
                )))
            }
        };
        check_color("fill-color", &self.color)?;
        if let Some(c) = &self.outline_color {
            check_color("fill-outline-color", c)?;
        }
        if !unit(self.opacity) {
            return Err(TileFillError::InvalidInput(format!(
                "fill-opacity must be in [0, 1], got {}",
                self.opacity
            )));
        }
        if let Some(p) = &self.pattern {
            if !unit(p.t) {
                return Err(TileFillError::InvalidInput(format!(
                    "fill-pattern t must be in [0, 1], got {}",
                    p.t
                )));
            }
            if !(p.from_scale > 0.0 && p.to_scale > 0.0) {
                return Err(TileFillError::InvalidInput(format!(
                    "fill-pattern scales must be positive, got {} / {}",
                    p.from_scale, p.to_scale
                )));
            }
        }
        Ok(())
    }

    /// Whether the stencil and color passes run during `pass`.
    ///
    /// Patterns may contain transparent pixels, so they always go to the translucent pass;
    /// flat fills go to the opaque pass exactly when their color is fully opaque.
    pub fn draws_in_pass(&self, pass: RenderPass) -> bool {
        match self.pattern {
            Some(_) => pass == RenderPass::Translucent,
            None => (pass == RenderPass::Opaque) == self.color.is_opaque(),
        }
    }

    /// Whether the outline/antialiasing pass runs during `pass`.
    pub fn draws_outline(&self, pass: RenderPass) -> bool {
        pass == RenderPass::Translucent
            && self.antialias
            && !(self.pattern.is_some() && self.outline_color.is_none())
    }
}

/// A fill style layer. Layers sharing geometry with another layer name it in `ref`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillLayer {
    pub id: String,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub paint: FillPaint,
}

impl FillLayer {
    pub fn new(id: impl Into<String>, paint: FillPaint) -> Self {
        Self {
            id: id.into(),
            ref_id: None,
            paint,
        }
    }

    /// Key of the element groups holding this layer's geometry.
    pub fn bucket_id(&self) -> &str {
        self.ref_id.as_deref().unwrap_or(&self.id)
    }
}

fn one() -> f32 {
    1.0
}
fn default_color() -> Color {
    Color::BLACK
}
fn default_antialias() -> bool {
    true
}
