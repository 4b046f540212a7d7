//! Per-pixel color effects for still raster assets.
//!
//! Three stages run in a fixed order on a copy of the source image:
//! fill, then color key, then color keep. Fully transparent pixels are never
//! touched. Percent parameters are clamped to `0..=100`.

mod blend;

pub use blend::BlendMode;

use crate::util::color::HexColorError;
use egui::Color32;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EffectError {
    #[error(transparent)]
    InvalidColor(#[from] HexColorError),
    #[error("invalid effect parameters: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Linear-interpolate opaque pixels toward a blended fill color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FillEffect {
    pub enabled: bool,
    #[serde(with = "crate::util::color::hex")]
    pub color: Color32,
    /// 0-100
    pub opacity: u8,
    pub blend_mode: BlendMode,
    /// When false, alpha is scaled by the opacity as well
    pub preserve_alpha: bool,
}

impl Default for FillEffect {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color32::WHITE,
            opacity: 100,
            blend_mode: BlendMode::Normal,
            preserve_alpha: true,
        }
    }
}

/// Chroma parameters shared by the key and keep stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChromaEffect {
    pub enabled: bool,
    #[serde(with = "crate::util::color::hex")]
    pub color: Color32,
    /// 0-100, mapped onto an RGB distance of 0-255
    pub tolerance: u8,
    /// 0-100
    pub softness: u8,
}

impl Default for ChromaEffect {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color32::GREEN,
            tolerance: 30,
            softness: 0,
        }
    }
}

impl ChromaEffect {
    pub fn new(hex: &str, tolerance: u8, softness: u8) -> Result<Self, EffectError> {
        Ok(Self {
            enabled: true,
            color: crate::util::color::parse_hex_color(hex)?,
            tolerance,
            softness,
        })
    }

    fn tolerance(&self) -> f32 {
        percent(self.tolerance) * 255.0
    }

    fn softness(&self) -> f32 {
        percent(self.softness)
    }
}

impl FillEffect {
    pub fn new(hex: &str, opacity: u8, blend_mode: BlendMode) -> Result<Self, EffectError> {
        Ok(Self {
            enabled: true,
            color: crate::util::color::parse_hex_color(hex)?,
            opacity,
            blend_mode,
            preserve_alpha: true,
        })
    }
}

fn percent(value: u8) -> f32 {
    value.min(100) as f32 / 100.0
}

fn rgb(color: Color32) -> [f32; 3] {
    let [r, g, b, _] = color.to_srgba_unmultiplied();
    [r as f32, g as f32, b as f32]
}

fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

/// The full effect chain of one asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorEffects {
    pub fill: FillEffect,
    pub color_key: ChromaEffect,
    pub color_keep: ChromaEffect,
}

impl ColorEffects {
    pub fn from_json(json: &str) -> Result<Self, EffectError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_identity(&self) -> bool {
        !self.fill.enabled && !self.color_key.enabled && !self.color_keep.enabled
    }

    /// Run the enabled stages over a copy of `source`
    pub fn apply(&self, source: &RgbaImage) -> RgbaImage {
        let mut output = source.clone();
        if self.is_identity() {
            return output;
        }
        for pixel in output.pixels_mut() {
            pixel.0 = self.apply_pixel(pixel.0);
        }
        log::debug!("applied color effects to {}x{} image", source.width(), source.height());
        output
    }

    /// fill → key → keep on one straight-alpha pixel
    pub fn apply_pixel(&self, pixel: [u8; 4]) -> [u8; 4] {
        if pixel[3] == 0 {
            return pixel;
        }
        let mut color = [pixel[0] as f32, pixel[1] as f32, pixel[2] as f32];
        let mut alpha = pixel[3] as f32;

        if self.fill.enabled {
            let amount = percent(self.fill.opacity);
            let fill = rgb(self.fill.color);
            for (channel, target) in color.iter_mut().zip(fill) {
                let blended = self.fill.blend_mode.blend(*channel / 255.0, target / 255.0) * 255.0;
                *channel += (blended - *channel) * amount;
            }
            if !self.fill.preserve_alpha {
                alpha *= amount;
            }
        }

        if self.color_key.enabled && alpha > 0.0 {
            alpha *= key_factor(&self.color_key, color);
        }
        if self.color_keep.enabled && alpha > 0.0 {
            alpha *= keep_factor(&self.color_keep, color);
        }

        let byte = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        [byte(color[0]), byte(color[1]), byte(color[2]), byte(alpha)]
    }
}

/// Alpha multiplier removing pixels near the key color
fn key_factor(effect: &ChromaEffect, color: [f32; 3]) -> f32 {
    let tolerance = effect.tolerance();
    let softness = effect.softness();
    let d = distance(color, rgb(effect.color));
    if d > tolerance {
        return 1.0;
    }
    let ramp = tolerance * softness;
    if softness == 0.0 || ramp == 0.0 {
        return 0.0;
    }
    ((d - tolerance * (1.0 - softness)) / ramp).clamp(0.0, 1.0)
}

/// Alpha multiplier removing pixels far from the keep color
fn keep_factor(effect: &ChromaEffect, color: [f32; 3]) -> f32 {
    let tolerance = effect.tolerance();
    let softness = effect.softness();
    let d = distance(color, rgb(effect.color));
    if d <= tolerance {
        return 1.0;
    }
    let ramp = tolerance * softness;
    if softness == 0.0 || ramp == 0.0 {
        return 0.0;
    }
    (1.0 - (d - tolerance) / ramp).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn key(hex: &str, tolerance: u8, softness: u8) -> ColorEffects {
        ColorEffects {
            color_key: ChromaEffect::new(hex, tolerance, softness).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_key_color_is_removed() {
        let effects = key("#00ff00", 0, 0);
        assert_eq!(effects.apply_pixel([0, 255, 0, 255])[3], 0);
        assert_eq!(effects.apply_pixel([0, 254, 0, 255])[3], 255);
    }

    #[test]
    fn test_key_softness_ramp() {
        // tolerance 255, softness 0.5: alpha ramps from 0 at d=127.5 to 1 at d=255
        let effects = key("#000000", 100, 50);
        assert_eq!(effects.apply_pixel([0, 0, 0, 255])[3], 0);
        let partial = effects.apply_pixel([191, 0, 0, 200])[3];
        assert!(partial > 0 && partial < 200, "{partial}");
        assert_eq!(effects.apply_pixel([255, 0, 0, 200])[3], 200);
    }

    #[test]
    fn test_keep_removes_everything_outside_tolerance() {
        let effects = ColorEffects {
            color_keep: ChromaEffect::new("#ff0000", 10, 0).unwrap(),
            ..Default::default()
        };
        assert_eq!(effects.apply_pixel([0, 0, 255, 255])[3], 0);
        assert_eq!(effects.apply_pixel([250, 5, 5, 255])[3], 255);
    }

    #[test]
    fn test_keep_softness_ramp() {
        // tolerance 51, softness 1: alpha fades to 0 at d=102
        let effects = ColorEffects {
            color_keep: ChromaEffect::new("#000000", 20, 100).unwrap(),
            ..Default::default()
        };
        assert_eq!(effects.apply_pixel([51, 0, 0, 255])[3], 255);
        assert_eq!(effects.apply_pixel([76, 0, 0, 255])[3], 130);
        assert_eq!(effects.apply_pixel([110, 0, 0, 255])[3], 0);
    }

    #[test]
    fn test_transparent_pixels_untouched() {
        let mut effects = key("#000000", 100, 0);
        effects.fill = FillEffect::new("#ffffff", 100, BlendMode::Normal).unwrap();
        assert_eq!(effects.apply_pixel([0, 0, 0, 0]), [0, 0, 0, 0]);
    }

    #[test]
    fn test_fill_lerps_by_opacity() {
        let mut fill = FillEffect::new("#ffffff", 50, BlendMode::Normal).unwrap();
        let effects = ColorEffects {
            fill: fill.clone(),
            ..Default::default()
        };
        assert_eq!(effects.apply_pixel([0, 100, 200, 255]), [128, 178, 228, 255]);

        fill.preserve_alpha = false;
        let effects = ColorEffects { fill, ..Default::default() };
        assert_eq!(effects.apply_pixel([0, 0, 0, 200])[3], 100);
    }

    #[test]
    fn test_fill_multiply() {
        let effects = ColorEffects {
            fill: FillEffect::new("#808080", 100, BlendMode::Multiply).unwrap(),
            ..Default::default()
        };
        assert_eq!(effects.apply_pixel([200, 100, 0, 255]), [100, 50, 0, 255]);
    }

    #[test]
    fn test_stages_run_in_order() {
        // fill turns everything white, so a white key then removes it
        let effects = ColorEffects {
            fill: FillEffect::new("#ffffff", 100, BlendMode::Normal).unwrap(),
            color_key: ChromaEffect::new("#ffffff", 0, 0).unwrap(),
            ..Default::default()
        };
        assert_eq!(effects.apply_pixel([10, 20, 30, 255])[3], 0);
    }

    #[test]
    fn test_apply_leaves_source_alone() {
        let source = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
        let output = key("#00ff00", 10, 0).apply(&source);
        assert_eq!(source.get_pixel(0, 0).0[3], 255);
        assert_eq!(output.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_parse_params() {
        let effects = ColorEffects::from_json(
            r##"{"colorKey": {"enabled": true, "color": "#00FF00", "tolerance": 40, "softness": 10},
                 "fill": {"blendMode": "screen"}}"##,
        )
        .unwrap();
        assert!(effects.color_key.enabled);
        assert_eq!(effects.color_key.color, Color32::from_rgb(0, 255, 0));
        assert_eq!(effects.fill.blend_mode, BlendMode::Screen);
        assert!(ColorEffects::from_json(r##"{"fill": {"color": "green"}}"##).is_err());
        assert!(ChromaEffect::new("#12", 0, 0).is_err());
    }
}
