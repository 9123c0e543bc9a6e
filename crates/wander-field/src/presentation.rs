//! Boundary to the presentation layer: text metrics.
//!
//! The host measures real fonts; the monospace layout stands in for it when
//! no measurements are available (tests, headless runs).

use glam::{Vec2, Vec3};
use wander_engine::{Camera3D, GlyphTarget};

/// Axis-aligned screen rectangle in pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Smallest rect containing all of `rects`.
    pub fn union(rects: &[Rect]) -> Option<Rect> {
        let first = rects.first()?;
        let (mut min, mut max) = (Vec2::new(first.x, first.y), Vec2::new(first.x + first.width, first.y + first.height));
        for r in &rects[1..] {
            min = min.min(Vec2::new(r.x, r.y));
            max = max.max(Vec2::new(r.x + r.width, r.y + r.height));
        }
        Some(Rect { x: min.x, y: min.y, width: max.x - min.x, height: max.y - min.y })
    }
}

/// Which overlay typography a text is set in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    LandingTitle,
    Sentence,
    ProjectTitle,
    FinaleWord,
}

/// Text measurement supplied by the presenter.
pub trait TextLayout {
    /// Rect of every character of `text` (spaces included) when set centered
    /// in a viewport of `viewport` pixels.
    fn glyph_rects(&self, text: &str, style: TextStyle, viewport: Vec2) -> Vec<Rect>;

    /// World-space size of a keyword label at unit scale.
    fn label_size(&self, word: &str) -> Vec2;
}

/// Fixed-advance layout: every glyph is `0.6 × font size` wide.
#[derive(Debug, Clone)]
pub struct MonospaceLayout {
    pub advance: f32,
    /// Label font size in pixels and padding around it.
    pub label_font: f32,
    pub label_padding: f32,
    /// Pixels to world units for keyword labels.
    pub label_scale: f32,
}

impl Default for MonospaceLayout {
    fn default() -> Self {
        Self {
            advance: 0.6,
            label_font: 64.0,
            label_padding: 40.0,
            label_scale: 0.005,
        }
    }
}

impl MonospaceLayout {
    fn font_size(style: TextStyle) -> f32 {
        match style {
            TextStyle::LandingTitle => 96.0,
            TextStyle::Sentence => 36.0,
            TextStyle::ProjectTitle => 72.0,
            TextStyle::FinaleWord => 83.0,
        }
    }
}

impl TextLayout for MonospaceLayout {
    fn glyph_rects(&self, text: &str, style: TextStyle, viewport: Vec2) -> Vec<Rect> {
        let size = Self::font_size(style);
        let advance = size * self.advance;
        let count = text.chars().count() as f32;
        let left = (viewport.x - advance * count) / 2.0;
        let top = (viewport.y - size) / 2.0;
        (0..text.chars().count())
            .map(|i| Rect { x: left + i as f32 * advance, y: top, width: advance, height: size })
            .collect()
    }

    fn label_size(&self, word: &str) -> Vec2 {
        let n = word.chars().count() as f32;
        Vec2::new(
            (self.advance * self.label_font * n + self.label_padding * 2.0) * self.label_scale,
            (self.label_font + self.label_padding * 2.0) * self.label_scale,
        )
    }
}

/// World point on the camera-facing plane at `depth` behind a screen point.
pub fn screen_to_plane(camera: &Camera3D, pixel: Vec2, depth: f32) -> Option<Vec3> {
    camera.point_at_depth(camera.pixel_to_ndc(pixel.x, pixel.y), depth)
}

/// Project glyph rects onto the plane at `depth`; rect size becomes the jitter box.
pub fn glyph_targets(camera: &Camera3D, rects: &[Rect], depth: f32) -> Vec<GlyphTarget> {
    let scale = camera.units_per_pixel(depth);
    rects
        .iter()
        .filter_map(|r| {
            let position = screen_to_plane(camera, r.center(), depth)?;
            Some(GlyphTarget { position, size: Vec2::new(r.width, r.height) * scale })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monospace_rects_are_centered() {
        let layout = MonospaceLayout::default();
        let viewport = Vec2::new(1000.0, 500.0);
        let rects = layout.glyph_rects("ab c", TextStyle::Sentence, viewport);
        assert_eq!(rects.len(), 4);
        let all = Rect::union(&rects).unwrap();
        assert!((all.center() - viewport / 2.0).length() < 1e-3);
    }

    #[test]
    fn label_size_grows_with_word_length() {
        let layout = MonospaceLayout::default();
        let short = layout.label_size("sea");
        let long = layout.label_size("shelter");
        assert!((short.y - 0.72).abs() < 1e-5);
        assert!((short.x - (0.192 * 3.0 + 0.4)).abs() < 1e-4);
        assert!(long.x > short.x);
    }

    #[test]
    fn centre_glyph_lands_in_front_of_camera() {
        let camera = Camera3D::new(1000.0, 500.0);
        let rect = Rect { x: 490.0, y: 240.0, width: 20.0, height: 20.0 };
        let targets = glyph_targets(&camera, &[rect], 5.0);
        assert_eq!(targets.len(), 1);
        let p = targets[0].position;
        assert!((p - Vec3::new(0.0, 0.0, 0.0)).length() < 1e-3);
        assert!(targets[0].size.x > 0.0);
    }
}
