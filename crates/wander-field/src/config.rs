use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::FieldError;

/// Every tunable of the field: world size, thresholds, fog, particle presets,
/// sequence timings and the finale script.
///
/// Missing fields in a JSON override fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldConfig {
    /// Project ids requested from the host, in canonical matching order.
    pub project_ids: Vec<String>,
    /// Key of the persisted collection state.
    pub storage_key: String,
    pub landing_title: String,
    pub find_sentence: String,
    /// Half-extent `R` of the wrapped field volume.
    pub world_radius: f32,
    /// Selected keywords a project needs before it unlocks.
    pub match_threshold: usize,
    /// Selected user words that start the find-yourself sequence.
    pub find_threshold: usize,
    /// Most hint lines drawn from one selected keyword.
    pub hint_limit: usize,
    pub bob_amplitude: f32,
    pub seed: u64,
    pub fog: FogConfig,
    pub navigation: NavigationConfig,
    pub interaction: InteractionConfig,
    pub particles: ParticleConfig,
    pub reveal: RevealConfig,
    pub finale: FinaleConfig,
    pub gallery: GalleryConfig,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            project_ids: [
                "avatar-zero",
                "mobius",
                "sparkle",
                "farewell",
                "midwest-emo-house",
                "the-place-where-wind-lives",
                "run-back-in-time",
                "faithfall",
                "syncsprite",
                "notes-of-hypnotist",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            storage_key: "collectedProjects".to_string(),
            landing_title: "WANDER".to_string(),
            find_sentence: "Is this yourself in your mind?".to_string(),
            world_radius: 16.0,
            match_threshold: 3,
            find_threshold: 3,
            hint_limit: 5,
            bob_amplitude: 0.002,
            seed: 42,
            fog: FogConfig::default(),
            navigation: NavigationConfig::default(),
            interaction: InteractionConfig::default(),
            particles: ParticleConfig::default(),
            reveal: RevealConfig::default(),
            finale: FinaleConfig::default(),
            gallery: GalleryConfig::default(),
        }
    }
}

impl FieldConfig {
    /// Parse a (possibly partial) JSON override and check it.
    pub fn from_json(json: &str) -> Result<Self, FieldError> {
        let config: Self = serde_json::from_str(json).map_err(|err| FieldError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the field cannot run with.
    pub fn validate(&self) -> Result<(), FieldError> {
        if !self.world_radius.is_finite() || self.world_radius <= 0.0 {
            return Err(FieldError::Config(format!("worldRadius must be positive, got {}", self.world_radius)));
        }
        let fog = &self.fog;
        if !(0.0 < fog.near && fog.near < fog.mid && fog.mid < 1.0 && 1.0 < fog.far) {
            return Err(FieldError::Config(format!(
                "fog bands must satisfy 0 < near < mid < 1 < far, got {} / {} / {}",
                fog.near, fog.mid, fog.far
            )));
        }
        if self.match_threshold == 0 {
            return Err(FieldError::Config("matchThreshold must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Four-segment distance fog, as fractions of the world radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FogConfig {
    pub full_opacity: f32,
    pub mid_opacity: f32,
    pub edge_opacity: f32,
    pub near: f32,
    pub mid: f32,
    pub far: f32,
    /// Fraction of the gap to the target opacity closed per tick.
    pub smoothing: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            full_opacity: 0.6,
            mid_opacity: 0.3,
            edge_opacity: 0.15,
            near: 0.5,
            mid: 0.9,
            far: 1.2,
            smoothing: 0.1,
        }
    }
}

/// Camera inertia. Accelerations are per 60 Hz frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigationConfig {
    pub thrust: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub friction: f32,
    pub min_drift: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            thrust: 0.008,
            yaw: 0.0015,
            pitch: 0.001,
            friction: 0.96,
            min_drift: 0.0008,
        }
    }
}

/// Hover, selection and redistribution feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InteractionConfig {
    pub hover_tint: Vec3,
    pub hover_scale: f32,
    pub selected_tint: Vec3,
    pub selected_scale: f32,
    pub hint_tint: Vec3,
    pub user_hint_tint: Vec3,
    pub orbit_radius: f32,
    pub orbit_step: f32,
    /// Half-range of the redistribution swirl around 90°, in degrees.
    pub swirl_spread_deg: f32,
    pub vertical_jitter: f32,
    pub redistribute_duration: f32,
    pub shatter_delay: f32,
    pub fade_in_duration: f32,
    pub help_delay: f32,
    pub help_window: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            hover_tint: Vec3::new(0.25, 0.56, 0.60),
            hover_scale: 1.2,
            selected_tint: Vec3::new(0.0, 1.0, 0.8),
            selected_scale: 1.15,
            hint_tint: Vec3::new(0.36, 0.75, 0.74),
            user_hint_tint: Vec3::new(0.6, 0.9, 0.85),
            orbit_radius: 8.0,
            orbit_step: 4.0,
            swirl_spread_deg: 25.0,
            vertical_jitter: 3.0,
            redistribute_duration: 2.5,
            shatter_delay: 1.6,
            fade_in_duration: 2.0,
            help_delay: 1.2,
            help_window: 8.0,
        }
    }
}

/// Particle counts per effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParticleConfig {
    pub shatter_count: usize,
    pub shatter_lifespan: f32,
    pub shatter_depth: f32,
    pub bloom_count: usize,
    pub bloom_lifespan: f32,
    pub sentence_count: usize,
    pub finale_gather_count: usize,
    pub finale_word_count: usize,
    pub finale_word_lifespan: f32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            shatter_count: 500,
            shatter_lifespan: 3.4,
            shatter_depth: 4.2,
            bloom_count: 80,
            bloom_lifespan: 1.5,
            sentence_count: 1500,
            finale_gather_count: 3600,
            finale_word_count: 2600,
            finale_word_lifespan: 7.5,
        }
    }
}

/// Timings of the unlock reveal (also reused by find-yourself).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RevealConfig {
    pub dim_duration: f32,
    pub gather_duration: f32,
    pub explode_after: f32,
    pub anchor_depth: f32,
    pub word_gap: f32,
    pub gather_scale: f32,
    pub sentence_depth: f32,
    pub glyph_stagger: f32,
    pub blur_at: f32,
    pub complete_after: f32,
    pub scatter_duration: f32,
    pub title_delay: f32,
    pub title_stagger: f32,
    pub scroll_stage_after: f32,
    /// Scroll distance in viewport heights.
    pub scroll_distance: f32,
    pub cover_boost: f32,
    pub complete_progress: f32,
    pub panel_stagger: f32,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            dim_duration: 0.8,
            gather_duration: 2.2,
            explode_after: 2.6,
            anchor_depth: 6.0,
            word_gap: 0.7,
            gather_scale: 1.4,
            sentence_depth: 5.0,
            glyph_stagger: 0.02,
            blur_at: 5.0,
            complete_after: 12.0,
            scatter_duration: 1.5,
            title_delay: 1.5,
            title_stagger: 0.2,
            scroll_stage_after: 3.5,
            scroll_distance: 1.2,
            cover_boost: 1.8,
            complete_progress: 0.95,
            panel_stagger: 0.05,
        }
    }
}

/// The closing sequence script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FinaleConfig {
    pub words: Vec<String>,
    /// Display time of the middle word.
    pub min_word: f32,
    /// Display time of the first and last word.
    pub max_word: f32,
    pub spin_start: f32,
    /// (target speed, duration) per spin segment.
    pub spin_segments: Vec<(f32, f32)>,
    pub pause: f32,
    pub gather_point: Vec3,
    pub zoom_depth: f32,
    pub hold: f32,
    pub word_depth: f32,
    pub message: Vec<String>,
    pub line_delays: Vec<f32>,
    pub message_delay: f32,
    pub scatter_after: f32,
}

impl Default for FinaleConfig {
    fn default() -> Self {
        let words = [
            "WHERE", "DO", "WE", "GO", "NEXT", "FIND", "SELF", "FREE", "LIFE", "EXIST", "TIME", "ICE",
            "HOW", "BECOME", "ESCAPE", "STAY", "MOVE", "DRIFT", "WANDER", "SEARCH", "FORGET",
            "REMEMBER", "RETURN", "ARRIVE", "INSIDE", "OUTSIDE", "BETWEEN", "EDGE", "BORDER", "SHELL",
            "CORE", "SKIN", "MASK", "NAME", "VOICE", "SHAPE", "NOW", "THEN", "STILL", "AGAIN",
            "ALREADY", "YET", "SOON", "LATE", "PAUSE", "LOOP", "TRACE", "FADING", "HERE", "THERE",
            "NOWHERE", "ANYWHERE", "ROOM", "FIELD", "VOID", "PATH", "ROAD", "SHELTER", "ORIGIN",
            "QUIET", "HOME", "NEVER", "DEFINE", "END", "YOU",
        ];
        Self {
            words: words.iter().map(|w| w.to_string()).collect(),
            min_word: 0.08,
            max_word: 0.7,
            spin_start: 0.2,
            spin_segments: vec![(1.4, 2.2), (4.5, 3.4), (10.5, 2.6), (0.08, 1.8)],
            pause: 3.0,
            gather_point: Vec3::new(0.0, 0.0, -2.0),
            zoom_depth: 3.5,
            hold: 5.0,
            word_depth: 4.5,
            message: vec![
                "Thank you for finding me.".to_string(),
                "Your turn to find yourself.".to_string(),
            ],
            line_delays: vec![0.4, 5.4],
            message_delay: 5.2,
            scatter_after: 15.9,
        }
    }
}

impl FinaleConfig {
    /// Display time of word `index`: long at both ends, short in the middle.
    pub fn word_duration(&self, index: usize) -> f32 {
        let n = self.words.len();
        let t = if n > 1 { index as f32 / (n - 1) as f32 } else { 0.0 };
        let shape = (std::f32::consts::PI * t).sin();
        self.min_word + (1.0 - shape) * (self.max_word - self.min_word)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GalleryConfig {
    pub row_counts: Vec<usize>,
    pub spacing_x: f32,
    pub spacing_y: f32,
    pub card_width: f32,
    pub card_height: f32,
    pub camera_distance: f32,
    pub hover_scale: f32,
    pub focus_depth: f32,
    pub transition: f32,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            row_counts: vec![3, 4, 3],
            spacing_x: 5.4,
            spacing_y: 3.8,
            card_width: 3.6,
            card_height: 2.3,
            camera_distance: 12.0,
            hover_scale: 1.1,
            focus_depth: 4.6,
            transition: 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = FieldConfig::from_json(r#"{"worldRadius": 20.0, "fog": {"smoothing": 0.2}}"#).unwrap();
        assert_eq!(cfg.world_radius, 20.0);
        assert_eq!(cfg.fog.smoothing, 0.2);
        assert_eq!(cfg.fog.full_opacity, 0.6);
        assert_eq!(cfg.match_threshold, 3);
        assert_eq!(cfg.project_ids.len(), 10);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(FieldConfig::from_json("{ not json"), Err(FieldError::Config(_))));
    }

    #[test]
    fn non_positive_world_radius_is_rejected() {
        for json in [r#"{"worldRadius": 0.0}"#, r#"{"worldRadius": -16.0}"#] {
            assert!(matches!(FieldConfig::from_json(json), Err(FieldError::Config(_))), "{}", json);
        }
        assert!(FieldConfig::from_json(r#"{"fog": {"near": 0.95}}"#).is_err());
        assert!(FieldConfig::from_json(r#"{"matchThreshold": 0}"#).is_err());
        assert!(FieldConfig::default().validate().is_ok());
    }

    #[test]
    fn word_timing_lingers_at_the_edges() {
        let finale = FinaleConfig::default();
        assert_eq!(finale.words.len(), 65);
        let first = finale.word_duration(0);
        let middle = finale.word_duration(32);
        let last = finale.word_duration(64);
        assert!((first - 0.7).abs() < 1e-5);
        assert!((last - 0.7).abs() < 1e-4);
        assert!((middle - 0.08).abs() < 1e-4);
    }
}
