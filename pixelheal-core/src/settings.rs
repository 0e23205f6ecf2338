//! Immutable simulation settings
//!
//! Every settings struct is a plain value. Updates go through
//! [`SettingsPatch`], which builds a fresh [`ForceFieldSettings`] instead of
//! mutating the one a reader may still hold.

use crate::error::EngineError;
use crate::forces::ForceType;
use crate::particle::{ColorKey, ParticleShape};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Strength and reach of a simple radial force (attraction, repulsion)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RadialForceSettings {
    pub strength: f32,
    pub radius: f32,
}

impl Default for RadialForceSettings {
    fn default() -> Self {
        Self {
            strength: 10.0,
            radius: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VortexSettings {
    pub strength: f32,
    pub radius: f32,
    pub clockwise: bool,
}

impl Default for VortexSettings {
    fn default() -> Self {
        Self {
            strength: 10.0,
            radius: 120.0,
            clockwise: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColliderSettings {
    pub impact_force: f32,
    /// Fraction of inward speed lost on impact, 0 = perfectly elastic
    pub bounce_damping: f32,
    /// 0..=1, how solid the collider feels
    pub hardness: f32,
    pub radius: f32,
}

impl Default for ColliderSettings {
    fn default() -> Self {
        Self {
            impact_force: 8.0,
            bounce_damping: 0.4,
            hardness: 0.8,
            radius: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TurbulenceSettings {
    pub strength: f32,
    pub frequency: f32,
    /// 0..=1, width of the random direction cone
    pub chaos: f32,
    pub radius: f32,
}

impl Default for TurbulenceSettings {
    fn default() -> Self {
        Self {
            strength: 6.0,
            frequency: 0.05,
            chaos: 0.5,
            radius: 140.0,
        }
    }
}

/// Per force-type parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceSettings {
    pub attraction: RadialForceSettings,
    pub repulsion: RadialForceSettings,
    pub vortex: VortexSettings,
    pub collider: ColliderSettings,
    pub turbulence: TurbulenceSettings,
}

impl ForceSettings {
    /// Effect radius of one force type
    pub fn radius_of(&self, force: ForceType) -> f32 {
        match force {
            ForceType::Attraction => self.attraction.radius,
            ForceType::Repulsion => self.repulsion.radius,
            ForceType::Vortex => self.vortex.radius,
            ForceType::Collider => self.collider.radius,
            ForceType::Turbulence => self.turbulence.radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealingSettings {
    /// Fraction of the offset to origin added to velocity each frame
    pub factor: f32,
    /// Share of particles that heal with `partial_multiplier`
    pub partial_fraction: f32,
    pub partial_multiplier: f32,
}

impl Default for HealingSettings {
    fn default() -> Self {
        Self {
            factor: 0.05,
            partial_fraction: 0.0,
            partial_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParticleSettings {
    /// Approximate particle count the sampling grid aims for
    pub density: f32,
    pub size: f32,
    pub shape: ParticleShape,
    /// Pixels with alpha below this are not sampled
    pub alpha_threshold: u8,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            density: 6000.0,
            size: 2.0,
            shape: ParticleShape::Circle,
            alpha_threshold: 128,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderSettings {
    pub background: [u8; 4],
    /// Keep a fading copy of previous frames instead of clearing
    pub trails: bool,
    /// How much of the way back to the background a trail moves per frame
    pub trail_fade: f32,
    pub glow: bool,
    /// Glow halo radius as a multiple of particle size
    pub glow_radius: f32,
    pub glow_intensity: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            background: [0, 0, 0, 255],
            trails: false,
            trail_fade: 0.25,
            glow: false,
            glow_radius: 2.5,
            glow_intensity: 0.35,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterMode {
    #[default]
    Show,
    Hide,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorFilterSettings {
    pub enabled: bool,
    pub selected_colors: BTreeSet<ColorKey>,
    pub mode: FilterMode,
    /// RGB distance within which a color counts as selected, 0 = exact key
    pub tolerance: f32,
}

impl ColorFilterSettings {
    pub fn showing<I: IntoIterator<Item = ColorKey>>(colors: I) -> Self {
        Self {
            enabled: true,
            selected_colors: colors.into_iter().collect(),
            mode: FilterMode::Show,
            tolerance: 0.0,
        }
    }

    pub fn hiding<I: IntoIterator<Item = ColorKey>>(colors: I) -> Self {
        Self {
            mode: FilterMode::Hide,
            ..Self::showing(colors)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerformanceSettings {
    pub adaptive: bool,
    pub target_fps: f32,
    pub min_visible_fraction: f32,
    pub adjust_step: f32,
    pub visible_fraction: f32,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            adaptive: false,
            target_fps: 60.0,
            min_visible_fraction: 0.25,
            adjust_step: 0.05,
            visible_fraction: 1.0,
        }
    }
}

impl PerformanceSettings {
    /// Copy with `visible_fraction` clamped into `[min_visible_fraction, 1]`
    pub fn normalized(self) -> Self {
        let min = self.min_visible_fraction.clamp(0.0, 1.0);
        let fraction = if self.visible_fraction.is_finite() {
            self.visible_fraction
        } else {
            1.0
        };
        Self {
            min_visible_fraction: min,
            visible_fraction: fraction.clamp(min, 1.0),
            ..self
        }
    }
}

/// Complete engine configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForceFieldSettings {
    /// Force used by the pointer in simple mode
    pub active_force: ForceType,
    /// When set, every type in `active_forces` acts at once
    pub combine_forces: bool,
    pub active_forces: Vec<ForceType>,
    pub forces: ForceSettings,
    pub healing: HealingSettings,
    /// Multiplicative velocity damping per frame, below 1
    pub damping: f32,
    pub particles: ParticleSettings,
    pub render: RenderSettings,
    pub color_filter: ColorFilterSettings,
    pub performance: PerformanceSettings,
    /// Nominal frame cadence the engine clock advances by
    pub fps: f32,
    /// Seed for every pseudo-random choice the engine makes
    pub seed: u64,
}

impl Default for ForceFieldSettings {
    fn default() -> Self {
        Self {
            active_force: ForceType::Repulsion,
            combine_forces: false,
            active_forces: Vec::new(),
            forces: ForceSettings::default(),
            healing: HealingSettings::default(),
            damping: 0.95,
            particles: ParticleSettings::default(),
            render: RenderSettings::default(),
            color_filter: ColorFilterSettings::default(),
            performance: PerformanceSettings::default(),
            fps: 60.0,
            seed: 0x5eed_cafe,
        }
    }
}

impl ForceFieldSettings {
    /// Force types the pointer currently drives, in a stable order
    pub fn active_types(&self) -> Vec<ForceType> {
        if !self.combine_forces || self.active_forces.is_empty() {
            return vec![self.active_force];
        }
        let mut seen = BTreeSet::new();
        self.active_forces
            .iter()
            .copied()
            .filter(|f| seen.insert(*f))
            .collect()
    }

    /// Milliseconds the engine clock advances per frame
    pub fn frame_interval_ms(&self) -> f64 {
        let fps = if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            60.0
        };
        1000.0 / fps as f64
    }

    /// Build a new snapshot with every field present in `patch` replaced
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.active_force {
            next.active_force = v;
        }
        if let Some(v) = patch.combine_forces {
            next.combine_forces = v;
        }
        if let Some(v) = &patch.active_forces {
            next.active_forces = v.clone();
        }
        if let Some(v) = patch.forces {
            next.forces = v;
        }
        if let Some(v) = patch.healing {
            next.healing = v;
        }
        if let Some(v) = patch.damping {
            next.damping = v;
        }
        if let Some(v) = patch.particles {
            next.particles = v;
        }
        if let Some(v) = patch.render {
            next.render = v;
        }
        if let Some(v) = &patch.color_filter {
            next.color_filter = v.clone();
        }
        if let Some(v) = patch.performance {
            next.performance = v.normalized();
        }
        if let Some(v) = patch.fps {
            next.fps = v;
        }
        if let Some(v) = patch.seed {
            next.seed = v;
        }
        next
    }

    /// Save the settings to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let json = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&json)?;
        Ok(settings)
    }
}

/// Shallow partial update of [`ForceFieldSettings`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_force: Option<ForceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combine_forces: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_forces: Option<Vec<ForceType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forces: Option<ForceSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healing: Option<HealingSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damping: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub particles: Option<ParticleSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_filter: Option<ColorFilterSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl SettingsPatch {
    pub fn color_filter(filter: ColorFilterSettings) -> Self {
        Self {
            color_filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn performance(performance: PerformanceSettings) -> Self {
        Self {
            performance: Some(performance),
            ..Self::default()
        }
    }

    pub fn active_force(force: ForceType) -> Self {
        Self {
            active_force: Some(force),
            ..Self::default()
        }
    }

    /// Whole-snapshot patch, used when a settings file is reloaded
    pub fn full(settings: &ForceFieldSettings) -> Self {
        Self {
            active_force: Some(settings.active_force),
            combine_forces: Some(settings.combine_forces),
            active_forces: Some(settings.active_forces.clone()),
            forces: Some(settings.forces),
            healing: Some(settings.healing),
            damping: Some(settings.damping),
            particles: Some(settings.particles),
            render: Some(settings.render),
            color_filter: Some(settings.color_filter.clone()),
            performance: Some(settings.performance),
            fps: Some(settings.fps),
            seed: Some(settings.seed),
        }
    }

    /// The same patch with the frame rate left untouched
    pub fn without_fps(self) -> Self {
        Self { fps: None, ..self }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
