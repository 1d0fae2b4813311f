//! Water shading materials: a shared parameter base plus sine-wave and
//! Gerstner-wave variants, and the scene presets built from them.
//!
//! Every parameter is optional at the call site; unset fields fall back to
//! their defaults key by key, so a preset can override two colors without
//! restating the whole set. Water materials render to the window surface and
//! carry no texture maps.

use glam::{Vec2, Vec3, vec2, vec3};

use crate::material::{Material, UniformMap, UniformValue};
use crate::mesh::TrsTransform;

const SINE_WAVE_SOURCE: &str = include_str!("shaders/sine_wave.wgsl");
const GERSTNER_WAVE_SOURCE: &str = include_str!("shaders/gerstner_wave.wgsl");

/// Hard cap on Gerstner wave layers; the shader's wave array is this size.
pub const MAX_GERSTNER_WAVES: usize = 8;

/// Shared water appearance parameters. `None` fields resolve to defaults.
#[derive(Clone, Debug, Default)]
pub struct WaterParams {
    pub water_color: Option<Vec3>,
    pub deep_water_color: Option<Vec3>,
    pub shallow_water_color: Option<Vec3>,
    pub transparency: Option<f32>,
    pub reflectance: Option<f32>,
    pub refractive_index: Option<f32>,
    pub time: Option<f32>,
    pub specular_power: Option<f32>,
    pub fresnel_power: Option<f32>,
}

impl WaterParams {
    /// Merge against the defaults, field by field.
    fn resolve(&self) -> ResolvedWaterParams {
        ResolvedWaterParams {
            water_color: self.water_color.unwrap_or(vec3(0.1, 0.3, 0.5)),
            deep_water_color: self.deep_water_color.unwrap_or(vec3(0.0, 0.1, 0.2)),
            shallow_water_color: self.shallow_water_color.unwrap_or(vec3(0.2, 0.6, 0.8)),
            transparency: self.transparency.unwrap_or(0.8),
            reflectance: self.reflectance.unwrap_or(0.3),
            refractive_index: self.refractive_index.unwrap_or(1.33),
            time: self.time.unwrap_or(0.0),
            specular_power: self.specular_power.unwrap_or(32.0),
            fresnel_power: self.fresnel_power.unwrap_or(5.0),
        }
    }
}

struct ResolvedWaterParams {
    water_color: Vec3,
    deep_water_color: Vec3,
    shallow_water_color: Vec3,
    transparency: f32,
    reflectance: f32,
    refractive_index: f32,
    time: f32,
    specular_power: f32,
    fresnel_power: f32,
}

impl ResolvedWaterParams {
    /// Insert the base uniforms in their canonical block order.
    fn fill(&self, uniforms: &mut UniformMap) {
        uniforms.insert("water_color", UniformValue::Vec3(self.water_color));
        uniforms.insert("deep_water_color", UniformValue::Vec3(self.deep_water_color));
        uniforms.insert(
            "shallow_water_color",
            UniformValue::Vec3(self.shallow_water_color),
        );
        uniforms.insert("transparency", UniformValue::Float(self.transparency));
        uniforms.insert("reflectance", UniformValue::Float(self.reflectance));
        uniforms.insert(
            "refractive_index",
            UniformValue::Float(self.refractive_index),
        );
        uniforms.insert("time", UniformValue::Float(self.time));
        uniforms.insert("specular_power", UniformValue::Float(self.specular_power));
        uniforms.insert("fresnel_power", UniformValue::Float(self.fresnel_power));
    }
}

/// Sine-wave material parameters.
#[derive(Clone, Debug, Default)]
pub struct SineWaveParams {
    pub water: WaterParams,
    /// Wave amplitude A.
    pub amplitude: Option<f32>,
    /// Wave number k.
    pub wave_vector: Option<f32>,
    /// Angular frequency ω.
    pub angular_frequency: Option<f32>,
}

/// One Gerstner wave layer.
#[derive(Clone, Copy, Debug)]
pub struct GerstnerWave {
    /// Propagation direction in the XZ plane; normalized by the shader.
    pub direction: Vec2,
    pub steepness: f32,
    pub wavelength: f32,
    pub speed_multiplier: f32,
    pub phase: f32,
}

impl Default for GerstnerWave {
    fn default() -> Self {
        Self {
            direction: vec2(1.0, 0.0),
            steepness: 0.3,
            wavelength: 10.0,
            speed_multiplier: 1.0,
            phase: 0.0,
        }
    }
}

/// Gerstner-wave material parameters.
#[derive(Clone, Debug, Default)]
pub struct GerstnerWaveParams {
    pub water: WaterParams,
    /// Wave layers; anything past [`MAX_GERSTNER_WAVES`] is dropped.
    pub waves: Vec<GerstnerWave>,
    /// Active layer count. Defaults to the (capped) length of `waves`.
    pub wave_count: Option<usize>,
}

/// Build the sine-wave water material.
pub fn sine_wave_material(params: &SineWaveParams) -> Material {
    let mut uniforms = UniformMap::new();
    params.water.resolve().fill(&mut uniforms);

    let tau = std::f32::consts::TAU;
    uniforms.insert(
        "amplitude",
        UniformValue::Float(params.amplitude.unwrap_or(0.1)),
    );
    uniforms.insert(
        "wave_vector",
        UniformValue::Float(params.wave_vector.unwrap_or(0.1 * tau)),
    );
    uniforms.insert(
        "angular_freq",
        UniformValue::Float(params.angular_frequency.unwrap_or(tau)),
    );

    Material::new("Sine Wave Water", uniforms, SINE_WAVE_SOURCE, None)
}

/// Build the Gerstner-wave water material.
///
/// Waves beyond the eight-layer cap are truncated with a warning; an empty
/// wave list falls back to a single default layer. The uniform set always
/// declares all eight layers so the block spans the shader's full wave
/// array; layers past `wave_count` are zero-filled and never read.
pub fn gerstner_wave_material(params: &GerstnerWaveParams) -> Material {
    let mut waves = params.waves.clone();
    if waves.len() > MAX_GERSTNER_WAVES {
        log::warn!(
            "gerstner wave list has {} layers; truncating to {}",
            waves.len(),
            MAX_GERSTNER_WAVES
        );
        waves.truncate(MAX_GERSTNER_WAVES);
    }
    if waves.is_empty() {
        waves.push(GerstnerWave::default());
    }
    let wave_count = params
        .wave_count
        .unwrap_or(waves.len())
        .min(waves.len())
        .min(MAX_GERSTNER_WAVES);

    let mut uniforms = UniformMap::new();
    params.water.resolve().fill(&mut uniforms);
    uniforms.insert("wave_count", UniformValue::Int(wave_count as i32));
    let zero = GerstnerWave {
        direction: Vec2::ZERO,
        steepness: 0.0,
        wavelength: 0.0,
        speed_multiplier: 0.0,
        phase: 0.0,
    };
    for i in 0..MAX_GERSTNER_WAVES {
        let wave = if i < wave_count { &waves[i] } else { &zero };
        uniforms.insert(
            &format!("waves[{}].direction", i),
            UniformValue::Vec2(wave.direction),
        );
        uniforms.insert(
            &format!("waves[{}].steepness", i),
            UniformValue::Float(wave.steepness),
        );
        uniforms.insert(
            &format!("waves[{}].wavelength", i),
            UniformValue::Float(wave.wavelength),
        );
        uniforms.insert(
            &format!("waves[{}].speed_multiplier", i),
            UniformValue::Float(wave.speed_multiplier),
        );
        uniforms.insert(
            &format!("waves[{}].phase", i),
            UniformValue::Float(wave.phase),
        );
    }

    Material::new("Gerstner Wave Water", uniforms, GERSTNER_WAVE_SOURCE, None)
}

/// Which wave model a water surface uses.
#[derive(Clone, Debug)]
pub enum WaveModel {
    Sine(SineWaveParams),
    Gerstner(GerstnerWaveParams),
}

/// A complete water setup: geometry parameters plus a wave material.
#[derive(Clone, Debug)]
pub struct WaterConfig {
    pub size: f32,
    pub resolution: u32,
    pub transform: TrsTransform,
    pub model: WaveModel,
}

impl WaterConfig {
    /// Build this configuration's material.
    pub fn material(&self) -> Material {
        match &self.model {
            WaveModel::Sine(params) => sine_wave_material(params),
            WaveModel::Gerstner(params) => gerstner_wave_material(params),
        }
    }
}

/// A calm lake: gentle single sine wave, high transparency.
pub fn calm_lake() -> WaterConfig {
    let tau = std::f32::consts::TAU;
    WaterConfig {
        size: 50.0,
        resolution: 250,
        transform: TrsTransform::default(),
        model: WaveModel::Sine(SineWaveParams {
            water: WaterParams {
                water_color: Some(vec3(0.1, 0.3, 0.5)),
                deep_water_color: Some(vec3(0.0, 0.1, 0.2)),
                shallow_water_color: Some(vec3(0.2, 0.6, 0.8)),
                transparency: Some(0.85),
                reflectance: Some(0.4),
                refractive_index: Some(1.33),
                ..Default::default()
            },
            amplitude: Some(0.2),
            wave_vector: Some(0.1 * tau),
            angular_frequency: Some(tau),
        }),
    }
}

/// Open ocean: all eight Gerstner layers, mixing calm, moderate, and rough
/// wave banks.
pub fn gerstner_ocean() -> WaterConfig {
    use std::f32::consts::PI;

    let wave = |dx: f32, dz: f32, steepness: f32, wavelength: f32, speed: f32, phase: f32| {
        GerstnerWave {
            direction: vec2(dx, dz),
            steepness,
            wavelength,
            speed_multiplier: speed,
            phase,
        }
    };
    let waves = vec![
        // calm bank
        wave(1.0, 0.0, 0.1, 10.0, 0.8, 0.0),
        wave(0.8, 0.6, 0.08, 12.0, 0.9, PI * 0.3),
        // moderate bank
        wave(1.0, 0.0, 0.3, 10.0, 1.0, 0.0),
        wave(0.7, 0.7, 0.25, 8.0, 1.2, PI * 0.5),
        wave(-0.5, 0.8, 0.2, 6.0, 1.5, PI),
        // rough bank
        wave(1.0, 0.0, 0.5, 12.0, 1.0, 0.0),
        wave(0.7, 0.7, 0.4, 8.0, 1.3, PI * 0.4),
        wave(-0.6, 0.8, 0.35, 6.0, 1.8, PI * 0.7),
    ];

    WaterConfig {
        size: 50.0,
        resolution: 250,
        transform: TrsTransform::default(),
        model: WaveModel::Gerstner(GerstnerWaveParams {
            water: WaterParams {
                water_color: Some(vec3(0.0, 0.3, 0.5)),
                deep_water_color: Some(vec3(0.0, 0.1, 0.3)),
                shallow_water_color: Some(vec3(0.2, 0.6, 0.8)),
                transparency: Some(0.7),
                reflectance: Some(0.5),
                refractive_index: Some(1.33),
                ..Default::default()
            },
            waves,
            wave_count: Some(8),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(material: &Material, name: &str) -> f32 {
        match material.uniforms.get(name) {
            Some(UniformValue::Float(v)) => *v,
            other => panic!("uniform {} is {:?}", name, other),
        }
    }

    #[test]
    fn unset_fields_fall_back_individually() {
        let material = sine_wave_material(&SineWaveParams {
            water: WaterParams {
                transparency: Some(0.95),
                ..Default::default()
            },
            amplitude: Some(0.5),
            ..Default::default()
        });

        assert_eq!(float(&material, "transparency"), 0.95);
        assert_eq!(float(&material, "amplitude"), 0.5);
        // Untouched fields keep their defaults.
        assert_eq!(float(&material, "reflectance"), 0.3);
        assert_eq!(float(&material, "specular_power"), 32.0);
        assert_eq!(
            float(&material, "angular_freq"),
            std::f32::consts::TAU
        );
        match material.uniforms.get("water_color") {
            Some(UniformValue::Vec3(c)) => assert_eq!(*c, vec3(0.1, 0.3, 0.5)),
            other => panic!("water_color is {:?}", other),
        }
    }

    #[test]
    fn base_uniforms_precede_wave_uniforms() {
        let material = sine_wave_material(&SineWaveParams::default());
        let names: Vec<&str> = material.uniforms.iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "water_color",
                "deep_water_color",
                "shallow_water_color",
                "transparency",
                "reflectance",
                "refractive_index",
                "time",
                "specular_power",
                "fresnel_power",
                "amplitude",
                "wave_vector",
                "angular_freq",
            ]
        );
    }

    #[test]
    fn gerstner_truncates_to_eight_layers() {
        let params = GerstnerWaveParams {
            waves: vec![GerstnerWave::default(); 11],
            wave_count: None,
            ..Default::default()
        };
        let material = gerstner_wave_material(&params);

        match material.uniforms.get("wave_count") {
            Some(UniformValue::Int(n)) => assert_eq!(*n, 8),
            other => panic!("wave_count is {:?}", other),
        }
        assert!(material.uniforms.contains("waves[7].phase"));
        assert!(!material.uniforms.contains("waves[8].direction"));
    }

    #[test]
    fn gerstner_block_always_spans_the_full_wave_array() {
        use crate::shader::ShaderLayout;

        // One active layer; the shader still declares array<GerstnerWave, 8>.
        let material = gerstner_wave_material(&GerstnerWaveParams::default());
        let layout = ShaderLayout::resolve(&material.source, &material.flatten_uniforms(), &[]);
        assert_eq!(layout.block_size, 544);

        // Layers past the active count are declared and zero-filled.
        match material.uniforms.get("waves[7].wavelength") {
            Some(UniformValue::Float(v)) => assert_eq!(*v, 0.0),
            other => panic!("wavelength is {:?}", other),
        }
        match material.uniforms.get("wave_count") {
            Some(UniformValue::Int(n)) => assert_eq!(*n, 1),
            other => panic!("wave_count is {:?}", other),
        }
    }

    #[test]
    fn gerstner_empty_list_gets_one_default_layer() {
        let material = gerstner_wave_material(&GerstnerWaveParams::default());
        match material.uniforms.get("wave_count") {
            Some(UniformValue::Int(n)) => assert_eq!(*n, 1),
            other => panic!("wave_count is {:?}", other),
        }
        match material.uniforms.get("waves[0].wavelength") {
            Some(UniformValue::Float(v)) => assert_eq!(*v, 10.0),
            other => panic!("wavelength is {:?}", other),
        }
    }

    #[test]
    fn ocean_preset_fills_all_eight_layers() {
        let config = gerstner_ocean();
        let material = config.material();
        match material.uniforms.get("wave_count") {
            Some(UniformValue::Int(n)) => assert_eq!(*n, 8),
            other => panic!("wave_count is {:?}", other),
        }
        match material.uniforms.get("waves[5].steepness") {
            Some(UniformValue::Float(v)) => assert_eq!(*v, 0.5),
            other => panic!("steepness is {:?}", other),
        }
        assert!(material.target.is_none());
    }
}
