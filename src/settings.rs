use crate::renderer::device::ClearFlags;
use crate::renderer::sequencer::SequencerSettings;
use glam::{Vec3, Vec4};
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "RenderSettings::default_clear_flag")]
    pub clear_color: bool,
    #[serde(default = "RenderSettings::default_clear_flag")]
    pub clear_depth: bool,
    #[serde(default = "RenderSettings::default_background_color")]
    pub background_color: [f32; 4],
    #[serde(default)]
    pub light_position: [f32; 3],
    /// Forces blending on or off for every batch when set.
    #[serde(default)]
    pub blend_override: Option<bool>,
    #[serde(default = "RenderSettings::default_wireframe_buffer_bytes")]
    pub wireframe_buffer_bytes: usize,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub camera: CameraSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            clear_color: Self::default_clear_flag(),
            clear_depth: Self::default_clear_flag(),
            background_color: Self::default_background_color(),
            light_position: [0.0; 3],
            blend_override: None,
            wireframe_buffer_bytes: Self::default_wireframe_buffer_bytes(),
            resolution: Resolution::default(),
            camera: CameraSettings::default(),
        }
    }
}

impl RenderSettings {
    pub fn load() -> Self {
        Self::load_from_path("settings.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RenderSettings>(&contents) {
                Ok(settings) => {
                    info!("Loaded render settings from {:?}", path);
                    settings.validate()
                }
                Err(err) => {
                    warn!(
                        "Failed to parse {:?} ({}). Falling back to default render settings.",
                        path, err
                    );
                    RenderSettings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Render settings file {:?} not found. Using default settings.",
                    path
                );
                RenderSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }
        }
    }

    pub(crate) fn validate(mut self) -> Self {
        if self.background_color.iter().any(|c| !c.is_finite()) {
            warn!("Background color must be finite. Using default color.");
            self.background_color = Self::default_background_color();
        }

        if self.light_position.iter().any(|c| !c.is_finite()) {
            warn!("Light position must be finite. Using the origin.");
            self.light_position = [0.0; 3];
        }

        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Resolution must be greater than zero. Using default resolution.");
            self.resolution = Resolution::default();
        }

        self.camera = self.camera.validate();
        self
    }

    pub fn clear_flags(&self) -> ClearFlags {
        let mut flags = ClearFlags::empty();
        flags.set(ClearFlags::COLOR, self.clear_color);
        flags.set(ClearFlags::DEPTH, self.clear_depth);
        flags
    }

    pub fn background_color(&self) -> Vec4 {
        Vec4::from_array(self.background_color)
    }

    pub fn sequencer_settings(&self) -> SequencerSettings {
        SequencerSettings {
            clear: self.clear_flags(),
            blend_override: self.blend_override,
            light_position: Vec3::from_array(self.light_position),
            ..SequencerSettings::default()
        }
    }

    const fn default_clear_flag() -> bool {
        true
    }

    const fn default_background_color() -> [f32; 4] {
        [0.0, 0.0, 0.0, 1.0]
    }

    const fn default_wireframe_buffer_bytes() -> usize {
        crate::asset::DEFAULT_WIREFRAME_BUFFER_BYTES
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    #[serde(default = "CameraSettings::default_fov_y_degrees")]
    pub fov_y_degrees: f32,
    #[serde(default = "CameraSettings::default_near")]
    pub near: f32,
    #[serde(default = "CameraSettings::default_far")]
    pub far: f32,
    /// Degrees per second per unit of rotate intensity.
    #[serde(default = "CameraSettings::default_angular_velocity")]
    pub angular_velocity: f32,
    #[serde(default = "CameraSettings::default_min_focus_distance")]
    pub min_focus_distance: f32,
    #[serde(default = "CameraSettings::default_velocity")]
    pub velocity: f32,
    /// Fly speed change per scrolled pixel, before the 0.1 damping.
    #[serde(default = "CameraSettings::default_velocity_scale")]
    pub velocity_scale: f32,
    #[serde(default = "CameraSettings::default_zoom_scroll_factor")]
    pub zoom_scroll_factor: f32,
    #[serde(default)]
    pub ortho_padding: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_y_degrees: Self::default_fov_y_degrees(),
            near: Self::default_near(),
            far: Self::default_far(),
            angular_velocity: Self::default_angular_velocity(),
            min_focus_distance: Self::default_min_focus_distance(),
            velocity: Self::default_velocity(),
            velocity_scale: Self::default_velocity_scale(),
            zoom_scroll_factor: Self::default_zoom_scroll_factor(),
            ortho_padding: 0.0,
        }
    }
}

impl CameraSettings {
    fn validate(mut self) -> Self {
        if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0) {
            warn!("Field of view must be between 0 and 180 degrees. Using default value.");
            self.fov_y_degrees = Self::default_fov_y_degrees();
        }

        if !(self.near > 0.0 && self.far > self.near) {
            warn!("Clip planes must satisfy 0 < near < far. Using default planes.");
            self.near = Self::default_near();
            self.far = Self::default_far();
        }

        if !(self.angular_velocity.is_finite() && self.angular_velocity > 0.0) {
            warn!("Angular velocity must be positive. Using default value.");
            self.angular_velocity = Self::default_angular_velocity();
        }

        if !(self.min_focus_distance.is_finite() && self.min_focus_distance >= 0.0) {
            warn!("Minimum focus distance must not be negative. Using default value.");
            self.min_focus_distance = Self::default_min_focus_distance();
        }

        if !(self.velocity.is_finite() && self.velocity > 0.0) {
            warn!("Fly velocity must be positive. Using default value.");
            self.velocity = Self::default_velocity();
        }

        if !self.velocity_scale.is_finite() {
            warn!("Velocity scale must be finite. Using default value.");
            self.velocity_scale = Self::default_velocity_scale();
        }

        if !self.zoom_scroll_factor.is_finite() {
            warn!("Zoom scroll factor must be finite. Using default value.");
            self.zoom_scroll_factor = Self::default_zoom_scroll_factor();
        }

        if !(0.0..0.5).contains(&self.ortho_padding) {
            warn!("Ortho padding must be in [0, 0.5). Using no padding.");
            self.ortho_padding = 0.0;
        }

        self
    }

    const fn default_fov_y_degrees() -> f32 {
        45.0
    }

    const fn default_near() -> f32 {
        0.1
    }

    const fn default_far() -> f32 {
        1e5
    }

    const fn default_angular_velocity() -> f32 {
        30.0
    }

    const fn default_min_focus_distance() -> f32 {
        1.0
    }

    const fn default_velocity() -> f32 {
        1.0
    }

    const fn default_velocity_scale() -> f32 {
        1.0
    }

    const fn default_zoom_scroll_factor() -> f32 {
        0.005
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_settings() -> RenderSettings {
        RenderSettings {
            background_color: [f32::NAN, 0.0, 0.0, 1.0],
            light_position: [0.0, f32::INFINITY, 0.0],
            resolution: Resolution {
                width: 0,
                height: 0,
            },
            camera: CameraSettings {
                fov_y_degrees: 0.0,
                near: 10.0,
                far: 1.0,
                angular_velocity: -1.0,
                min_focus_distance: -2.0,
                velocity: 0.0,
                velocity_scale: f32::NAN,
                zoom_scroll_factor: f32::INFINITY,
                ortho_padding: 0.7,
            },
            ..RenderSettings::default()
        }
    }

    #[test]
    fn validate_replaces_invalid_values_with_defaults() {
        let validated = invalid_settings().validate();
        let defaults = RenderSettings::default();

        assert_eq!(validated.background_color, defaults.background_color);
        assert_eq!(validated.light_position, [0.0; 3]);
        assert_eq!(validated.resolution.width, Resolution::default().width);
        assert_eq!(validated.resolution.height, Resolution::default().height);

        let camera = validated.camera;
        assert_eq!(camera.fov_y_degrees, defaults.camera.fov_y_degrees);
        assert_eq!(camera.near, defaults.camera.near);
        assert_eq!(camera.far, defaults.camera.far);
        assert_eq!(camera.angular_velocity, defaults.camera.angular_velocity);
        assert_eq!(camera.min_focus_distance, defaults.camera.min_focus_distance);
        assert_eq!(camera.velocity, defaults.camera.velocity);
        assert_eq!(camera.velocity_scale, defaults.camera.velocity_scale);
        assert_eq!(camera.zoom_scroll_factor, defaults.camera.zoom_scroll_factor);
        assert_eq!(camera.ortho_padding, 0.0);
    }

    #[test]
    fn validate_preserves_valid_values() {
        let valid = RenderSettings {
            clear_color: false,
            background_color: [0.2, 0.3, 0.4, 1.0],
            blend_override: Some(true),
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            camera: CameraSettings {
                fov_y_degrees: 60.0,
                ortho_padding: 0.1,
                ..CameraSettings::default()
            },
            ..RenderSettings::default()
        };

        let validated = valid.clone().validate();

        assert!(!validated.clear_color);
        assert_eq!(validated.background_color, valid.background_color);
        assert_eq!(validated.blend_override, Some(true));
        assert_eq!(validated.resolution.width, valid.resolution.width);
        assert_eq!(validated.camera.fov_y_degrees, 60.0);
        assert_eq!(validated.camera.ortho_padding, 0.1);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let settings: RenderSettings =
            serde_json::from_str(r#"{ "clear_depth": false, "camera": { "fov_y_degrees": 30.0 } }"#)
                .expect("settings parse");

        assert!(settings.clear_color);
        assert!(!settings.clear_depth);
        assert_eq!(settings.clear_flags(), ClearFlags::COLOR);
        assert_eq!(settings.camera.fov_y_degrees, 30.0);
        assert_eq!(settings.camera.near, CameraSettings::default().near);
        assert_eq!(
            settings.wireframe_buffer_bytes,
            crate::asset::DEFAULT_WIREFRAME_BUFFER_BYTES
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = RenderSettings::load_from_path("does/not/exist/settings.json");
        assert_eq!(settings.background_color, RenderSettings::default().background_color);
        assert_eq!(settings.blend_override, None);
    }

    #[test]
    fn sequencer_settings_carry_blend_override() {
        let settings = RenderSettings {
            blend_override: Some(false),
            light_position: [1.0, 2.0, 3.0],
            ..RenderSettings::default()
        };
        let sequencer = settings.sequencer_settings();
        assert_eq!(sequencer.blend_override, Some(false));
        assert_eq!(sequencer.light_position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(sequencer.clear, ClearFlags::COLOR | ClearFlags::DEPTH);
    }
}
