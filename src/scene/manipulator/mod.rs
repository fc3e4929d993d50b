// scene/manipulator/mod.rs

mod examine;
mod fly;
mod ortho;

pub use examine::Examine;
pub use fly::Fly;
pub use ortho::{OrthoBounds, OrthoExamine};

use super::state::CameraState;
use glam::{Mat4, Vec3};

/// Turns accumulated camera input into view and projection matrices.
///
/// Both update methods return `false` without touching anything when the
/// input they read is exactly neutral, and reset the one-shot fields they
/// consume.
pub trait Manipulator {
    fn update_view(&mut self, _dt: f32, _state: &mut CameraState) -> bool {
        false
    }

    fn update_projection(&mut self, _dt: f32, _state: &mut CameraState) -> bool {
        false
    }

    fn view_matrix(&self) -> Mat4;
    fn set_view_matrix(&mut self, view: Mat4);
    fn projection_matrix(&self) -> Mat4;
    fn set_projection_matrix(&mut self, projection: Mat4);
}

/// Angle between `world_up` and the view direction of `view`, in radians.
pub(crate) fn pitch_angle(view: &Mat4, world_up: Vec3) -> f32 {
    let front = (-view.inverse().z_axis.truncate()).normalize_or_zero();
    world_up
        .normalize_or_zero()
        .dot(front)
        .clamp(-1.0, 1.0)
        .acos()
}

/// World up expressed in camera space.
pub(crate) fn camera_up(view: &Mat4, world_up: Vec3) -> Vec3 {
    view.transform_vector3(world_up).normalize_or_zero()
}

/// Eye position of a view matrix.
pub(crate) fn eye_position(view: &Mat4) -> Vec3 {
    let inv = view.inverse();
    let w = inv.w_axis.w;
    if w != 0.0 {
        inv.w_axis.truncate() / w
    } else {
        inv.w_axis.truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_angle_of_level_camera_is_right_angle() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let angle = pitch_angle(&view, Vec3::Y);
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn eye_position_recovers_look_at_eye() {
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        assert!(eye_position(&view).abs_diff_eq(eye, 1e-5));
    }
}
