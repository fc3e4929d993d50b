// scene/manipulator/examine.rs
use super::{camera_up, eye_position, pitch_angle, Manipulator};
use crate::scene::state::CameraState;
use glam::{Mat4, Vec2, Vec3};
use std::f32::consts::PI;

/// Distance below which the eye is treated as sitting on the pivot.
const PIVOT_EPSILON: f32 = 1e-6;

/// Orbit camera rotating and zooming around `CameraState::pivot`.
#[derive(Debug, Clone)]
pub struct Examine {
    view: Mat4,
    projection: Mat4,
}

impl Default for Examine {
    fn default() -> Self {
        Self::new()
    }
}

impl Examine {
    pub fn new() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        }
    }

    fn rotate(&self, view: Mat4, dt: f32, state: &CameraState) -> Mat4 {
        let mut view = view;
        let pivot = view.transform_point3(state.pivot);
        let to_pivot = Mat4::from_translation(pivot);
        let from_pivot = Mat4::from_translation(-pivot);

        if !state.lock_yaw && state.yaw_intensity != 0.0 {
            let yaw = (state.yaw_intensity * state.angular_velocity * dt).to_radians();
            let up = camera_up(&view, state.world_up);
            if up != Vec3::ZERO {
                view = to_pivot * Mat4::from_axis_angle(up, yaw) * from_pivot * view;
            }
        }

        if !state.lock_pitch && state.pitch_intensity != 0.0 {
            let delta = (state.pitch_intensity * state.angular_velocity * dt).to_radians();
            let target = pitch_angle(&view, state.world_up) + delta;
            if target > 0.0 && target < PI {
                view = to_pivot * Mat4::from_rotation_x(delta) * from_pivot * view;
            }
        }

        view
    }

    fn zoom(&self, view: Mat4, state: &CameraState) -> Mat4 {
        let zoom = state.zoom_intensity;
        if state.orthographic {
            let scale = 1.0 + zoom;
            if scale <= 0.0 {
                return view;
            }
            let pivot = view.transform_point3(state.pivot);
            let s = 1.0 / scale;
            return Mat4::from_translation(pivot)
                * Mat4::from_scale(Vec3::new(s, s, 1.0))
                * Mat4::from_translation(-pivot)
                * view;
        }

        let eye = eye_position(&view);
        let distance = eye.distance(state.pivot);
        if distance <= PIVOT_EPSILON {
            return view;
        }
        let toward = (state.pivot - eye) / distance;
        let step = distance * zoom;
        if distance + step > state.min_focus_distance {
            view * Mat4::from_translation(toward * step)
        } else {
            view
        }
    }

    /// Moves the world so the anchor follows the pointer; the pivot keeps its
    /// screen position.
    fn pan(&self, view: Mat4, state: &mut CameraState) -> Mat4 {
        let anchor = state.picked_point.unwrap_or(state.pivot);
        let world_to_clip = state.projection * view;
        let clip = world_to_clip * anchor.extend(1.0);
        if clip.w == 0.0 {
            return view;
        }
        let ndc = clip.truncate() / clip.w;
        // Pan is (start - end) in screen fractions; NDC spans 2 units.
        let moved = ndc.truncate() - state.pan * 2.0;
        let target = world_to_clip
            .inverse()
            .project_point3(Vec2::new(moved.x, moved.y).extend(ndc.z));
        let offset = target - anchor;
        if !offset.is_finite() {
            log::warn!("Skipping pan with degenerate projection");
            return view;
        }
        state.set_pivot(state.pivot - offset);
        view * Mat4::from_translation(offset)
    }
}

impl Manipulator for Examine {
    fn update_view(&mut self, dt: f32, state: &mut CameraState) -> bool {
        if !state.has_rotation() && state.zoom_intensity == 0.0 && !state.has_pan() {
            return false;
        }

        let mut view = self.view;
        if state.has_rotation() {
            view = self.rotate(view, dt, state);
            state.yaw_intensity = 0.0;
            state.pitch_intensity = 0.0;
        }
        if state.zoom_intensity != 0.0 {
            view = self.zoom(view, state);
            state.zoom_intensity = 0.0;
        }
        if state.has_pan() {
            view = self.pan(view, state);
            state.pan = Vec2::ZERO;
        }

        self.view = view;
        true
    }

    fn view_matrix(&self) -> Mat4 {
        self.view
    }

    fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orbit() -> (Examine, CameraState) {
        let mut examine = Examine::new();
        examine.set_view_matrix(Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y));
        let state = CameraState {
            projection: Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0),
            ..CameraState::default()
        };
        (examine, state)
    }

    #[test]
    fn yaw_keeps_distance_to_pivot() {
        let (mut examine, mut state) = orbit();
        state.yaw_intensity = 3.0;
        assert!(examine.update_view(1.0, &mut state));
        assert_eq!(state.yaw_intensity, 0.0);
        let eye = eye_position(&examine.view_matrix());
        assert!((eye.length() - 5.0).abs() < 1e-4);
        // 90 degrees of yaw moves the eye off the z axis
        assert!(eye.x.abs() > 4.9);
    }

    #[test]
    fn zoom_refuses_to_pass_min_focus_distance() {
        let (mut examine, mut state) = orbit();
        state.zoom_intensity = -0.5;
        examine.update_view(0.016, &mut state);
        let eye = eye_position(&examine.view_matrix());
        assert!((eye.z - 2.5).abs() < 1e-4);

        state.zoom_intensity = -0.9;
        examine.update_view(0.016, &mut state);
        let eye = eye_position(&examine.view_matrix());
        assert!((eye.z - 2.5).abs() < 1e-4);
    }

    #[test]
    fn pan_moves_pivot_with_view() {
        let (mut examine, mut state) = orbit();
        let before = examine.view_matrix().transform_point3(state.pivot);
        state.pan = Vec2::new(0.1, 0.0);
        assert!(examine.update_view(0.016, &mut state));
        assert!(state.pivot.x > 0.0);
        let after = examine.view_matrix().transform_point3(state.pivot);
        assert!(before.abs_diff_eq(after, 1e-4));
    }

    #[test]
    fn locked_yaw_still_drains_input() {
        let (mut examine, mut state) = orbit();
        let view = examine.view_matrix();
        state.lock_yaw = true;
        state.yaw_intensity = 10.0;
        assert!(examine.update_view(0.1, &mut state));
        assert_eq!(examine.view_matrix(), view);
        assert!(!examine.update_view(0.1, &mut state));
    }
}
