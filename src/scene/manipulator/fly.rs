// scene/manipulator/fly.rs
use super::{camera_up, eye_position, pitch_angle, Manipulator};
use crate::scene::state::{CameraState, MoveFlags};
use glam::{Mat4, Vec3};

const MIN_PITCH_DEGREES: f32 = 1.0;
const MAX_PITCH_DEGREES: f32 = 179.0;

/// First-person camera: rotates in place and translates along its own axes.
#[derive(Debug, Clone)]
pub struct Fly {
    view: Mat4,
    projection: Mat4,
    /// Camera-space forward axis.
    forward: Vec3,
}

impl Default for Fly {
    fn default() -> Self {
        Self::new()
    }
}

impl Fly {
    pub fn new() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            forward: Vec3::NEG_Z,
        }
    }

    pub fn set_forward_direction(&mut self, forward: Vec3) {
        if forward.length_squared() == 0.0 || !forward.is_finite() {
            log::warn!("Ignoring degenerate fly forward direction {:?}", forward);
            return;
        }
        self.forward = forward.normalize();
    }

    pub fn forward_direction(&self) -> Vec3 {
        self.forward
    }

    /// Rebuilds the view as a look-at along the current heading, dropping roll.
    pub fn apply_restrictions(&mut self, world_up: Vec3) {
        let eye = eye_position(&self.view);
        let front = -self.view.inverse().z_axis.truncate();
        if front.cross(world_up).length_squared() <= f32::EPSILON {
            log::debug!("Fly heading is parallel to world up; keeping view");
            return;
        }
        self.view = Mat4::look_at_rh(eye, eye + front, world_up);
    }

    fn rotate(&self, view: Mat4, up: Vec3, dt: f32, state: &CameraState) -> Mat4 {
        let mut view = view;
        if !state.lock_yaw && state.yaw_intensity != 0.0 && up != Vec3::ZERO {
            let yaw = (state.yaw_intensity * state.angular_velocity * dt).to_radians();
            view = Mat4::from_axis_angle(up, yaw) * view;
        }
        if !state.lock_pitch && state.pitch_intensity != 0.0 {
            let delta = (state.pitch_intensity * state.angular_velocity * dt).to_radians();
            let target = pitch_angle(&view, state.world_up) + delta;
            if target > MIN_PITCH_DEGREES.to_radians() && target < MAX_PITCH_DEGREES.to_radians() {
                view = Mat4::from_rotation_x(delta) * view;
            }
        }
        view
    }

    fn translation(&self, up: Vec3, dt: f32, state: &CameraState) -> Vec3 {
        let held = state.movement;
        let delta = Vec3::new(
            state.velocity.x * -held.axis(MoveFlags::RIGHT, MoveFlags::LEFT),
            state.velocity.y * -held.axis(MoveFlags::UP, MoveFlags::DOWN),
            state.velocity.z * -held.axis(MoveFlags::FORWARD, MoveFlags::BACKWARD),
        ) * dt;

        let right = self.forward.cross(up).normalize_or_zero();
        let up_cam = right.cross(self.forward).normalize_or_zero();
        self.forward * delta.z + up_cam * delta.y + right * delta.x
    }
}

impl Manipulator for Fly {
    fn update_view(&mut self, dt: f32, state: &mut CameraState) -> bool {
        if !state.has_rotation() && state.movement.is_empty() {
            return false;
        }

        let mut view = self.view;
        let up = camera_up(&view, state.world_up);
        if state.has_rotation() {
            view = self.rotate(view, up, dt, state);
            state.yaw_intensity = 0.0;
            state.pitch_intensity = 0.0;
        }

        let step = self.translation(up, dt, state);
        self.view = Mat4::from_translation(step) * view;
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
