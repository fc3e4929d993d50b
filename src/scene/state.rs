use bitflags::bitflags;
use glam::{Mat4, Vec2, Vec3};

bitflags! {
    /// Held movement directions for the fly manipulator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MoveFlags: u8 {
        const FORWARD = 1 << 0;
        const BACKWARD = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const UP = 1 << 4;
        const DOWN = 1 << 5;
    }
}

impl MoveFlags {
    /// `1.0` when `positive` is held, `-1.0` for `negative`, `0.0` for neither or both.
    pub fn axis(self, positive: MoveFlags, negative: MoveFlags) -> f32 {
        let p = if self.contains(positive) { 1.0 } else { 0.0 };
        let n = if self.contains(negative) { 1.0 } else { 0.0 };
        p - n
    }
}

/// Input and configuration shared by every manipulator.
///
/// `yaw_intensity`, `pitch_intensity`, `zoom_intensity` and `pan` are one-shot:
/// the manipulator that consumes them resets them to zero.
#[derive(Debug, Clone)]
pub struct CameraState {
    pub yaw_intensity: f32,
    pub pitch_intensity: f32,
    pub zoom_intensity: f32,
    /// Pan delta as a fraction of the screen size.
    pub pan: Vec2,

    pub pivot: Vec3,
    pub world_up: Vec3,
    /// Per-axis fly speed in world units per second (x: strafe, y: lift, z: forward).
    pub velocity: Vec3,
    pub movement: MoveFlags,
    /// Degrees per second per unit of intensity.
    pub angular_velocity: f32,
    pub min_focus_distance: f32,
    pub screen: Vec2,
    /// World point grabbed by the last `begin_pan`; the pivot is used when unset.
    pub picked_point: Option<Vec3>,
    pub projection: Mat4,
    /// Zoom focus in normalized device coordinates.
    pub zoom_anchor: Vec2,
    pub orthographic: bool,
    pub lock_yaw: bool,
    pub lock_pitch: bool,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            yaw_intensity: 0.0,
            pitch_intensity: 0.0,
            zoom_intensity: 0.0,
            pan: Vec2::ZERO,
            pivot: Vec3::ZERO,
            world_up: Vec3::Y,
            velocity: Vec3::ONE,
            movement: MoveFlags::empty(),
            angular_velocity: 30.0,
            min_focus_distance: 1.0,
            screen: Vec2::ZERO,
            picked_point: None,
            projection: Mat4::IDENTITY,
            zoom_anchor: Vec2::ZERO,
            orthographic: false,
            lock_yaw: false,
            lock_pitch: false,
        }
    }
}

impl CameraState {
    pub fn has_rotation(&self) -> bool {
        self.yaw_intensity != 0.0 || self.pitch_intensity != 0.0
    }

    pub fn has_pan(&self) -> bool {
        self.pan != Vec2::ZERO
    }

    /// Drops pending one-shot input without applying it.
    pub fn clear_input(&mut self) {
        self.yaw_intensity = 0.0;
        self.pitch_intensity = 0.0;
        self.zoom_intensity = 0.0;
        self.pan = Vec2::ZERO;
    }

    /// Sets the pivot unless it is not finite.
    pub fn set_pivot(&mut self, pivot: Vec3) -> bool {
        if !pivot.is_finite() {
            log::warn!("Ignoring non-finite camera pivot {:?}", pivot);
            return false;
        }
        self.pivot = pivot;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_cancels_opposing_flags() {
        let held = MoveFlags::FORWARD | MoveFlags::BACKWARD | MoveFlags::LEFT;
        assert_eq!(held.axis(MoveFlags::FORWARD, MoveFlags::BACKWARD), 0.0);
        assert_eq!(held.axis(MoveFlags::RIGHT, MoveFlags::LEFT), -1.0);
        assert_eq!(held.axis(MoveFlags::UP, MoveFlags::DOWN), 0.0);
    }

    #[test]
    fn non_finite_pivot_is_rejected() {
        let mut state = CameraState::default();
        assert!(!state.set_pivot(Vec3::new(f32::NAN, 0.0, 0.0)));
        assert_eq!(state.pivot, Vec3::ZERO);
        assert!(state.set_pivot(Vec3::X));
        assert_eq!(state.pivot, Vec3::X);
    }
}
