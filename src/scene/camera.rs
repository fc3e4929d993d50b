// scene/camera.rs
use super::manipulator::{Examine, Fly, Manipulator, OrthoExamine};
use super::state::{CameraState, MoveFlags};
use crate::settings::CameraSettings;
use glam::{Mat4, Vec2, Vec3};

/// Pixels per wheel line.
const LINE_HEIGHT: f32 = 33.0;
/// Pixels per wheel page, sign taken from the event.
const PAGE_STEP: f32 = 10.0;
const FLY_SCROLL_FACTOR: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManipulatorKind {
    Examine,
    Fly,
    Ortho,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Wheel input in the unit the host received it in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelDelta {
    Pixels(f32),
    Lines(f32),
    Pages(f32),
}

impl WheelDelta {
    pub fn to_pixels(self) -> f32 {
        match self {
            WheelDelta::Pixels(d) => d,
            WheelDelta::Lines(d) => d * LINE_HEIGHT,
            WheelDelta::Pages(d) if d > 0.0 => PAGE_STEP,
            WheelDelta::Pages(d) if d < 0.0 => -PAGE_STEP,
            WheelDelta::Pages(_) => 0.0,
        }
    }
}

/// Matrices that changed (or were forced) this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameUpdate {
    pub view: Option<Mat4>,
    pub projection: Option<Mat4>,
}

impl FrameUpdate {
    pub fn is_empty(&self) -> bool {
        self.view.is_none() && self.projection.is_none()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Pointer {
    position: Vec2,
    pressed: Option<PointerButton>,
}

#[derive(Debug, Default, Clone)]
struct Manipulators {
    examine: Examine,
    fly: Fly,
    ortho: OrthoExamine,
}

impl Manipulators {
    fn get(&self, kind: ManipulatorKind) -> &dyn Manipulator {
        match kind {
            ManipulatorKind::Examine => &self.examine,
            ManipulatorKind::Fly => &self.fly,
            ManipulatorKind::Ortho => &self.ortho,
        }
    }

    fn get_mut(&mut self, kind: ManipulatorKind) -> &mut dyn Manipulator {
        match kind {
            ManipulatorKind::Examine => &mut self.examine,
            ManipulatorKind::Fly => &mut self.fly,
            ManipulatorKind::Ortho => &mut self.ortho,
        }
    }
}

/// Host-supplied picking: screen position in pixels to a world point.
pub type PickFn = Box<dyn FnMut(Vec2) -> Option<Vec3>>;

/// Owns the camera input state and the three manipulators, exactly one of
/// which is active.
pub struct Camera {
    manipulators: Manipulators,
    kind: ManipulatorKind,
    state: CameraState,
    pointer: Pointer,
    settings: CameraSettings,
    aspect: f32,
    velocity: f32,
    pan_is_primary: bool,
    force_draw: bool,
    idle_update: bool,
    picker: Option<PickFn>,
}

impl Camera {
    pub fn new(settings: &CameraSettings) -> Self {
        let mut manipulators = Manipulators::default();
        manipulators.ortho.set_depth_range(settings.near, settings.far);
        manipulators.ortho.set_padding(settings.ortho_padding);

        let state = CameraState {
            angular_velocity: settings.angular_velocity,
            min_focus_distance: settings.min_focus_distance,
            velocity: Vec3::splat(settings.velocity),
            ..CameraState::default()
        };

        let mut camera = Self {
            manipulators,
            kind: ManipulatorKind::Examine,
            state,
            pointer: Pointer::default(),
            settings: settings.clone(),
            aspect: 1.0,
            velocity: settings.velocity,
            pan_is_primary: false,
            force_draw: false,
            idle_update: false,
            picker: None,
        };
        camera.set_camera(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, Vec3::Y);
        let projection = camera.perspective();
        camera.set_projection_matrix(projection, true);
        camera
    }

    pub fn kind(&self) -> ManipulatorKind {
        self.kind
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CameraState {
        &mut self.state
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.active().view_matrix()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.active().projection_matrix()
    }

    pub fn set_view_matrix(&mut self, view: Mat4, force_draw: bool) {
        self.force_draw = force_draw;
        self.active_mut().set_view_matrix(view);
    }

    pub fn set_projection_matrix(&mut self, projection: Mat4, force_draw: bool) {
        self.force_draw = force_draw;
        self.state.orthographic = is_orthographic(&projection);
        self.state.projection = projection;
        self.active_mut().set_projection_matrix(projection);
    }

    pub fn set_examine_mode(&mut self) {
        self.switch_to(ManipulatorKind::Examine);
    }

    /// Switches to fly mode and levels the handed-over view against world up.
    pub fn set_fly_mode(&mut self) {
        self.switch_to(ManipulatorKind::Fly);
        let world_up = self.state.world_up;
        self.manipulators.fly.apply_restrictions(world_up);
    }

    /// Switches to 2D pan/zoom. A perspective projection is replaced by the
    /// orthographic one covering the same extent at the pivot distance.
    pub fn set_ortho_mode(&mut self) {
        self.switch_to(ManipulatorKind::Ortho);
        self.pan_is_primary = true;
    }

    fn switch_to(&mut self, kind: ManipulatorKind) {
        if kind == self.kind {
            return;
        }
        let view = self.view_matrix();
        let projection = match (self.kind, kind) {
            (_, ManipulatorKind::Ortho) => self.orthographic_from_current(),
            (ManipulatorKind::Ortho, _) => self.perspective(),
            _ => self.projection_matrix(),
        };

        log::debug!("Camera mode {:?} -> {:?}", self.kind, kind);
        self.kind = kind;
        self.state.clear_input();
        self.state.orthographic = is_orthographic(&projection);
        self.state.projection = projection;
        let active = self.active_mut();
        active.set_view_matrix(view);
        active.set_projection_matrix(projection);
        self.force_draw = true;
    }

    pub fn rotate(&mut self, yaw_intensity: f32, pitch_intensity: f32) {
        self.state.yaw_intensity = yaw_intensity;
        self.state.pitch_intensity = pitch_intensity;
    }

    pub fn zoom(&mut self, intensity: f32) {
        self.state.zoom_intensity = intensity;
    }

    /// Anchors a pan at the world point the picker finds under `position`.
    pub fn begin_pan(&mut self, position: Vec2) {
        self.state.picked_point = self.picker.as_mut().and_then(|pick| pick(position));
        self.state.projection = self.projection_matrix();
    }

    pub fn set_pick_callback(&mut self, picker: impl FnMut(Vec2) -> Option<Vec3> + 'static) {
        self.picker = Some(Box::new(picker));
    }

    pub fn set_pan_as_primary(&mut self, primary: bool) {
        self.pan_is_primary = primary;
    }

    pub fn set_idle_update(&mut self, idle_update: bool) {
        self.idle_update = idle_update;
    }

    pub fn set_pivot(&mut self, pivot: Vec3) {
        self.state.set_pivot(pivot);
    }

    /// Points the camera from `eye` at `center`, which becomes the pivot.
    pub fn set_camera(&mut self, eye: Vec3, center: Vec3, up: Vec3) -> Mat4 {
        let view = Mat4::look_at_rh(eye, center, up);
        self.active_mut().set_view_matrix(view);
        self.state.set_pivot(center);
        self.state.world_up = up;
        self.force_draw = true;
        view
    }

    pub fn set_velocity(&mut self, velocity: f32) {
        self.velocity = velocity;
        self.state.velocity = Vec3::splat(velocity);
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn move_forward(&mut self, direction: f32) {
        self.set_axis(direction, MoveFlags::FORWARD, MoveFlags::BACKWARD);
    }

    pub fn move_up(&mut self, direction: f32) {
        self.set_axis(direction, MoveFlags::UP, MoveFlags::DOWN);
    }

    pub fn move_right(&mut self, direction: f32) {
        self.set_axis(direction, MoveFlags::RIGHT, MoveFlags::LEFT);
    }

    fn set_axis(&mut self, direction: f32, positive: MoveFlags, negative: MoveFlags) {
        let movement = &mut self.state.movement;
        movement.set(positive, direction > 0.0);
        movement.set(negative, direction < 0.0);
    }

    pub fn reset_movement(&mut self) {
        self.state.movement = MoveFlags::empty();
    }

    pub fn pointer_down(&mut self, position: Vec2, button: PointerButton) {
        self.pointer.position = position;
        self.pointer.pressed = Some(button);
        if self.pans_with(button) {
            self.begin_pan(position);
        }
    }

    /// Converts a pointer drag into pan or rotation input.
    pub fn pointer_move(&mut self, position: Vec2) {
        let last = self.pointer.position;
        self.pointer.position = position;
        let Some(button) = self.pointer.pressed else {
            return;
        };

        if self.pans_with(button) {
            let screen = self.state.screen;
            if screen.x <= 0.0 || screen.y <= 0.0 {
                return;
            }
            let start = last / screen;
            let end = position / screen;
            self.state.pan += Vec2::new(start.x - end.x, end.y - start.y);
        } else if button == PointerButton::Primary {
            let delta = position - last;
            self.state.yaw_intensity += delta.x;
            self.state.pitch_intensity += delta.y;
        }
    }

    pub fn pointer_up(&mut self) {
        self.pointer.pressed = None;
    }

    fn pans_with(&self, button: PointerButton) -> bool {
        self.pan_is_primary || button == PointerButton::Secondary
    }

    /// Wheel zooms in examine and ortho modes and changes speed in fly mode.
    pub fn scroll(&mut self, delta: WheelDelta) {
        let delta = delta.to_pixels();
        if self.kind == ManipulatorKind::Fly {
            let step = delta * self.settings.velocity_scale * FLY_SCROLL_FACTOR;
            self.velocity = (self.velocity + step).max(step.abs());
            self.state.velocity = Vec3::splat(self.velocity);
            return;
        }

        self.state.zoom_intensity += delta * self.settings.zoom_scroll_factor;
        let screen = self.state.screen;
        if screen.x > 0.0 && screen.y > 0.0 {
            let p = self.pointer.position / screen;
            self.state.zoom_anchor = Vec2::new(p.x * 2.0 - 1.0, 1.0 - p.y * 2.0);
        }
    }

    /// Records the new screen size and rebuilds the perspective projection
    /// outside ortho mode.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return;
        }
        self.state.screen = Vec2::new(width as f32, height as f32);
        self.aspect = width as f32 / height as f32;
        if self.kind != ManipulatorKind::Ortho {
            let projection = self.perspective();
            self.set_projection_matrix(projection, true);
        }
        self.force_draw = true;
    }

    /// Runs the active manipulator for one frame.
    pub fn frame(&mut self, dt: f32) -> FrameUpdate {
        let forced = self.idle_update || self.force_draw;
        let manipulator = self.manipulators.get_mut(self.kind);
        self.state.projection = manipulator.projection_matrix();

        let view_changed = manipulator.update_view(dt, &mut self.state);
        let view = (view_changed || forced).then(|| manipulator.view_matrix());
        let projection_changed = manipulator.update_projection(dt, &mut self.state);
        let projection = (projection_changed || forced).then(|| manipulator.projection_matrix());

        self.force_draw = false;
        FrameUpdate { view, projection }
    }

    fn active(&self) -> &dyn Manipulator {
        self.manipulators.get(self.kind)
    }

    fn active_mut(&mut self) -> &mut dyn Manipulator {
        self.manipulators.get_mut(self.kind)
    }

    fn perspective(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.settings.fov_y_degrees.to_radians(),
            self.aspect,
            self.settings.near,
            self.settings.far,
        )
    }

    fn orthographic_from_current(&self) -> Mat4 {
        let current = self.projection_matrix();
        if is_orthographic(&current) {
            return current;
        }
        let distance = self
            .view_matrix()
            .transform_point3(self.state.pivot)
            .z
            .abs()
            .max(self.settings.near);
        let half_height = distance * (self.settings.fov_y_degrees.to_radians() * 0.5).tan();
        let half_width = half_height * self.aspect;
        Mat4::orthographic_rh(
            -half_width,
            half_width,
            -half_height,
            half_height,
            self.settings.near,
            self.settings.far,
        )
    }
}

fn is_orthographic(projection: &Mat4) -> bool {
    projection.z_axis.w == 0.0 && projection.w_axis.w == 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        let mut camera = Camera::new(&CameraSettings::default());
        camera.resize(800, 600);
        camera
    }

    #[test]
    fn starts_in_examine_looking_at_origin() {
        let camera = camera();
        assert_eq!(camera.kind(), ManipulatorKind::Examine);
        let expected = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, Vec3::Y);
        assert!(camera.view_matrix().abs_diff_eq(expected, 1e-6));
        assert!(!is_orthographic(&camera.projection_matrix()));
    }

    #[test]
    fn forced_frame_reports_both_matrices_once() {
        let mut camera = camera();
        let update = camera.frame(0.016);
        assert!(update.view.is_some() && update.projection.is_some());
        assert!(camera.frame(0.016).is_empty());
    }

    #[test]
    fn idle_update_reports_every_frame() {
        let mut camera = camera();
        camera.frame(0.016);
        camera.set_idle_update(true);
        assert!(camera.frame(0.016).view.is_some());
        assert!(camera.frame(0.016).view.is_some());
    }

    #[test]
    fn move_axis_sets_one_direction() {
        let mut camera = camera();
        camera.move_forward(1.0);
        assert_eq!(camera.state().movement, MoveFlags::FORWARD);
        camera.move_forward(-2.0);
        assert_eq!(camera.state().movement, MoveFlags::BACKWARD);
        camera.move_up(1.0);
        camera.move_forward(0.0);
        assert_eq!(camera.state().movement, MoveFlags::UP);
        camera.reset_movement();
        assert!(camera.state().movement.is_empty());
    }

    #[test]
    fn fly_scroll_changes_speed_not_zoom() {
        let mut camera = camera();
        camera.set_fly_mode();
        camera.scroll(WheelDelta::Pixels(20.0));
        assert!((camera.velocity() - 3.0).abs() < 1e-6);
        assert_eq!(camera.state().zoom_intensity, 0.0);
        // speed never drops below one step
        camera.scroll(WheelDelta::Pixels(-100.0));
        assert!((camera.velocity() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn secondary_drag_pans() {
        let mut camera = camera();
        camera.pointer_down(Vec2::new(400.0, 300.0), PointerButton::Secondary);
        camera.pointer_move(Vec2::new(480.0, 300.0));
        assert!((camera.state().pan.x + 0.1).abs() < 1e-6);
        camera.pointer_up();
        camera.pointer_move(Vec2::new(0.0, 0.0));
        assert!((camera.state().pan.x + 0.1).abs() < 1e-6);
    }

    #[test]
    fn begin_pan_uses_picker() {
        let mut camera = camera();
        camera.set_pick_callback(|p| Some(Vec3::new(p.x, p.y, 0.0)));
        camera.pointer_down(Vec2::new(3.0, 4.0), PointerButton::Secondary);
        assert_eq!(camera.state().picked_point, Some(Vec3::new(3.0, 4.0, 0.0)));
    }

    #[test]
    fn ortho_mode_gets_orthographic_projection() {
        let mut camera = camera();
        camera.set_ortho_mode();
        assert!(is_orthographic(&camera.projection_matrix()));
        assert!(camera.state().orthographic);
        camera.set_examine_mode();
        assert!(!is_orthographic(&camera.projection_matrix()));
    }
}
