//! Camera manipulator contracts: neutral input, input draining, clamping and
//! mode hand-off.
use glam::{Mat4, Vec2, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;
use wgpu_batch::scene::{
    Camera, CameraState, Examine, Fly, Manipulator, ManipulatorKind, MoveFlags, OrthoExamine,
    WheelDelta,
};
use wgpu_batch::settings::CameraSettings;

fn look_at_origin() -> Mat4 {
    Mat4::look_at_rh(Vec3::new(2.0, 1.0, 6.0), Vec3::ZERO, Vec3::Y)
}

fn state() -> CameraState {
    CameraState {
        projection: Mat4::perspective_rh(45f32.to_radians(), 1.5, 0.1, 100.0),
        screen: Vec2::new(1200.0, 800.0),
        ..CameraState::default()
    }
}

fn angle_to_up(view: Mat4) -> f32 {
    let front = (-view.inverse().z_axis.truncate()).normalize();
    Vec3::Y.dot(front).clamp(-1.0, 1.0).acos()
}

fn manipulators() -> Vec<Box<dyn Manipulator>> {
    let mut ortho = OrthoExamine::new();
    ortho.set_projection_matrix(Mat4::orthographic_rh(-3.0, 3.0, -2.0, 2.0, 0.1, 100.0));
    let mut all: Vec<Box<dyn Manipulator>> =
        vec![Box::new(Examine::new()), Box::new(Fly::new()), Box::new(ortho)];
    for m in all.iter_mut() {
        m.set_view_matrix(look_at_origin());
    }
    all
}

#[test]
fn neutral_input_changes_nothing() {
    for mut manipulator in manipulators() {
        let mut state = state();
        let view = manipulator.view_matrix();
        let projection = manipulator.projection_matrix();
        for _ in 0..2 {
            assert!(!manipulator.update_view(0.016, &mut state));
            assert!(!manipulator.update_projection(0.016, &mut state));
        }
        assert_eq!(manipulator.view_matrix().to_cols_array(), view.to_cols_array());
        assert_eq!(
            manipulator.projection_matrix().to_cols_array(),
            projection.to_cols_array()
        );
    }
}

#[test]
fn consumed_rotation_is_drained() {
    let mut examine = Examine::new();
    examine.set_view_matrix(look_at_origin());
    let mut state = state();
    state.yaw_intensity = 4.0;
    assert!(examine.update_view(0.016, &mut state));
    assert_eq!(state.yaw_intensity, 0.0);
    let after = examine.view_matrix();
    assert!(!examine.update_view(0.016, &mut state));
    assert_eq!(examine.view_matrix(), after);

    let mut fly = Fly::new();
    fly.set_view_matrix(look_at_origin());
    state.pitch_intensity = -2.0;
    assert!(fly.update_view(0.016, &mut state));
    assert!(!fly.update_view(0.016, &mut state));
}

#[test]
fn consumed_zoom_and_pan_are_drained() {
    let mut ortho = OrthoExamine::new();
    ortho.set_projection_matrix(Mat4::orthographic_rh(-3.0, 3.0, -2.0, 2.0, 0.1, 100.0));
    let mut state = state();
    state.zoom_intensity = -0.2;
    state.pan = Vec2::new(0.05, 0.0);
    assert!(ortho.update_projection(0.016, &mut state));
    assert_eq!(state.zoom_intensity, 0.0);
    assert_eq!(state.pan, Vec2::ZERO);
    assert!(!ortho.update_projection(0.016, &mut state));
}

#[test]
fn examine_pitch_never_reaches_the_poles() {
    let mut examine = Examine::new();
    examine.set_view_matrix(look_at_origin());
    let mut state = state();
    let mut rng = SmallRng::seed_from_u64(3);

    for i in 0..400 {
        let sign = if (i / 50) % 2 == 0 { 1.0 } else { -1.0 };
        state.pitch_intensity = sign * rng.gen_range(1.0..40.0);
        state.yaw_intensity = rng.gen_range(-5.0..5.0);
        examine.update_view(0.05, &mut state);

        let angle = angle_to_up(examine.view_matrix());
        assert!(angle > 0.0 && angle < PI, "angle {} escaped (0, pi)", angle);
        assert!(state.pivot.is_finite());
    }
}

#[test]
fn ortho_window_stays_inside_padded_full_bounds() {
    let padding = 0.1;
    let mut ortho = OrthoExamine::new();
    ortho.set_padding(padding);
    ortho.set_projection_matrix(Mat4::orthographic_rh(-3.0, 3.0, -2.0, 2.0, 0.1, 100.0));
    let full = ortho.full_bounds();
    let pad = full.extent() * padding;
    let mut state = state();
    let mut rng = SmallRng::seed_from_u64(11);
    let eps = 1e-4;

    for _ in 0..300 {
        state.zoom_intensity = rng.gen_range(-0.3..0.6);
        state.zoom_anchor = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        state.pan = Vec2::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5));
        ortho.update_projection(0.016, &mut state);

        let b = ortho.visible_bounds();
        assert!(b.left >= full.left + pad.x - eps);
        assert!(b.right <= full.right - pad.x + eps);
        assert!(b.bottom >= full.bottom + pad.y - eps);
        assert!(b.top <= full.top - pad.y + eps);
    }
}

#[test]
fn fly_translation_follows_velocity_per_axis() {
    let mut fly = Fly::new();
    fly.set_view_matrix(Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y));
    let mut state = CameraState {
        velocity: Vec3::new(1.0, 2.0, 4.0),
        movement: MoveFlags::FORWARD | MoveFlags::LEFT | MoveFlags::DOWN,
        ..state()
    };
    assert!(fly.update_view(0.5, &mut state));
    let eye = fly.view_matrix().inverse().w_axis.truncate();
    assert!(eye.abs_diff_eq(Vec3::new(-0.5, -1.0, -2.0), 1e-5));
}

#[test]
fn switching_modes_preserves_the_view() {
    let mut camera = Camera::new(&CameraSettings::default());
    camera.resize(1200, 800);
    let view = camera.set_camera(Vec3::new(3.0, 0.0, 4.0), Vec3::ZERO, Vec3::Y);

    camera.set_fly_mode();
    assert_eq!(camera.kind(), ManipulatorKind::Fly);
    assert!(camera.view_matrix().abs_diff_eq(view, 1e-5));

    camera.set_ortho_mode();
    assert!(camera.view_matrix().abs_diff_eq(view, 1e-5));

    camera.set_examine_mode();
    assert!(camera.view_matrix().abs_diff_eq(view, 1e-5));
    let update = camera.frame(0.016);
    assert!(update.view.is_some());
}

#[test]
fn scroll_zooms_examine_toward_pivot() {
    let mut camera = Camera::new(&CameraSettings::default());
    camera.resize(1200, 800);
    camera.frame(0.016);

    camera.scroll(WheelDelta::Pixels(-100.0));
    let update = camera.frame(0.016);
    let view = update.view.expect("zoom changes the view");
    assert!(update.projection.is_none());
    let eye = view.inverse().w_axis.truncate();
    assert!((eye.length() - 2.5).abs() < 1e-4);
}
