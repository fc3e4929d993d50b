// scene/manipulator/ortho.rs
use super::Manipulator;
use crate::scene::state::CameraState;
use glam::{Mat4, Vec2, Vec3};

const MAX_PADDING: f32 = 0.49;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoBounds {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl OrthoBounds {
    pub const UNIT: Self = Self {
        left: -1.0,
        right: 1.0,
        bottom: -1.0,
        top: 1.0,
    };

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    pub fn extent(&self) -> Vec2 {
        Vec2::new(self.width(), self.height())
    }

    fn scaled(self, scale: f32) -> Self {
        Self {
            left: self.left * scale,
            right: self.right * scale,
            bottom: self.bottom * scale,
            top: self.top * scale,
        }
    }

    fn offset(self, origin: Vec2) -> Self {
        Self {
            left: self.left + origin.x,
            right: self.right + origin.x,
            bottom: self.bottom + origin.y,
            top: self.top + origin.y,
        }
    }

    fn is_finite(&self) -> bool {
        self.left.is_finite() && self.right.is_finite() && self.bottom.is_finite() && self.top.is_finite()
    }
}

/// 2D pan and zoom over an orthographic projection.
///
/// The full bounds are captured from the projection handed to
/// `set_projection_matrix`; zoom and pan only ever move a window inside them.
#[derive(Debug, Clone)]
pub struct OrthoExamine {
    view: Mat4,
    projection: Mat4,
    full: OrthoBounds,
    bounds: OrthoBounds,
    origin: Vec2,
    /// Margin kept free on each side, as a fraction of the full extent.
    padding: f32,
    near: f32,
    far: f32,
}

impl Default for OrthoExamine {
    fn default() -> Self {
        Self::new()
    }
}

impl OrthoExamine {
    pub fn new() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            full: OrthoBounds::UNIT,
            bounds: OrthoBounds::UNIT,
            origin: Vec2::ZERO,
            padding: 0.0,
            near: 0.1,
            far: 1e5,
        }
    }

    pub fn set_depth_range(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    pub fn set_padding(&mut self, padding: f32) {
        self.padding = padding.clamp(0.0, MAX_PADDING);
    }

    pub fn full_bounds(&self) -> OrthoBounds {
        self.full
    }

    /// The visible window, origin offset included.
    pub fn visible_bounds(&self) -> OrthoBounds {
        self.bounds.offset(self.origin)
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    fn zoom(&mut self, zoom: f32, anchor: Vec2) {
        let scale = 1.0 + zoom;
        if scale <= 0.0 {
            return;
        }
        let t = (anchor + Vec2::ONE) * 0.5;
        let focus = Vec2::new(
            self.bounds.left + t.x * self.bounds.width(),
            self.bounds.bottom + t.y * self.bounds.height(),
        );
        self.bounds = self.bounds.scaled(scale);
        // Keep the world point under the anchor fixed.
        self.origin += focus * (1.0 - scale);
    }

    fn clamp(&mut self) {
        let pad = self.full.extent() * self.padding;
        let (left, right, origin_x) = clamp_axis(
            (self.bounds.left, self.bounds.right),
            self.origin.x,
            (self.full.left + pad.x, self.full.right - pad.x),
        );
        let (bottom, top, origin_y) = clamp_axis(
            (self.bounds.bottom, self.bounds.top),
            self.origin.y,
            (self.full.bottom + pad.y, self.full.top - pad.y),
        );
        self.bounds = OrthoBounds {
            left,
            right,
            bottom,
            top,
        };
        self.origin = Vec2::new(origin_x, origin_y);
    }

    fn rebuild(&mut self) {
        let b = self.visible_bounds();
        self.projection = Mat4::orthographic_rh(b.left, b.right, b.bottom, b.top, self.near, self.far);
    }
}

/// Shifts `origin` so `[lo, hi] + origin` lies inside `[min, max]`; a window
/// wider than the limit is clamped to it and the origin reset.
fn clamp_axis((lo, hi): (f32, f32), origin: f32, (min, max): (f32, f32)) -> (f32, f32, f32) {
    if hi - lo >= max - min {
        return (min, max, 0.0);
    }
    if lo + origin < min {
        (lo, hi, min - lo)
    } else if hi + origin > max {
        (lo, hi, max - hi)
    } else {
        (lo, hi, origin)
    }
}

impl Manipulator for OrthoExamine {
    fn update_projection(&mut self, _dt: f32, state: &mut CameraState) -> bool {
        if state.zoom_intensity == 0.0 && !state.has_pan() {
            return false;
        }

        if state.zoom_intensity != 0.0 {
            self.zoom(state.zoom_intensity, state.zoom_anchor);
            state.zoom_intensity = 0.0;
        }
        if state.has_pan() {
            self.origin += state.pan * self.bounds.extent();
            state.pan = Vec2::ZERO;
        }

        self.clamp();
        self.rebuild();
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

    /// Captures the full bounds from the corners of `projection` and resets
    /// zoom and pan.
    fn set_projection_matrix(&mut self, projection: Mat4) {
        let inverse = projection.inverse();
        let min = inverse.project_point3(Vec3::new(-1.0, -1.0, 0.0));
        let max = inverse.project_point3(Vec3::new(1.0, 1.0, 0.0));
        let full = OrthoBounds {
            left: min.x,
            right: max.x,
            bottom: min.y,
            top: max.y,
        };

        self.projection = projection;
        self.origin = Vec2::ZERO;
        if full.is_finite() && full.width() > 0.0 && full.height() > 0.0 {
            self.full = full;
        } else {
            log::warn!("Projection has degenerate bounds; using unit bounds");
            self.full = OrthoBounds::UNIT;
        }
        self.bounds = self.full;
    }
}
