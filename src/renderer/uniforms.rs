// renderer/uniforms.rs
use super::device::{Uniform, UniformValue};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Per-batch matrices derived from the model transform and the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameMatrices {
    pub model: Mat4,
    pub model_view: Mat4,
    pub model_view_projection: Mat4,
    pub normal: Mat4,
}

impl FrameMatrices {
    pub fn compute(model: Mat4, view: Mat4, projection: Mat4) -> Self {
        let model_view = view * model;
        Self {
            model,
            model_view,
            model_view_projection: projection * model_view,
            normal: model_view.inverse().transpose(),
        }
    }
}

/// Uniform block layout used by the wgpu backend, one per draw.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, PartialEq, Debug)]
pub struct DrawUniforms {
    pub projection: [[f32; 4]; 4],
    pub model_view: [[f32; 4]; 4],
    pub model_view_projection: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// xyz = eye-space light position.
    pub light_position: [f32; 4],
    /// size.x, size.y, rotation, is_billboard
    pub billboard: [f32; 4],
    /// use_texture, unlit, screen width, screen height
    pub flags: [f32; 4],
}

impl DrawUniforms {
    pub fn new() -> Self {
        Self {
            projection: Mat4::IDENTITY.to_cols_array_2d(),
            model_view: Mat4::IDENTITY.to_cols_array_2d(),
            model_view_projection: Mat4::IDENTITY.to_cols_array_2d(),
            normal_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            color: [1.0; 4],
            light_position: [0.0; 4],
            billboard: [1.0, 1.0, 0.0, 0.0],
            flags: [0.0; 4],
        }
    }

    /// Stores one uniform value. Values of the wrong shape are ignored.
    pub fn apply(&mut self, uniform: Uniform, value: UniformValue) {
        match (uniform, value) {
            (Uniform::Projection, UniformValue::Mat4(m)) => {
                self.projection = m.to_cols_array_2d()
            }
            (Uniform::ModelView, UniformValue::Mat4(m)) => self.model_view = m.to_cols_array_2d(),
            (Uniform::ModelViewProjection, UniformValue::Mat4(m)) => {
                self.model_view_projection = m.to_cols_array_2d()
            }
            (Uniform::NormalMatrix, UniformValue::Mat4(m)) => {
                self.normal_matrix = m.to_cols_array_2d()
            }
            (Uniform::Color, UniformValue::Vec4(c)) => self.color = c.to_array(),
            (Uniform::LightPosition, UniformValue::Vec3(p)) => {
                self.light_position = p.extend(1.0).to_array()
            }
            (Uniform::BillboardSize, UniformValue::Vec2(s)) => {
                self.billboard[0] = s.x;
                self.billboard[1] = s.y;
            }
            (Uniform::BillboardRotation, UniformValue::F32(r)) => self.billboard[2] = r,
            (Uniform::IsBillboard, UniformValue::F32(v)) => self.billboard[3] = v,
            (Uniform::UseTexture, UniformValue::F32(v)) => self.flags[0] = v,
            (Uniform::Unlit, UniformValue::F32(v)) => self.flags[1] = v,
            (Uniform::Screen, UniformValue::Vec2(s)) => {
                self.flags[2] = s.x;
                self.flags[3] = s.y;
            }
            (uniform, value) => {
                log::warn!("Ignoring {:?} value for uniform {:?}", value, uniform);
            }
        }
    }
}

impl Default for DrawUniforms {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3, Vec4};

    #[test]
    fn draw_uniforms_is_320_bytes() {
        // 4 * mat4x4<f32> = 256 bytes, 4 * vec4<f32> = 64 bytes
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 320);
    }

    #[test]
    fn normal_matrix_is_inverse_transpose_of_model_view() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 0.5));
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let m = FrameMatrices::compute(model, view, Mat4::IDENTITY);
        let expected = (view * model).inverse().transpose();
        assert!(m.normal.abs_diff_eq(expected, 1e-5));
        assert!(m.model_view_projection.abs_diff_eq(m.model_view, 1e-6));
    }

    #[test]
    fn apply_routes_values() {
        let mut u = DrawUniforms::new();
        u.apply(Uniform::Color, UniformValue::Vec4(Vec4::new(1.0, 0.0, 0.0, 0.5)));
        u.apply(Uniform::Screen, UniformValue::Vec2(Vec2::new(800.0, 600.0)));
        u.apply(Uniform::UseTexture, true.into());
        // mismatched shape is dropped
        u.apply(Uniform::Unlit, UniformValue::Vec2(Vec2::ONE));
        assert_eq!(u.color, [1.0, 0.0, 0.0, 0.5]);
        assert_eq!(u.flags, [1.0, 0.0, 800.0, 600.0]);
    }
}
