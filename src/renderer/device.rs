// renderer/device.rs
use bitflags::bitflags;
use glam::{Mat4, Vec2, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Device-side handle of a linked program. Compilation and linking happen on
/// the host; the renderer only binds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub instancing: bool,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self { instancing: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    F32,
    /// Unsigned bytes normalized to `[0, 1]` when read by the shader.
    U8Norm,
}

impl ScalarType {
    pub const fn size(self) -> u32 {
        match self {
            ScalarType::F32 => 4,
            ScalarType::U8Norm => 1,
        }
    }
}

/// How one vertex attribute reads from the currently bound vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttribFormat {
    pub components: u32,
    pub ty: ScalarType,
    pub stride: u32,
    pub offset: u32,
}

impl AttribFormat {
    pub const fn f32(components: u32, stride: u32, offset: u32) -> Self {
        Self {
            components,
            ty: ScalarType::F32,
            stride,
            offset,
        }
    }

    pub const fn unorm8(components: u32, stride: u32, offset: u32) -> Self {
        Self {
            components,
            ty: ScalarType::U8Norm,
            stride,
            offset,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullFace {
    Back,
    Front,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub filter: TextureFilter,
}

/// Uniform semantics a program may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    Projection,
    ModelView,
    ModelViewProjection,
    NormalMatrix,
    LightPosition,
    Color,
    UseTexture,
    Unlit,
    IsBillboard,
    BillboardSize,
    BillboardRotation,
    Screen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec4(Vec4),
    Vec3(Vec3),
    Vec2(Vec2),
    F32(f32),
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        UniformValue::F32(if value { 1.0 } else { 0.0 })
    }
}

/// The GPU command surface the batch renderer drives.
///
/// Methods follow bind-then-use semantics: `vertex_attrib_pointer` reads from
/// the buffer most recently passed to `bind_vertex_buffer`, and draw calls
/// consume whatever program, buffers, texture and state are bound at the time.
pub trait GraphicsDevice {
    fn capabilities(&self) -> DeviceCapabilities;

    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> BufferId;
    /// `offset + data.len()` must stay within the buffer's size.
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]);
    /// Copies `size` bytes inside one buffer. Regions must not overlap.
    fn copy_buffer_region(&mut self, buffer: BufferId, src_offset: u64, dst_offset: u64, size: u64);
    fn delete_buffer(&mut self, buffer: BufferId);

    /// `rgba` holds `width * height * 4` bytes.
    fn create_texture(&mut self, desc: &TextureDesc, rgba: &[u8]) -> TextureId;
    fn delete_texture(&mut self, texture: TextureId);

    fn set_clear_color(&mut self, color: Vec4);
    fn clear(&mut self, flags: ClearFlags);

    fn use_program(&mut self, program: Option<ProgramHandle>);
    fn set_attrib_enabled(&mut self, slot: u32, enabled: bool);
    fn set_attrib_divisor(&mut self, slot: u32, divisor: u32);
    fn bind_vertex_buffer(&mut self, buffer: BufferId);
    fn vertex_attrib_pointer(&mut self, slot: u32, format: AttribFormat);
    fn bind_index_buffer(&mut self, buffer: BufferId);
    fn bind_texture(&mut self, texture: Option<TextureId>);
    fn set_uniform(&mut self, uniform: Uniform, value: UniformValue);

    fn set_blend(&mut self, enabled: bool);
    fn set_depth_write(&mut self, enabled: bool);
    fn set_cull_face(&mut self, face: Option<CullFace>);

    /// Indices are 16-bit.
    fn draw_indexed(&mut self, index_count: u32);
    fn draw_indexed_instanced(&mut self, index_count: u32, instance_count: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_uniforms_become_unit_floats() {
        assert_eq!(UniformValue::from(true), UniformValue::F32(1.0));
        assert_eq!(UniformValue::from(false), UniformValue::F32(0.0));
    }

    #[test]
    fn scalar_sizes() {
        assert_eq!(ScalarType::F32.size(), 4);
        assert_eq!(ScalarType::U8Norm.size(), 1);
    }
}
