use super::device::AttribFormat;
use bytemuck::{Pod, Zeroable};

/// Interleaved mesh vertex: position, normal, texcoord.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const SIZE: u32 = std::mem::size_of::<Vertex>() as u32;
    pub const FLOATS: usize = 8;
}

#[inline]
pub fn v(pos: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Vertex {
    Vertex { pos, normal, uv }
}

/// Byte layout of the vertex attributes inside a geometry's vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub stride: u32,
    pub position: AttribFormat,
    pub normal: AttribFormat,
    pub texcoord: AttribFormat,
}

impl VertexLayout {
    pub const INTERLEAVED: VertexLayout = VertexLayout {
        stride: Vertex::SIZE,
        position: AttribFormat::f32(3, Vertex::SIZE, 0),
        normal: AttribFormat::f32(3, Vertex::SIZE, 12),
        texcoord: AttribFormat::f32(2, Vertex::SIZE, 24),
    };
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::INTERLEAVED
    }
}
