use crate::renderer::device::BufferId;
use crate::renderer::vertex::VertexLayout;

/// Uploaded mesh: device buffers plus the layout needed to bind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub vertex_count: u32,
    pub index_count: u32,
    pub layout: VertexLayout,
}
