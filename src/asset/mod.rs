pub mod cache;
pub mod geometry;
pub mod handle;

pub use cache::AssetCache;
pub use geometry::Geometry;
pub use handle::Handle;

use crate::renderer::device::{
    BufferId, BufferTarget, GraphicsDevice, TextureDesc, TextureFilter, TextureId,
};
use crate::renderer::vertex::{Vertex, VertexLayout};
use std::collections::HashMap;
use thiserror::Error;

pub const DEFAULT_WIREFRAME_BUFFER_BYTES: usize = 1 << 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Vertices can not be empty")]
    EmptyVertices,
    #[error("Elements can not be empty")]
    EmptyIndices,
    #[error("Vertex data of {len} floats is not a whole number of {stride}-float vertices")]
    MisalignedVertices { len: usize, stride: usize },
    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u16, vertex_count: u32 },
    #[error("Texture '{name}' expects {expected} bytes of RGBA data, got {actual}")]
    TextureSize {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Owns uploaded geometry, named textures, the fallback texture and the
/// shared barycentric buffer used by wireframe programs.
#[derive(Default)]
pub struct ResourceManager {
    geometries: AssetCache<Geometry>,
    textures: HashMap<String, TextureId>,
    dummy_texture: Option<TextureId>,
    wireframe_buffer: Option<BufferId>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads interleaved vertex floats (8 per vertex) and 16-bit indices.
    pub fn upload_mesh<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        vertices: &[f32],
        indices: &[u16],
    ) -> Result<Handle<Geometry>, ResourceError> {
        if vertices.is_empty() {
            return Err(ResourceError::EmptyVertices);
        }
        if vertices.len() % Vertex::FLOATS != 0 {
            return Err(ResourceError::MisalignedVertices {
                len: vertices.len(),
                stride: Vertex::FLOATS,
            });
        }
        if indices.is_empty() {
            return Err(ResourceError::EmptyIndices);
        }

        let vertex_count = (vertices.len() / Vertex::FLOATS) as u32;
        if let Some(&index) = indices.iter().find(|&&i| u32::from(i) >= vertex_count) {
            return Err(ResourceError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        let vertex_buffer = device.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(vertices));
        let index_buffer = device.create_buffer(BufferTarget::Index, bytemuck::cast_slice(indices));

        let handle = self.geometries.insert(Geometry {
            vertex_buffer,
            index_buffer,
            vertex_count,
            index_count: indices.len() as u32,
            layout: VertexLayout::INTERLEAVED,
        });
        log::debug!(
            "Uploaded mesh {:?}: {} vertices, {} indices",
            handle,
            vertex_count,
            indices.len()
        );
        Ok(handle)
    }

    pub fn upload_vertices<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        vertices: &[Vertex],
        indices: &[u16],
    ) -> Result<Handle<Geometry>, ResourceError> {
        self.upload_mesh(device, bytemuck::cast_slice(vertices), indices)
    }

    pub fn geometry(&self, handle: Handle<Geometry>) -> Option<&Geometry> {
        self.geometries.get(handle)
    }

    /// Frees the geometry's buffers. Batches still referencing it are skipped
    /// at draw time.
    pub fn remove_geometry<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        handle: Handle<Geometry>,
    ) -> bool {
        match self.geometries.remove(handle) {
            Some(geometry) => {
                device.delete_buffer(geometry.vertex_buffer);
                device.delete_buffer(geometry.index_buffer);
                true
            }
            None => false,
        }
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Creates a named texture, replacing (and freeing) any previous texture
    /// with the same name.
    pub fn set_texture<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        name: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
        filter: TextureFilter,
    ) -> Result<TextureId, ResourceError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected || expected == 0 {
            return Err(ResourceError::TextureSize {
                name: name.to_owned(),
                expected,
                actual: rgba.len(),
            });
        }

        let id = device.create_texture(
            &TextureDesc {
                width,
                height,
                filter,
            },
            rgba,
        );
        if let Some(old) = self.textures.insert(name.to_owned(), id) {
            device.delete_texture(old);
        }
        Ok(id)
    }

    pub fn texture(&self, name: &str) -> Option<TextureId> {
        self.textures.get(name).copied()
    }

    pub fn remove_texture<D: GraphicsDevice>(&mut self, device: &mut D, name: &str) -> bool {
        match self.textures.remove(name) {
            Some(id) => {
                device.delete_texture(id);
                true
            }
            None => false,
        }
    }

    /// 1x1 opaque white texture bound when a batch has no texture.
    pub fn ensure_dummy_texture<D: GraphicsDevice>(&mut self, device: &mut D) -> TextureId {
        *self.dummy_texture.get_or_insert_with(|| {
            device.create_texture(
                &TextureDesc {
                    width: 1,
                    height: 1,
                    filter: TextureFilter::Nearest,
                },
                &[255, 255, 255, 255],
            )
        })
    }

    pub fn dummy_texture(&self) -> Option<TextureId> {
        self.dummy_texture
    }

    /// Fills a buffer with repeating barycentric corners `(1,0,0) (0,1,0)
    /// (0,0,1)`, one triple per triangle, for as many triangles as fit in
    /// `size_bytes`. Replaces a previously loaded buffer.
    pub fn load_wireframe_buffer<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        size_bytes: usize,
    ) -> BufferId {
        let triangles = size_bytes / (3 * 3 * 4);
        let corners: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let data: Vec<f32> = corners.iter().copied().cycle().take(triangles * 9).collect();

        let buffer = device.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(&data));
        if let Some(old) = self.wireframe_buffer.replace(buffer) {
            device.delete_buffer(old);
        }
        buffer
    }

    pub fn wireframe_buffer(&self) -> Option<BufferId> {
        self.wireframe_buffer
    }

    pub fn clear<D: GraphicsDevice>(&mut self, device: &mut D) {
        for geometry in self.geometries.drain() {
            device.delete_buffer(geometry.vertex_buffer);
            device.delete_buffer(geometry.index_buffer);
        }
        for (_, id) in self.textures.drain() {
            device.delete_texture(id);
        }
        if let Some(id) = self.dummy_texture.take() {
            device.delete_texture(id);
        }
        if let Some(buffer) = self.wireframe_buffer.take() {
            device.delete_buffer(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::primitives::cube_mesh;
    use crate::renderer::recording::RecordingDevice;

    #[test]
    fn upload_rejects_empty_input() {
        let mut device = RecordingDevice::new();
        let mut resources = ResourceManager::new();
        assert_eq!(
            resources.upload_mesh(&mut device, &[], &[0]),
            Err(ResourceError::EmptyVertices)
        );
        assert_eq!(
            resources.upload_mesh(&mut device, &[0.0; 8], &[]),
            Err(ResourceError::EmptyIndices)
        );
        assert_eq!(device.live_buffer_count(), 0);
    }

    #[test]
    fn upload_rejects_out_of_range_indices() {
        let mut device = RecordingDevice::new();
        let mut resources = ResourceManager::new();
        let err = resources
            .upload_mesh(&mut device, &[0.0; 16], &[0, 1, 2])
            .unwrap_err();
        assert_eq!(
            err,
            ResourceError::IndexOutOfRange {
                index: 2,
                vertex_count: 2
            }
        );
    }

    #[test]
    fn cube_upload_and_remove() {
        let mut device = RecordingDevice::new();
        let mut resources = ResourceManager::new();
        let (vertices, indices) = cube_mesh();
        let handle = resources
            .upload_vertices(&mut device, &vertices, &indices)
            .unwrap();

        let geometry = *resources.geometry(handle).unwrap();
        assert_eq!(geometry.index_count, 36);
        assert_eq!(
            device.buffer_data(geometry.vertex_buffer).unwrap().len(),
            24 * 32
        );

        assert!(resources.remove_geometry(&mut device, handle));
        assert!(resources.geometry(handle).is_none());
        assert_eq!(device.live_buffer_count(), 0);
    }

    #[test]
    fn set_texture_replaces_previous() {
        let mut device = RecordingDevice::new();
        let mut resources = ResourceManager::new();
        let first = resources
            .set_texture(&mut device, "atlas", 1, 1, &[0; 4], TextureFilter::Linear)
            .unwrap();
        let second = resources
            .set_texture(&mut device, "atlas", 2, 1, &[0; 8], TextureFilter::Nearest)
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(resources.texture("atlas"), Some(second));
        assert_eq!(device.live_texture_count(), 1);

        let err = resources
            .set_texture(&mut device, "bad", 2, 2, &[0; 4], TextureFilter::Linear)
            .unwrap_err();
        assert!(matches!(err, ResourceError::TextureSize { expected: 16, .. }));
    }

    #[test]
    fn wireframe_buffer_holds_whole_triangles() {
        let mut device = RecordingDevice::new();
        let mut resources = ResourceManager::new();
        let buffer = resources.load_wireframe_buffer(&mut device, 100);
        // 100 / 36 = 2 triangles
        assert_eq!(device.buffer_data(buffer).unwrap().len(), 2 * 36);
        let floats = device.buffer_f32(buffer).unwrap();
        assert_eq!(&floats[9..12], &[1.0, 0.0, 0.0]);
        assert_eq!(&floats[15..18], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn dummy_texture_is_created_once() {
        let mut device = RecordingDevice::new();
        let mut resources = ResourceManager::new();
        let a = resources.ensure_dummy_texture(&mut device);
        let b = resources.ensure_dummy_texture(&mut device);
        assert_eq!(a, b);
        assert_eq!(device.live_texture_count(), 1);
    }
}
