// renderer/batch.rs
use super::device::BufferId;
use super::ids::ObjectId;
use super::program::ProgramId;
use crate::asset::{Geometry, Handle};
use bitflags::bitflags;
use glam::{Mat4, Vec2, Vec4};
use std::collections::HashMap;

/// Bytes per instance in a transform buffer (one column-major 4x4 f32 matrix).
pub const TRANSFORM_STRIDE: u64 = 64;
/// Bytes per instance in a point-mesh translation buffer.
pub const TRANSLATION_STRIDE: u64 = 12;
/// Bytes per instance in a color buffer (RGBA8).
pub const COLOR_STRIDE: u64 = 4;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BatchFlags: u16 {
        const VISIBLE = 1 << 0;
        const WIREFRAME = 1 << 1;
        const BILLBOARD = 1 << 2;
        const BLENDING = 1 << 3;
        /// Depth writes are suppressed while drawing this batch.
        const DEPTH_MASK = 1 << 4;
        const CULL_FACE = 1 << 5;
        const INVERSE_CULL_FACE = 1 << 6;
        const UNLIT = 1 << 7;
    }
}

/// Creation options shared by every `add_*` call.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub texture: Option<String>,
    pub billboard: bool,
    pub billboard_size: Option<Vec2>,
    pub billboard_rotation: Option<f32>,
    pub cull_face: bool,
    pub inverse_cull_face: bool,
    pub visible: bool,
    /// Instanced batches hand out only the head id instead of one per instance.
    pub merge_ids: bool,
    pub program: Option<ProgramId>,
    pub use_blending: bool,
    pub use_depth_mask: bool,
    pub unlit: bool,
    /// Base model transform applied to the whole batch.
    pub transform: Option<Mat4>,
    pub layer: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            texture: None,
            billboard: false,
            billboard_size: None,
            billboard_rotation: None,
            cull_face: false,
            inverse_cull_face: false,
            visible: true,
            merge_ids: false,
            program: None,
            use_blending: false,
            use_depth_mask: false,
            unlit: false,
            transform: None,
            layer: 0,
        }
    }
}

impl BatchOptions {
    pub fn with_texture(mut self, name: impl Into<String>) -> Self {
        self.texture = Some(name.into());
        self
    }

    pub fn with_billboard(mut self, size: Option<Vec2>, rotation: Option<f32>) -> Self {
        self.billboard = true;
        self.billboard_size = size;
        self.billboard_rotation = rotation;
        self
    }

    pub fn with_cull_face(mut self, inverse: bool) -> Self {
        self.cull_face = true;
        self.inverse_cull_face = inverse;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_merged_ids(mut self) -> Self {
        self.merge_ids = true;
        self
    }

    pub fn with_program(mut self, program: ProgramId) -> Self {
        self.program = Some(program);
        self
    }

    pub fn with_blending(mut self) -> Self {
        self.use_blending = true;
        self
    }

    pub fn with_depth_mask(mut self) -> Self {
        self.use_depth_mask = true;
        self
    }

    pub fn unlit(mut self) -> Self {
        self.unlit = true;
        self
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn on_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    pub(crate) fn base_flags(&self) -> BatchFlags {
        let mut flags = BatchFlags::empty();
        flags.set(BatchFlags::VISIBLE, self.visible);
        flags.set(BatchFlags::BILLBOARD, self.billboard);
        flags.set(
            BatchFlags::BLENDING,
            self.use_blending || self.texture.is_some(),
        );
        flags.set(BatchFlags::DEPTH_MASK, self.use_depth_mask);
        flags.set(
            BatchFlags::CULL_FACE,
            self.cull_face || self.inverse_cull_face,
        );
        flags.set(BatchFlags::INVERSE_CULL_FACE, self.inverse_cull_face);
        flags.set(BatchFlags::UNLIT, self.unlit);
        flags
    }
}

/// Instance data source for `add_instances`.
#[derive(Debug, Clone, Copy)]
pub enum Transforms<'a> {
    Matrices(&'a [Mat4]),
    /// 16 column-major floats per instance.
    Packed(&'a [f32]),
    /// Pre-packed device buffer; ownership moves to the batch.
    Buffer { buffer: BufferId, count: u32 },
}

impl Transforms<'_> {
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Transforms::Matrices(m) => m.is_empty(),
            Transforms::Packed(p) => p.is_empty(),
            Transforms::Buffer { count, .. } => *count == 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Colors<'a> {
    Rgba(&'a [Vec4]),
    /// Four bytes per instance.
    Bytes(&'a [u8]),
    /// Pre-packed device buffer; ownership moves to the batch.
    Buffer { buffer: BufferId, translucent: bool },
}

impl Colors<'_> {
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Colors::Rgba(c) => c.is_empty(),
            Colors::Bytes(b) => b.is_empty(),
            Colors::Buffer { .. } => false,
        }
    }
}

/// Device buffers and slot bookkeeping shared by every instance of a batch.
#[derive(Debug, Clone)]
pub struct InstanceBuffers {
    /// Model matrices, or translations for point meshes.
    pub transforms: BufferId,
    pub colors: BufferId,
    pub instance_count: u32,
    /// Bytes per instance in `transforms`.
    pub transform_stride: u64,
    pub(crate) offsets: HashMap<ObjectId, u32>,
    pub(crate) slots: Vec<Option<ObjectId>>,
}

impl InstanceBuffers {
    pub(crate) fn new(
        transforms: BufferId,
        colors: BufferId,
        instance_count: u32,
        transform_stride: u64,
    ) -> Self {
        Self {
            transforms,
            colors,
            instance_count,
            transform_stride,
            offsets: HashMap::new(),
            slots: vec![None; instance_count as usize],
        }
    }

    pub(crate) fn assign(&mut self, id: ObjectId, slot: u32) {
        self.offsets.insert(id, slot);
        self.slots[slot as usize] = Some(id);
    }

    pub fn offset(&self, id: ObjectId) -> Option<u32> {
        self.offsets.get(&id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.slots.iter().flatten().copied()
    }
}

#[derive(Debug, Clone)]
pub enum BatchKind {
    Single { color: Vec4 },
    Instanced(InstanceBuffers),
    PointMesh(InstanceBuffers),
}

impl BatchKind {
    pub fn instances(&self) -> Option<&InstanceBuffers> {
        match self {
            BatchKind::Single { .. } => None,
            BatchKind::Instanced(buffers) | BatchKind::PointMesh(buffers) => Some(buffers),
        }
    }

    pub fn instances_mut(&mut self) -> Option<&mut InstanceBuffers> {
        match self {
            BatchKind::Single { .. } => None,
            BatchKind::Instanced(buffers) | BatchKind::PointMesh(buffers) => Some(buffers),
        }
    }
}

/// One draw group: a single object or a set of instances drawn together.
#[derive(Debug, Clone)]
pub struct DrawBatch {
    pub geometry: Handle<Geometry>,
    pub flags: BatchFlags,
    pub texture: Option<String>,
    pub billboard_size: Option<Vec2>,
    pub billboard_rotation: Option<f32>,
    /// Model transform for singles and point meshes; per-instance matrices
    /// live in the instance buffer.
    pub transform: Mat4,
    pub layer: u32,
    pub kind: BatchKind,
    pub(crate) program_override: Option<ProgramId>,
}

impl DrawBatch {
    pub(crate) fn new(geometry: Handle<Geometry>, options: &BatchOptions, kind: BatchKind) -> Self {
        Self {
            geometry,
            flags: options.base_flags(),
            texture: options.texture.clone(),
            billboard_size: options.billboard_size,
            billboard_rotation: options.billboard_rotation,
            transform: options.transform.unwrap_or(Mat4::IDENTITY),
            layer: options.layer,
            kind,
            program_override: options.program.clone(),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.flags.contains(BatchFlags::VISIBLE)
    }

    pub fn is_wireframe(&self) -> bool {
        self.flags.contains(BatchFlags::WIREFRAME)
    }

    /// Program used for drawing; a custom program wins over the wireframe
    /// variant of the built-in one.
    pub fn program(&self) -> ProgramId {
        if let Some(program) = &self.program_override {
            return program.clone();
        }
        let wireframe = self.is_wireframe();
        match (&self.kind, wireframe) {
            (BatchKind::Single { .. }, false) => ProgramId::DEFAULT,
            (BatchKind::Single { .. }, true) => ProgramId::DEFAULT_WIREFRAME,
            (BatchKind::Instanced(_), false) => ProgramId::INSTANCE,
            (BatchKind::Instanced(_), true) => ProgramId::INSTANCE_WIREFRAME,
            (BatchKind::PointMesh(_), _) => ProgramId::POINT_MESH,
        }
    }

    pub fn instance_count(&self) -> u32 {
        self.kind.instances().map_or(1, |b| b.instance_count)
    }
}

/// Float RGBA to bytes: clamp to `[0, 1]`, scale by 255, truncate.
pub fn color_to_bytes(color: Vec4) -> [u8; 4] {
    let c = color.to_array();
    c.map(|channel| (channel.clamp(0.0, 1.0) * 255.0) as u8)
}

pub(crate) fn pack_colors(colors: &[Vec4]) -> Vec<u8> {
    colors.iter().flat_map(|c| color_to_bytes(*c)).collect()
}

pub(crate) fn any_translucent(bytes: &[u8]) -> bool {
    bytes.chunks_exact(4).any(|rgba| rgba[3] < 255)
}
