// renderer/registry.rs
use super::batch::{
    any_translucent, color_to_bytes, pack_colors, BatchFlags, BatchKind, BatchOptions, Colors,
    DrawBatch, InstanceBuffers, Transforms, COLOR_STRIDE, TRANSFORM_STRIDE, TRANSLATION_STRIDE,
};
use super::device::{BufferTarget, GraphicsDevice};
use super::ids::{IdentityAllocator, ObjectId};
use crate::asset::{Geometry, Handle};
use glam::{Mat4, Vec3, Vec4};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("Matrices can not be empty")]
    MissingTransforms,
    #[error("Colors can not be empty")]
    MissingColors,
    #[error("Colors and instances must have same length ({transforms} transforms, {colors} colors)")]
    CountMismatch { transforms: usize, colors: usize },
    #[error("{what} data of {len} values is not a multiple of {stride}")]
    Misaligned {
        what: &'static str,
        len: usize,
        stride: usize,
    },
    #[error("Device has no hardware instancing")]
    InstancingUnavailable,
    #[error("Unknown geometry {0:?}")]
    UnknownGeometry(Handle<Geometry>),
}

/// Owns every draw batch, the instance-slot maps and per-layer draw order.
///
/// Layer lists hold batch heads. Instance ids resolve to their head through
/// `owners`; a head resolves to itself.
pub struct BatchRegistry {
    allocator: IdentityAllocator,
    batches: HashMap<ObjectId, DrawBatch>,
    owners: HashMap<ObjectId, ObjectId>,
    layers: BTreeMap<u32, Vec<ObjectId>>,
}

impl BatchRegistry {
    pub fn new(allocator: IdentityAllocator) -> Self {
        let mut layers = BTreeMap::new();
        layers.insert(0, Vec::new());
        Self {
            allocator,
            batches: HashMap::new(),
            owners: HashMap::new(),
            layers,
        }
    }

    pub fn allocator(&self) -> &IdentityAllocator {
        &self.allocator
    }

    pub fn add_layer(&mut self, layer: u32) {
        self.layers.entry(layer).or_default();
    }

    /// Adds a set of instances of one geometry.
    ///
    /// With hardware instancing this creates one batch (and head id) backed by
    /// shared transform/color buffers and returns one id per instance, or just
    /// the head id when `merge_ids` is set. Without instancing every element
    /// becomes its own single batch.
    pub fn add_instances<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        geometry: Handle<Geometry>,
        transforms: Transforms<'_>,
        colors: Colors<'_>,
        options: &BatchOptions,
    ) -> Result<Vec<ObjectId>, BatchError> {
        if transforms.is_empty() {
            log::error!("add_instances: no transforms given");
            return Err(BatchError::MissingTransforms);
        }
        if colors.is_empty() {
            log::error!("add_instances: no colors given");
            return Err(BatchError::MissingColors);
        }

        let transform_count = match transforms {
            Transforms::Matrices(m) => Some(m.len()),
            Transforms::Packed(p) => Some(checked_count("Transform", p.len(), 16)?),
            Transforms::Buffer { .. } => None,
        };
        let color_count = match colors {
            Colors::Rgba(c) => Some(c.len()),
            Colors::Bytes(b) => Some(checked_count("Color", b.len(), 4)?),
            Colors::Buffer { .. } => None,
        };
        if let (Some(t), Some(c)) = (transform_count, color_count) {
            if t != c {
                log::error!("add_instances: {} transforms but {} colors", t, c);
                return Err(BatchError::CountMismatch {
                    transforms: t,
                    colors: c,
                });
            }
        }

        if !device.capabilities().instancing {
            return self.add_singles(geometry, transforms, colors, options);
        }

        let instance_count = match transforms {
            Transforms::Buffer { count, .. } => count,
            _ => transform_count.unwrap_or(0) as u32,
        };

        let transform_buffer = match transforms {
            Transforms::Matrices(matrices) => {
                let packed: Vec<f32> = matrices.iter().flat_map(|m| m.to_cols_array()).collect();
                device.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(&packed))
            }
            Transforms::Packed(packed) => {
                device.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(packed))
            }
            Transforms::Buffer { buffer, .. } => buffer,
        };
        let (color_buffer, translucent) = match colors {
            Colors::Rgba(rgba) => {
                let bytes = pack_colors(rgba);
                let translucent = any_translucent(&bytes);
                (device.create_buffer(BufferTarget::Vertex, &bytes), translucent)
            }
            Colors::Bytes(bytes) => (
                device.create_buffer(BufferTarget::Vertex, bytes),
                any_translucent(bytes),
            ),
            Colors::Buffer {
                buffer,
                translucent,
            } => (buffer, translucent),
        };

        let head = self.allocator.allocate();
        let mut buffers =
            InstanceBuffers::new(transform_buffer, color_buffer, instance_count, TRANSFORM_STRIDE);

        let ids = if options.merge_ids {
            vec![head]
        } else {
            (0..instance_count)
                .map(|slot| {
                    let id = self.allocator.allocate();
                    buffers.assign(id, slot);
                    self.owners.insert(id, head);
                    id
                })
                .collect()
        };

        let mut batch = DrawBatch::new(geometry, options, BatchKind::Instanced(buffers));
        apply_translucency(&mut batch.flags, translucent);
        self.insert_head(head, batch);

        log::debug!(
            "Added instanced batch {} ({} instances, layer {})",
            head,
            instance_count,
            options.layer
        );
        Ok(ids)
    }

    fn add_singles(
        &mut self,
        geometry: Handle<Geometry>,
        transforms: Transforms<'_>,
        colors: Colors<'_>,
        options: &BatchOptions,
    ) -> Result<Vec<ObjectId>, BatchError> {
        let matrices: Vec<Mat4> = match transforms {
            Transforms::Matrices(m) => m.to_vec(),
            Transforms::Packed(p) => p.chunks_exact(16).map(Mat4::from_cols_slice).collect(),
            Transforms::Buffer { .. } => return Err(BatchError::InstancingUnavailable),
        };
        let rgba: Vec<Vec4> = match colors {
            Colors::Rgba(c) => c.to_vec(),
            Colors::Bytes(b) => b
                .chunks_exact(4)
                .map(|c| Vec4::new(c[0] as f32, c[1] as f32, c[2] as f32, c[3] as f32) / 255.0)
                .collect(),
            Colors::Buffer { .. } => return Err(BatchError::InstancingUnavailable),
        };

        log::debug!(
            "Instancing unavailable, adding {} single batches",
            matrices.len()
        );
        Ok(matrices
            .into_iter()
            .zip(rgba)
            .map(|(transform, color)| self.add_object(geometry, transform, color, options))
            .collect())
    }

    /// Adds one non-instanced object. `transform` is applied after the
    /// optional base transform in `options`.
    pub fn add_object(
        &mut self,
        geometry: Handle<Geometry>,
        transform: Mat4,
        color: Vec4,
        options: &BatchOptions,
    ) -> ObjectId {
        let id = self.allocator.allocate();
        let mut batch = DrawBatch::new(geometry, options, BatchKind::Single { color });
        batch.transform *= transform;
        apply_translucency(&mut batch.flags, color.w < 1.0);
        self.insert_head(id, batch);
        id
    }

    /// Adds instances that only carry a translation (3 floats each). Point
    /// meshes are billboards unless a custom program is given.
    pub fn add_point_mesh<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        geometry: Handle<Geometry>,
        points: &[Vec3],
        colors: Colors<'_>,
        options: &BatchOptions,
    ) -> Result<ObjectId, BatchError> {
        if points.is_empty() {
            log::error!("add_point_mesh: no points given");
            return Err(BatchError::MissingTransforms);
        }
        if colors.is_empty() {
            log::error!("add_point_mesh: no colors given");
            return Err(BatchError::MissingColors);
        }
        if !device.capabilities().instancing {
            log::error!("add_point_mesh: device has no instancing");
            return Err(BatchError::InstancingUnavailable);
        }

        let color_count = match colors {
            Colors::Rgba(c) => Some(c.len()),
            Colors::Bytes(b) => Some(checked_count("Color", b.len(), 4)?),
            Colors::Buffer { .. } => None,
        };
        if let Some(c) = color_count.filter(|&c| c != points.len()) {
            log::error!("add_point_mesh: {} points but {} colors", points.len(), c);
            return Err(BatchError::CountMismatch {
                transforms: points.len(),
                colors: c,
            });
        }

        let packed: Vec<f32> = points.iter().flat_map(|p| p.to_array()).collect();
        let translations = device.create_buffer(BufferTarget::Vertex, bytemuck::cast_slice(&packed));
        let (color_buffer, translucent) = match colors {
            Colors::Rgba(rgba) => {
                let bytes = pack_colors(rgba);
                let translucent = any_translucent(&bytes);
                (device.create_buffer(BufferTarget::Vertex, &bytes), translucent)
            }
            Colors::Bytes(bytes) => (
                device.create_buffer(BufferTarget::Vertex, bytes),
                any_translucent(bytes),
            ),
            Colors::Buffer {
                buffer,
                translucent,
            } => (buffer, translucent),
        };

        let head = self.allocator.allocate();
        let buffers = InstanceBuffers::new(
            translations,
            color_buffer,
            points.len() as u32,
            TRANSLATION_STRIDE,
        );
        let mut batch = DrawBatch::new(geometry, options, BatchKind::PointMesh(buffers));
        if options.program.is_none() {
            batch.flags.insert(BatchFlags::BILLBOARD);
        }
        apply_translucency(&mut batch.flags, translucent);
        self.insert_head(head, batch);
        Ok(head)
    }

    fn insert_head(&mut self, head: ObjectId, batch: DrawBatch) {
        self.layers.entry(batch.layer).or_default().push(head);
        self.batches.insert(head, batch);
    }

    /// Removes a whole batch (given its head) or a single instance.
    ///
    /// Instance removal moves the last instance into the freed slot so slots
    /// stay dense; removing the last instance removes the batch. Device
    /// buffers owned by a removed batch are deleted.
    pub fn remove_object<D: GraphicsDevice>(&mut self, device: &mut D, id: ObjectId) -> bool {
        if let Some(batch) = self.batches.remove(&id) {
            for heads in self.layers.values_mut() {
                heads.retain(|head| *head != id);
            }
            if let Some(buffers) = batch.kind.instances() {
                for member in buffers.ids() {
                    self.owners.remove(&member);
                }
                device.delete_buffer(buffers.transforms);
                device.delete_buffer(buffers.colors);
            }
            log::debug!("Removed batch {}", id);
            return true;
        }

        let Some(head) = self.owners.remove(&id) else {
            return false;
        };
        let Some(buffers) = self
            .batches
            .get_mut(&head)
            .and_then(|batch| batch.kind.instances_mut())
        else {
            return false;
        };
        let Some(slot) = buffers.offsets.remove(&id) else {
            return false;
        };

        let last = buffers.instance_count - 1;
        if slot != last {
            let stride = buffers.transform_stride;
            device.copy_buffer_region(
                buffers.transforms,
                u64::from(last) * stride,
                u64::from(slot) * stride,
                stride,
            );
            device.copy_buffer_region(
                buffers.colors,
                u64::from(last) * COLOR_STRIDE,
                u64::from(slot) * COLOR_STRIDE,
                COLOR_STRIDE,
            );
            let moved = buffers.slots[last as usize].take();
            if let Some(moved) = moved {
                buffers.offsets.insert(moved, slot);
            }
            buffers.slots[slot as usize] = moved;
        }
        buffers.slots.truncate(last as usize);
        buffers.instance_count = last;

        if last == 0 {
            self.remove_object(device, head);
        }
        true
    }

    /// Batch owning `id`; instance ids resolve to their shared batch.
    pub fn batch(&self, id: ObjectId) -> Option<&DrawBatch> {
        self.batches.get(&self.head_of(id)?)
    }

    pub fn has_object(&self, id: ObjectId) -> bool {
        self.batches.contains_key(&id) || self.owners.contains_key(&id)
    }

    pub fn head_of(&self, id: ObjectId) -> Option<ObjectId> {
        if self.batches.contains_key(&id) {
            Some(id)
        } else {
            self.owners.get(&id).copied()
        }
    }

    /// Instance slot of `id`, or `None` for heads and unknown ids.
    pub fn offset(&self, id: ObjectId) -> Option<u32> {
        let head = self.owners.get(&id)?;
        self.batches.get(head)?.kind.instances()?.offset(id)
    }

    /// Sets the color of one instance, or of every instance when `id` is a
    /// batch head. Blending follows the new alpha unless `force_blending`;
    /// billboards also drop depth writes while translucent.
    pub fn update_color<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        id: ObjectId,
        color: Vec4,
        force_blending: bool,
    ) -> bool {
        let Some(head) = self.head_of(id) else {
            return false;
        };
        let slot = self.offset(id);
        let Some(batch) = self.batches.get_mut(&head) else {
            return false;
        };

        let bytes = color_to_bytes(color);
        match &mut batch.kind {
            BatchKind::Single { color: stored } => *stored = color,
            BatchKind::Instanced(buffers) | BatchKind::PointMesh(buffers) => match slot {
                Some(slot) => {
                    device.write_buffer(buffers.colors, u64::from(slot) * COLOR_STRIDE, &bytes)
                }
                None => {
                    let all = bytes.repeat(buffers.instance_count as usize);
                    device.write_buffer(buffers.colors, 0, &all);
                }
            },
        }
        let translucent = color.w < 1.0;
        batch.flags.remove(BatchFlags::BLENDING);
        if batch.flags.contains(BatchFlags::BILLBOARD) {
            batch.flags.remove(BatchFlags::DEPTH_MASK);
        }
        apply_translucency(&mut batch.flags, translucent);
        if force_blending {
            batch.flags.insert(BatchFlags::BLENDING);
        }
        true
    }

    /// Instances get their slot's matrix rewritten; heads and singles get
    /// their base transform replaced.
    pub fn update_transform<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        id: ObjectId,
        transform: Mat4,
    ) -> bool {
        let Some(head) = self.head_of(id) else {
            return false;
        };
        let slot = self.offset(id);
        let Some(batch) = self.batches.get_mut(&head) else {
            return false;
        };

        match (slot, batch.kind.instances()) {
            (Some(slot), Some(buffers)) => {
                let cols = transform.to_cols_array();
                device.write_buffer(
                    buffers.transforms,
                    u64::from(slot) * buffers.transform_stride,
                    bytemuck::cast_slice(&cols),
                );
            }
            _ => batch.transform = transform,
        }
        true
    }

    pub fn set_visibility(&mut self, id: ObjectId, visible: bool) -> bool {
        self.with_batch(id, |batch| batch.flags.set(BatchFlags::VISIBLE, visible))
    }

    /// Point meshes have no wireframe program; they are left untouched and
    /// `false` is returned.
    pub fn set_wireframe(&mut self, id: ObjectId, wireframe: bool) -> bool {
        let Some(batch) = self.head_of(id).and_then(|head| self.batches.get_mut(&head)) else {
            return false;
        };
        if matches!(batch.kind, BatchKind::PointMesh(_)) {
            log::warn!("Point mesh {} has no wireframe variant", id);
            return false;
        }
        batch.flags.set(BatchFlags::WIREFRAME, wireframe);
        true
    }

    fn with_batch(&mut self, id: ObjectId, f: impl FnOnce(&mut DrawBatch)) -> bool {
        let Some(head) = self.head_of(id) else {
            return false;
        };
        match self.batches.get_mut(&head) {
            Some(batch) => {
                f(batch);
                true
            }
            None => false,
        }
    }

    /// Stable sort of one layer's draw order.
    pub fn sort_batches<F>(&mut self, layer: u32, mut compare: F)
    where
        F: FnMut((ObjectId, &DrawBatch), (ObjectId, &DrawBatch)) -> Ordering,
    {
        let batches = &self.batches;
        let Some(heads) = self.layers.get_mut(&layer) else {
            return;
        };
        heads.sort_by(|a, b| match (batches.get(a), batches.get(b)) {
            (Some(batch_a), Some(batch_b)) => compare((*a, batch_a), (*b, batch_b)),
            _ => Ordering::Equal,
        });
    }

    /// Groups a layer by program so consecutive batches share bindings.
    pub fn sort_by_program(&mut self, layer: u32) {
        self.sort_batches(layer, |(_, a), (_, b)| a.program().cmp(&b.program()));
    }

    pub fn has_batches(&self, layer: u32) -> bool {
        self.layers.get(&layer).is_some_and(|heads| !heads.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Number of batches (heads).
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn layer(&self, layer: u32) -> &[ObjectId] {
        self.layers.get(&layer).map_or(&[], Vec::as_slice)
    }

    /// Heads in draw order: ascending layer, then layer order.
    pub fn heads(&self) -> impl Iterator<Item = (ObjectId, &DrawBatch)> + '_ {
        self.layers
            .values()
            .flatten()
            .filter_map(|id| self.batches.get(id).map(|batch| (*id, batch)))
    }

    /// Drops every batch and its instance buffers. Layers stay registered.
    pub fn clear<D: GraphicsDevice>(&mut self, device: &mut D) {
        for batch in self.batches.values() {
            if let Some(buffers) = batch.kind.instances() {
                device.delete_buffer(buffers.transforms);
                device.delete_buffer(buffers.colors);
            }
        }
        self.batches.clear();
        self.owners.clear();
        for heads in self.layers.values_mut() {
            heads.clear();
        }
    }
}

impl Default for BatchRegistry {
    fn default() -> Self {
        Self::new(IdentityAllocator::new())
    }
}

fn checked_count(what: &'static str, len: usize, stride: usize) -> Result<usize, BatchError> {
    if len % stride != 0 {
        log::error!("{} data of {} values is not a multiple of {}", what, len, stride);
        return Err(BatchError::Misaligned { what, len, stride });
    }
    Ok(len / stride)
}

fn apply_translucency(flags: &mut BatchFlags, translucent: bool) {
    if translucent {
        flags.insert(BatchFlags::BLENDING);
        if flags.contains(BatchFlags::BILLBOARD) {
            flags.insert(BatchFlags::DEPTH_MASK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::recording::RecordingDevice;

    fn geometry() -> Handle<Geometry> {
        Handle::new(0, 0)
    }

    #[test]
    fn packed_transforms_must_be_whole_matrices() {
        let mut device = RecordingDevice::new();
        let mut registry = BatchRegistry::default();
        let err = registry
            .add_instances(
                &mut device,
                geometry(),
                Transforms::Packed(&[0.0; 20]),
                Colors::Bytes(&[0; 4]),
                &BatchOptions::default(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            BatchError::Misaligned {
                what: "Transform",
                len: 20,
                stride: 16
            }
        );
        assert_eq!(device.live_buffer_count(), 0);
    }

    #[test]
    fn add_object_translucent_color_blends() {
        let mut registry = BatchRegistry::default();
        let id = registry.add_object(
            geometry(),
            Mat4::IDENTITY,
            Vec4::new(1.0, 1.0, 1.0, 0.5),
            &BatchOptions::default(),
        );
        let batch = registry.batch(id).unwrap();
        assert!(batch.flags.contains(BatchFlags::BLENDING));
        assert!(!batch.flags.contains(BatchFlags::DEPTH_MASK));
        assert_eq!(registry.offset(id), None);
    }

    #[test]
    fn translucent_billboards_suppress_depth_writes() {
        let mut device = RecordingDevice::new();
        let mut registry = BatchRegistry::default();
        let ids = registry
            .add_instances(
                &mut device,
                geometry(),
                Transforms::Matrices(&[Mat4::IDENTITY]),
                Colors::Bytes(&[255, 255, 255, 100]),
                &BatchOptions::default().with_billboard(None, None),
            )
            .unwrap();
        let flags = registry.batch(ids[0]).unwrap().flags;
        assert!(flags.contains(BatchFlags::BLENDING | BatchFlags::DEPTH_MASK));
    }

    #[test]
    fn color_update_toggles_billboard_depth_writes() {
        let mut device = RecordingDevice::new();
        let mut registry = BatchRegistry::default();
        let ids = registry
            .add_instances(
                &mut device,
                geometry(),
                Transforms::Matrices(&[Mat4::IDENTITY; 2]),
                Colors::Rgba(&[Vec4::ONE; 2]),
                &BatchOptions::default().with_billboard(None, None),
            )
            .unwrap();
        let flags = |registry: &BatchRegistry| registry.batch(ids[0]).unwrap().flags;
        assert!(!flags(&registry).intersects(BatchFlags::BLENDING | BatchFlags::DEPTH_MASK));

        registry.update_color(&mut device, ids[1], Vec4::new(1.0, 1.0, 1.0, 0.3), false);
        assert!(flags(&registry).contains(BatchFlags::BLENDING | BatchFlags::DEPTH_MASK));

        registry.update_color(&mut device, ids[1], Vec4::ONE, false);
        assert!(!flags(&registry).intersects(BatchFlags::BLENDING | BatchFlags::DEPTH_MASK));

        // forced blending alone keeps depth writes on
        registry.update_color(&mut device, ids[1], Vec4::ONE, true);
        assert!(flags(&registry).contains(BatchFlags::BLENDING));
        assert!(!flags(&registry).contains(BatchFlags::DEPTH_MASK));
    }

    #[test]
    fn translucent_color_on_plain_batch_keeps_depth_writes() {
        let mut registry = BatchRegistry::default();
        let id = registry.add_object(geometry(), Mat4::IDENTITY, Vec4::ONE, &BatchOptions::default());
        let mut device = RecordingDevice::new();
        registry.update_color(&mut device, id, Vec4::new(0.0, 0.0, 0.0, 0.5), false);
        let flags = registry.batch(id).unwrap().flags;
        assert!(flags.contains(BatchFlags::BLENDING));
        assert!(!flags.contains(BatchFlags::DEPTH_MASK));
    }

    #[test]
    fn point_mesh_rejects_wireframe() {
        let mut device = RecordingDevice::new();
        let mut registry = BatchRegistry::default();
        let id = registry
            .add_point_mesh(
                &mut device,
                geometry(),
                &[Vec3::ZERO],
                Colors::Rgba(&[Vec4::ONE]),
                &BatchOptions::default(),
            )
            .unwrap();
        assert!(!registry.set_wireframe(id, true));
        assert!(!registry.batch(id).unwrap().is_wireframe());

        let single = registry.add_object(geometry(), Mat4::IDENTITY, Vec4::ONE, &BatchOptions::default());
        assert!(registry.set_wireframe(single, true));
        assert!(registry.batch(single).unwrap().is_wireframe());
    }

    #[test]
    fn point_mesh_defaults_to_billboard() {
        let mut device = RecordingDevice::new();
        let mut registry = BatchRegistry::default();
        let id = registry
            .add_point_mesh(
                &mut device,
                geometry(),
                &[Vec3::ZERO, Vec3::X],
                Colors::Rgba(&[Vec4::ONE, Vec4::ONE]),
                &BatchOptions::default(),
            )
            .unwrap();
        let batch = registry.batch(id).unwrap();
        assert!(batch.flags.contains(BatchFlags::BILLBOARD));
        let buffers = batch.kind.instances().unwrap();
        assert_eq!(device.buffer_data(buffers.transforms).unwrap().len(), 24);
        assert_eq!(batch.program(), crate::renderer::program::ProgramId::POINT_MESH);
    }

    #[test]
    fn point_mesh_needs_instancing() {
        let mut device = RecordingDevice::without_instancing();
        let mut registry = BatchRegistry::default();
        let err = registry
            .add_point_mesh(
                &mut device,
                geometry(),
                &[Vec3::ZERO],
                Colors::Bytes(&[0; 4]),
                &BatchOptions::default(),
            )
            .unwrap_err();
        assert_eq!(err, BatchError::InstancingUnavailable);
    }

    #[test]
    fn layers_are_independent() {
        let mut registry = BatchRegistry::default();
        registry.add_layer(3);
        assert!(!registry.has_batches(3));
        let id = registry.add_object(
            geometry(),
            Mat4::IDENTITY,
            Vec4::ONE,
            &BatchOptions::default().on_layer(3),
        );
        assert!(registry.has_batches(3));
        assert!(!registry.has_batches(0));
        assert_eq!(registry.layer(3), &[id]);
    }
}
