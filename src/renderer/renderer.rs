// renderer/renderer.rs
use crate::asset::{Geometry, Handle, ResourceError, ResourceManager};
use crate::renderer::batch::{BatchOptions, Colors, DrawBatch, Transforms};
use crate::renderer::device::{ClearFlags, GraphicsDevice, TextureFilter, TextureId};
use crate::renderer::ids::{IdentityAllocator, ObjectId};
use crate::renderer::program::ProgramManager;
use crate::renderer::registry::{BatchError, BatchRegistry};
use crate::renderer::sequencer::{FrameStats, FrameView, RenderStateSequencer};
use crate::renderer::vertex::Vertex;
use crate::scene::FrameUpdate;
use crate::settings::RenderSettings;

use glam::{Mat4, Vec2, Vec3, Vec4};
use std::cmp::Ordering;

/// Batch registry, resources and the draw loop behind one device.
pub struct Renderer<D: GraphicsDevice> {
    device: D,
    registry: BatchRegistry,
    resources: ResourceManager,
    programs: ProgramManager,
    sequencer: RenderStateSequencer,
    view: Mat4,
    projection: Mat4,
    screen: Vec2,
    background: Vec4,
    last_stats: FrameStats,
}

impl<D: GraphicsDevice> Renderer<D> {
    pub fn new(device: D, programs: ProgramManager, settings: &RenderSettings) -> Self {
        Self::with_allocator(device, programs, settings, IdentityAllocator::new())
    }

    /// Renderers built from clones of one allocator hand out ids from a
    /// single sequence.
    pub fn with_allocator(
        mut device: D,
        programs: ProgramManager,
        settings: &RenderSettings,
        allocator: IdentityAllocator,
    ) -> Self {
        let mut resources = ResourceManager::new();
        resources.ensure_dummy_texture(&mut device);
        if settings.wireframe_buffer_bytes > 0 {
            resources.load_wireframe_buffer(&mut device, settings.wireframe_buffer_bytes);
        }

        let background = settings.background_color();
        device.set_clear_color(background);

        let resolution = &settings.resolution;
        let screen = Vec2::new(resolution.width as f32, resolution.height as f32);
        let camera = &settings.camera;
        let projection = Mat4::perspective_rh(
            camera.fov_y_degrees.to_radians(),
            screen.x / screen.y,
            camera.near,
            camera.far,
        );

        log::info!(
            "Renderer ready: {} programs, instancing {}",
            programs.len(),
            if device.capabilities().instancing {
                "available"
            } else {
                "unavailable"
            }
        );

        Self {
            device,
            registry: BatchRegistry::new(allocator),
            resources,
            programs,
            sequencer: RenderStateSequencer::new(settings.sequencer_settings()),
            view: Mat4::IDENTITY,
            projection,
            screen,
            background,
            last_stats: FrameStats::default(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn registry(&self) -> &BatchRegistry {
        &self.registry
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn programs(&self) -> &ProgramManager {
        &self.programs
    }

    pub fn programs_mut(&mut self) -> &mut ProgramManager {
        &mut self.programs
    }

    pub fn allocator(&self) -> &IdentityAllocator {
        self.registry.allocator()
    }

    // Resources

    pub fn upload_mesh(
        &mut self,
        vertices: &[f32],
        indices: &[u16],
    ) -> Result<Handle<Geometry>, ResourceError> {
        self.resources.upload_mesh(&mut self.device, vertices, indices)
    }

    pub fn upload_vertices(
        &mut self,
        vertices: &[Vertex],
        indices: &[u16],
    ) -> Result<Handle<Geometry>, ResourceError> {
        self.resources
            .upload_vertices(&mut self.device, vertices, indices)
    }

    pub fn remove_geometry(&mut self, geometry: Handle<Geometry>) -> bool {
        self.resources.remove_geometry(&mut self.device, geometry)
    }

    pub fn set_texture(
        &mut self,
        name: &str,
        width: u32,
        height: u32,
        rgba: &[u8],
        filter: TextureFilter,
    ) -> Result<TextureId, ResourceError> {
        self.resources
            .set_texture(&mut self.device, name, width, height, rgba, filter)
    }

    pub fn remove_texture(&mut self, name: &str) -> bool {
        self.resources.remove_texture(&mut self.device, name)
    }

    // Batches

    pub fn add_instances(
        &mut self,
        geometry: Handle<Geometry>,
        transforms: Transforms<'_>,
        colors: Colors<'_>,
        options: &BatchOptions,
    ) -> Result<Vec<ObjectId>, BatchError> {
        self.check_geometry(geometry)?;
        self.registry
            .add_instances(&mut self.device, geometry, transforms, colors, options)
    }

    pub fn add_object(
        &mut self,
        geometry: Handle<Geometry>,
        transform: Mat4,
        color: Vec4,
        options: &BatchOptions,
    ) -> Result<ObjectId, BatchError> {
        self.check_geometry(geometry)?;
        Ok(self.registry.add_object(geometry, transform, color, options))
    }

    pub fn add_point_mesh(
        &mut self,
        geometry: Handle<Geometry>,
        points: &[Vec3],
        colors: Colors<'_>,
        options: &BatchOptions,
    ) -> Result<ObjectId, BatchError> {
        self.check_geometry(geometry)?;
        self.registry
            .add_point_mesh(&mut self.device, geometry, points, colors, options)
    }

    fn check_geometry(&self, geometry: Handle<Geometry>) -> Result<(), BatchError> {
        if self.resources.geometry(geometry).is_none() {
            log::error!("Geometry {:?} is not loaded", geometry);
            return Err(BatchError::UnknownGeometry(geometry));
        }
        Ok(())
    }

    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        self.registry.remove_object(&mut self.device, id)
    }

    pub fn batch(&self, id: ObjectId) -> Option<&DrawBatch> {
        self.registry.batch(id)
    }

    pub fn has_object(&self, id: ObjectId) -> bool {
        self.registry.has_object(id)
    }

    pub fn head_of(&self, id: ObjectId) -> Option<ObjectId> {
        self.registry.head_of(id)
    }

    pub fn offset(&self, id: ObjectId) -> Option<u32> {
        self.registry.offset(id)
    }

    pub fn update_color(&mut self, id: ObjectId, color: Vec4, force_blending: bool) -> bool {
        self.registry
            .update_color(&mut self.device, id, color, force_blending)
    }

    pub fn update_transform(&mut self, id: ObjectId, transform: Mat4) -> bool {
        self.registry
            .update_transform(&mut self.device, id, transform)
    }

    pub fn set_visibility(&mut self, id: ObjectId, visible: bool) -> bool {
        self.registry.set_visibility(id, visible)
    }

    pub fn set_wireframe(&mut self, id: ObjectId, wireframe: bool) -> bool {
        self.registry.set_wireframe(id, wireframe)
    }

    pub fn add_layer(&mut self, layer: u32) {
        self.registry.add_layer(layer);
    }

    pub fn has_batches(&self, layer: u32) -> bool {
        self.registry.has_batches(layer)
    }

    pub fn sort_batches<F>(&mut self, layer: u32, compare: F)
    where
        F: FnMut((ObjectId, &DrawBatch), (ObjectId, &DrawBatch)) -> Ordering,
    {
        self.registry.sort_batches(layer, compare);
    }

    pub fn sort_by_program(&mut self, layer: u32) {
        self.registry.sort_by_program(layer);
    }

    pub fn clear_batches(&mut self) {
        self.registry.clear(&mut self.device);
    }

    // View and global state

    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn set_perspective(&mut self, fov_y_degrees: f32, near: f32, far: f32) {
        let aspect = if self.screen.y > 0.0 {
            self.screen.x / self.screen.y
        } else {
            1.0
        };
        self.projection = Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far);
    }

    /// Applies whatever the camera reported for this frame.
    pub fn apply_camera(&mut self, update: &FrameUpdate) {
        if let Some(view) = update.view {
            self.view = view;
        }
        if let Some(projection) = update.projection {
            self.projection = projection;
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.screen = Vec2::new(width as f32, height as f32);
    }

    pub fn screen(&self) -> Vec2 {
        self.screen
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.sequencer.settings_mut().scale = scale;
    }

    pub fn set_rotation(&mut self, rotation: Mat4) {
        self.sequencer.settings_mut().rotation = rotation;
    }

    /// `Some` forces blending on or off for every batch; `None` restores the
    /// per-batch flags.
    pub fn force_blending(&mut self, blending: Option<bool>) {
        self.sequencer.settings_mut().blend_override = blending;
    }

    pub fn set_clear(&mut self, flags: ClearFlags) {
        self.sequencer.settings_mut().clear = flags;
    }

    pub fn set_background_color(&mut self, color: Vec4) {
        self.background = color;
        self.device.set_clear_color(color);
    }

    pub fn background_color(&self) -> Vec4 {
        self.background
    }

    pub fn set_light_position(&mut self, position: Vec3) {
        self.sequencer.settings_mut().light_position = position;
    }

    /// Draws every visible batch once.
    pub fn draw(&mut self) -> FrameStats {
        let frame = FrameView {
            view: self.view,
            projection: self.projection,
            screen: self.screen,
        };
        self.last_stats = self.sequencer.draw(
            &mut self.device,
            &self.registry,
            &self.resources,
            &self.programs,
            &frame,
        );
        if self.last_stats.skipped > 0 {
            log::debug!("{} batches skipped this frame", self.last_stats.skipped);
        }
        self.last_stats
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Frees every batch and resource on the device.
    pub fn shutdown(&mut self) {
        self.registry.clear(&mut self.device);
        self.resources.clear(&mut self.device);
        self.sequencer.reset_device_state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::device::ProgramHandle;
    use crate::renderer::primitives::cube_mesh;
    use crate::renderer::recording::RecordingDevice;

    fn renderer() -> Renderer<RecordingDevice> {
        let programs = ProgramManager::with_builtin(
            ProgramHandle(1),
            ProgramHandle(2),
            ProgramHandle(3),
            ProgramHandle(4),
            ProgramHandle(5),
        );
        Renderer::new(RecordingDevice::new(), programs, &RenderSettings::default())
    }

    #[test]
    fn new_loads_dummy_texture_and_wireframe_buffer() {
        let r = renderer();
        assert!(r.resources().dummy_texture().is_some());
        assert!(r.resources().wireframe_buffer().is_some());
        assert_eq!(r.device().live_texture_count(), 1);
    }

    #[test]
    fn unknown_geometry_is_rejected() {
        let mut r = renderer();
        let (vertices, indices) = cube_mesh();
        let geometry = r.upload_vertices(&vertices, &indices).expect("cube uploads");
        assert!(r.remove_geometry(geometry));

        let err = r
            .add_object(geometry, Mat4::IDENTITY, Vec4::ONE, &BatchOptions::default())
            .unwrap_err();
        assert_eq!(err, BatchError::UnknownGeometry(geometry));
    }

    #[test]
    fn shutdown_frees_device_objects() {
        let mut r = renderer();
        let (vertices, indices) = cube_mesh();
        let geometry = r.upload_vertices(&vertices, &indices).expect("cube uploads");
        r.add_instances(
            geometry,
            Transforms::Matrices(&[Mat4::IDENTITY; 3]),
            Colors::Rgba(&[Vec4::ONE; 3]),
            &BatchOptions::default(),
        )
        .expect("instances added");
        r.shutdown();
        assert_eq!(r.device().live_buffer_count(), 0);
        assert_eq!(r.device().live_texture_count(), 0);
    }
}
