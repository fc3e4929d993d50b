// renderer/sequencer.rs
use super::batch::{BatchFlags, BatchKind, DrawBatch, COLOR_STRIDE, TRANSFORM_STRIDE, TRANSLATION_STRIDE};
use super::device::{
    AttribFormat, BufferId, ClearFlags, CullFace, GraphicsDevice, ProgramHandle, TextureId,
    Uniform, UniformValue,
};
use super::ids::ObjectId;
use super::program::{ProgramLayout, ProgramManager};
use super::registry::BatchRegistry;
use super::uniforms::FrameMatrices;
use crate::asset::{Geometry, ResourceManager};
use glam::{Mat4, Vec2, Vec3};
use std::collections::HashMap;

/// Counters for one `draw` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub program_binds: u32,
    pub buffer_binds: u32,
    pub texture_binds: u32,
    /// Blend, depth-write and cull toggles.
    pub state_changes: u32,
    pub draw_calls: u32,
    pub instances: u32,
    pub skipped: u32,
}

impl FrameStats {
    pub fn total_binds(&self) -> u32 {
        self.program_binds + self.buffer_binds + self.texture_binds
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequencerSettings {
    pub clear: ClearFlags,
    /// Forces blending on or off for every batch.
    pub blend_override: Option<bool>,
    /// Eye-space light position pushed on every program bind.
    pub light_position: Vec3,
    /// Global scale applied to every model transform.
    pub scale: Vec3,
    /// Global rotation applied after the scaled model transform.
    pub rotation: Mat4,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            clear: ClearFlags::COLOR | ClearFlags::DEPTH,
            blend_override: None,
            light_position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Mat4::IDENTITY,
        }
    }
}

/// Camera input for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameView {
    pub view: Mat4,
    pub projection: Mat4,
    pub screen: Vec2,
}

/// What is bound right now. Reset every frame.
#[derive(Default)]
struct Bindings {
    program: Option<ProgramHandle>,
    vertex: Option<BufferId>,
    barycentric: Option<BufferId>,
    instance_transforms: Option<BufferId>,
    instance_colors: Option<BufferId>,
    index: Option<BufferId>,
    texture: Option<Option<TextureId>>,
    use_texture: Option<bool>,
    unlit: bool,
    billboard: bool,
    billboard_params: Option<(Vec2, f32)>,
    blend: bool,
    depth_write: bool,
    cull: Option<CullFace>,
}

impl Bindings {
    fn new() -> Self {
        Self {
            depth_write: true,
            ..Self::default()
        }
    }

    /// Attribute pointers and per-program uniforms do not survive a program
    /// switch. The bound texture does.
    fn program_changed(&mut self, program: ProgramHandle) {
        self.program = Some(program);
        self.vertex = None;
        self.barycentric = None;
        self.instance_transforms = None;
        self.instance_colors = None;
        self.use_texture = None;
        self.billboard_params = None;
    }
}

/// Turns the registry's batches into a minimal command sequence.
///
/// Attribute enable state and divisors are cached across frames because the
/// device keeps them; everything else is tracked per frame.
pub struct RenderStateSequencer {
    settings: SequencerSettings,
    enabled: Vec<u32>,
    divisors: HashMap<u32, u32>,
}

impl RenderStateSequencer {
    pub fn new(settings: SequencerSettings) -> Self {
        Self {
            settings,
            enabled: Vec::new(),
            divisors: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &SequencerSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SequencerSettings {
        &mut self.settings
    }

    /// Forget cached device state, e.g. after the device was recreated.
    pub fn reset_device_state(&mut self) {
        self.enabled.clear();
        self.divisors.clear();
    }

    pub fn draw<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        registry: &BatchRegistry,
        resources: &ResourceManager,
        programs: &ProgramManager,
        frame: &FrameView,
    ) -> FrameStats {
        let mut stats = FrameStats::default();

        if !self.settings.clear.is_empty() {
            device.clear(self.settings.clear);
        }
        if !registry.heads().any(|(_, batch)| batch.is_visible()) {
            return stats;
        }

        let mut bound = Bindings::new();
        for (id, batch) in registry.heads() {
            if !batch.is_visible() {
                continue;
            }
            let Some((program, geometry, texture)) = resolve(id, batch, resources, programs) else {
                stats.skipped += 1;
                continue;
            };

            if bound.program != Some(program.handle) {
                self.enable_attribs(device, program);
                device.use_program(Some(program.handle));
                bound.program_changed(program.handle);
                stats.program_binds += 1;

                bound.unlit = batch.flags.contains(BatchFlags::UNLIT);
                bound.billboard = batch.flags.contains(BatchFlags::BILLBOARD);
                push(device, program, Uniform::LightPosition, UniformValue::Vec3(self.settings.light_position));
                push(device, program, Uniform::Unlit, bound.unlit.into());
                push(device, program, Uniform::IsBillboard, bound.billboard.into());
                push(device, program, Uniform::Screen, UniformValue::Vec2(frame.screen));
            }

            let unlit = batch.flags.contains(BatchFlags::UNLIT);
            if unlit != bound.unlit {
                bound.unlit = unlit;
                push(device, program, Uniform::Unlit, unlit.into());
            }
            let billboard = batch.flags.contains(BatchFlags::BILLBOARD);
            if billboard != bound.billboard {
                bound.billboard = billboard;
                push(device, program, Uniform::IsBillboard, billboard.into());
            }
            if billboard {
                let params = (
                    batch.billboard_size.unwrap_or(Vec2::ONE),
                    batch.billboard_rotation.unwrap_or(0.0),
                );
                if bound.billboard_params != Some(params) {
                    bound.billboard_params = Some(params);
                    push(device, program, Uniform::BillboardSize, UniformValue::Vec2(params.0));
                    push(device, program, Uniform::BillboardRotation, UniformValue::F32(params.1));
                }
            }

            let model = self.settings.rotation * (batch.transform * Mat4::from_scale(self.settings.scale));
            let matrices = FrameMatrices::compute(model, frame.view, frame.projection);
            push(device, program, Uniform::Projection, UniformValue::Mat4(frame.projection));
            push(device, program, Uniform::ModelView, UniformValue::Mat4(matrices.model_view));
            push(device, program, Uniform::ModelViewProjection, UniformValue::Mat4(matrices.model_view_projection));
            push(device, program, Uniform::NormalMatrix, UniformValue::Mat4(matrices.normal));

            if bound.vertex != Some(geometry.vertex_buffer) {
                device.bind_vertex_buffer(geometry.vertex_buffer);
                let layout = geometry.layout;
                for (slot, format) in [
                    (program.position, layout.position),
                    (program.normal, layout.normal),
                    (program.texcoord, layout.texcoord),
                ] {
                    if let Some(slot) = slot {
                        device.vertex_attrib_pointer(slot, format);
                    }
                }
                bound.vertex = Some(geometry.vertex_buffer);
                stats.buffer_binds += 1;
            }

            if batch.is_wireframe() {
                if let (Some(slot), Some(buffer)) = (program.barycentric, resources.wireframe_buffer()) {
                    if bound.barycentric != Some(buffer) {
                        device.bind_vertex_buffer(buffer);
                        device.vertex_attrib_pointer(slot, AttribFormat::f32(3, 12, 0));
                        bound.barycentric = Some(buffer);
                        stats.buffer_binds += 1;
                    }
                }
            }

            match &batch.kind {
                BatchKind::Single { color } => {
                    push(device, program, Uniform::Color, UniformValue::Vec4(*color));
                }
                BatchKind::Instanced(buffers) => {
                    if bound.instance_transforms != Some(buffers.transforms) {
                        device.bind_vertex_buffer(buffers.transforms);
                        for (column, slot) in program.model_attribs().into_iter().enumerate() {
                            let offset = column as u32 * 16;
                            device.vertex_attrib_pointer(slot, AttribFormat::f32(4, TRANSFORM_STRIDE as u32, offset));
                            self.set_divisor(device, slot, 1);
                        }
                        bound.instance_transforms = Some(buffers.transforms);
                        stats.buffer_binds += 1;
                    }
                    self.bind_instance_colors(device, program, buffers.colors, &mut bound, &mut stats);
                }
                BatchKind::PointMesh(buffers) => {
                    if bound.instance_transforms != Some(buffers.transforms) {
                        device.bind_vertex_buffer(buffers.transforms);
                        if let Some(slot) = program.translation {
                            device.vertex_attrib_pointer(slot, AttribFormat::f32(3, TRANSLATION_STRIDE as u32, 0));
                            self.set_divisor(device, slot, 1);
                        }
                        bound.instance_transforms = Some(buffers.transforms);
                        stats.buffer_binds += 1;
                    }
                    self.bind_instance_colors(device, program, buffers.colors, &mut bound, &mut stats);
                }
            }

            if bound.index != Some(geometry.index_buffer) {
                device.bind_index_buffer(geometry.index_buffer);
                bound.index = Some(geometry.index_buffer);
                stats.buffer_binds += 1;
            }

            if bound.texture != Some(texture) {
                device.bind_texture(texture);
                bound.texture = Some(texture);
                stats.texture_binds += 1;
            }
            let use_texture = batch.texture.is_some();
            if bound.use_texture != Some(use_texture) {
                push(device, program, Uniform::UseTexture, use_texture.into());
                bound.use_texture = Some(use_texture);
            }

            let blend = self
                .settings
                .blend_override
                .unwrap_or_else(|| batch.flags.intersects(BatchFlags::BLENDING | BatchFlags::WIREFRAME));
            if blend != bound.blend {
                device.set_blend(blend);
                bound.blend = blend;
                stats.state_changes += 1;
            }

            let cull = batch.flags.contains(BatchFlags::CULL_FACE).then(|| {
                if batch.flags.contains(BatchFlags::INVERSE_CULL_FACE) {
                    CullFace::Front
                } else {
                    CullFace::Back
                }
            });
            if cull != bound.cull {
                device.set_cull_face(cull);
                bound.cull = cull;
                stats.state_changes += 1;
            }

            let depth_write = !batch.flags.contains(BatchFlags::DEPTH_MASK);
            if depth_write != bound.depth_write {
                device.set_depth_write(depth_write);
                bound.depth_write = depth_write;
                stats.state_changes += 1;
            }

            match batch.kind.instances() {
                Some(buffers) => {
                    device.draw_indexed_instanced(geometry.index_count, buffers.instance_count);
                    stats.instances += buffers.instance_count;
                }
                None => {
                    device.draw_indexed(geometry.index_count);
                    stats.instances += 1;
                }
            }
            stats.draw_calls += 1;
        }

        if bound.blend {
            device.set_blend(false);
        }
        if !bound.depth_write {
            device.set_depth_write(true);
        }
        if bound.cull.is_some() {
            device.set_cull_face(None);
        }
        device.bind_texture(None);
        device.use_program(None);
        for slot in std::mem::take(&mut self.enabled) {
            device.set_attrib_enabled(slot, false);
        }

        stats
    }

    fn bind_instance_colors<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        program: &ProgramLayout,
        colors: BufferId,
        bound: &mut Bindings,
        stats: &mut FrameStats,
    ) {
        if bound.instance_colors == Some(colors) {
            return;
        }
        device.bind_vertex_buffer(colors);
        if let Some(slot) = program.color_instance {
            device.vertex_attrib_pointer(slot, AttribFormat::unorm8(4, COLOR_STRIDE as u32, 0));
            self.set_divisor(device, slot, 1);
        }
        bound.instance_colors = Some(colors);
        stats.buffer_binds += 1;
    }

    /// Enables exactly the program's slots. Divisors of slots the program
    /// does not read per instance go back to 0.
    fn enable_attribs<D: GraphicsDevice>(&mut self, device: &mut D, program: &ProgramLayout) {
        let wanted = program.attribs();
        for &slot in self.enabled.iter().filter(|slot| !wanted.contains(*slot)) {
            device.set_attrib_enabled(slot, false);
        }
        for &slot in wanted.iter().filter(|slot| !self.enabled.contains(*slot)) {
            device.set_attrib_enabled(slot, true);
        }
        self.enabled = wanted;

        let per_instance: Vec<u32> = program
            .model_attribs()
            .into_iter()
            .chain(program.translation)
            .chain(program.color_instance)
            .collect();
        let stale: Vec<u32> = self
            .divisors
            .iter()
            .filter(|&(slot, divisor)| *divisor != 0 && !per_instance.contains(slot))
            .map(|(slot, _)| *slot)
            .collect();
        for slot in stale {
            self.set_divisor(device, slot, 0);
        }
    }

    fn set_divisor<D: GraphicsDevice>(&mut self, device: &mut D, slot: u32, divisor: u32) {
        if self.divisors.get(&slot).copied().unwrap_or(0) != divisor {
            device.set_attrib_divisor(slot, divisor);
            self.divisors.insert(slot, divisor);
        }
    }
}

impl Default for RenderStateSequencer {
    fn default() -> Self {
        Self::new(SequencerSettings::default())
    }
}

fn push<D: GraphicsDevice>(device: &mut D, program: &ProgramLayout, uniform: Uniform, value: UniformValue) {
    if program.uniforms.declares(uniform) {
        device.set_uniform(uniform, value);
    }
}

/// Looks up everything a batch needs. Logs and returns `None` when any
/// reference is dangling.
fn resolve<'a>(
    id: ObjectId,
    batch: &DrawBatch,
    resources: &'a ResourceManager,
    programs: &'a ProgramManager,
) -> Option<(&'a ProgramLayout, &'a Geometry, Option<TextureId>)> {
    let program_id = batch.program();
    let Some(program) = programs.get(&program_id) else {
        log::warn!("Skipping batch {}: unknown program '{}'", id, program_id);
        return None;
    };

    let fits = match batch.kind {
        BatchKind::Single { .. } => true,
        BatchKind::Instanced(_) => program.model.is_some(),
        BatchKind::PointMesh(_) => program.translation.is_some(),
    };
    if !fits {
        log::warn!(
            "Skipping batch {}: program '{}' has no per-instance inputs",
            id,
            program_id
        );
        return None;
    }

    let Some(geometry) = resources.geometry(batch.geometry) else {
        log::warn!("Skipping batch {} with invalid geometry handle", id);
        return None;
    };

    let texture = match &batch.texture {
        Some(name) => match resources.texture(name) {
            Some(texture) => Some(texture),
            None => {
                log::warn!("Skipping batch {}: texture '{}' not loaded", id, name);
                return None;
            }
        },
        None => resources.dummy_texture(),
    };

    Some((program, geometry, texture))
}
