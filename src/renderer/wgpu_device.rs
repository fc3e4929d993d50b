// renderer/wgpu_device.rs
use super::device::{
    AttribFormat, BufferId, BufferTarget, ClearFlags, CullFace, DeviceCapabilities,
    GraphicsDevice, ProgramHandle, ScalarType, TextureDesc, TextureFilter, TextureId, Uniform,
    UniformValue,
};
use super::uniforms::DrawUniforms;
use glam::Vec4;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use wgpu::util::DeviceExt;

/// Dynamic-offset stride of one `DrawUniforms` block in the uniform buffer.
pub const UNIFORM_STRIDE: u64 = 512;

/// Fixed-function state that selects a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: ProgramHandle,
    pub blend: bool,
    pub depth_write: bool,
    pub cull: Option<CullFace>,
}

impl PipelineKey {
    pub fn cull_mode(&self) -> Option<wgpu::Face> {
        self.cull.map(|face| match face {
            CullFace::Back => wgpu::Face::Back,
            CullFace::Front => wgpu::Face::Front,
        })
    }
}

/// One enabled attribute slot and the buffer region feeding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBinding {
    pub slot: u32,
    pub buffer: BufferId,
    pub format: AttribFormat,
    pub divisor: u32,
}

impl VertexBinding {
    pub fn vertex_format(&self) -> wgpu::VertexFormat {
        match (self.format.ty, self.format.components) {
            (ScalarType::F32, 1) => wgpu::VertexFormat::Float32,
            (ScalarType::F32, 2) => wgpu::VertexFormat::Float32x2,
            (ScalarType::F32, 3) => wgpu::VertexFormat::Float32x3,
            (ScalarType::F32, _) => wgpu::VertexFormat::Float32x4,
            (ScalarType::U8Norm, _) => wgpu::VertexFormat::Unorm8x4,
        }
    }

    pub fn step_mode(&self) -> wgpu::VertexStepMode {
        if self.divisor == 0 {
            wgpu::VertexStepMode::Vertex
        } else {
            wgpu::VertexStepMode::Instance
        }
    }
}

/// Everything needed to replay one draw into a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawPacket {
    pub pipeline: PipelineKey,
    pub vertex_bindings: Vec<VertexBinding>,
    pub index_buffer: BufferId,
    pub texture: Option<TextureId>,
    pub index_count: u32,
    pub instance_count: u32,
    pub uniforms: DrawUniforms,
}

/// Folds bind-then-draw device calls into self-contained draw packets.
pub struct PacketBuilder {
    program: Option<ProgramHandle>,
    enabled: BTreeSet<u32>,
    divisors: HashMap<u32, u32>,
    pointers: BTreeMap<u32, (BufferId, AttribFormat)>,
    array_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
    texture: Option<TextureId>,
    uniforms: DrawUniforms,
    blend: bool,
    depth_write: bool,
    cull: Option<CullFace>,
    packets: Vec<DrawPacket>,
}

impl PacketBuilder {
    pub fn new() -> Self {
        Self {
            program: None,
            enabled: BTreeSet::new(),
            divisors: HashMap::new(),
            pointers: BTreeMap::new(),
            array_buffer: None,
            index_buffer: None,
            texture: None,
            uniforms: DrawUniforms::new(),
            blend: false,
            depth_write: true,
            cull: None,
            packets: Vec::new(),
        }
    }

    pub fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.program = program;
    }

    pub fn set_attrib_enabled(&mut self, slot: u32, enabled: bool) {
        if enabled {
            self.enabled.insert(slot);
        } else {
            self.enabled.remove(&slot);
        }
    }

    pub fn set_attrib_divisor(&mut self, slot: u32, divisor: u32) {
        self.divisors.insert(slot, divisor);
    }

    pub fn bind_vertex_buffer(&mut self, buffer: BufferId) {
        self.array_buffer = Some(buffer);
    }

    pub fn vertex_attrib_pointer(&mut self, slot: u32, format: AttribFormat) {
        match self.array_buffer {
            Some(buffer) => {
                self.pointers.insert(slot, (buffer, format));
            }
            None => log::warn!("Attribute {} pointed with no vertex buffer bound", slot),
        }
    }

    pub fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.index_buffer = Some(buffer);
    }

    pub fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.texture = texture;
    }

    pub fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) {
        self.uniforms.apply(uniform, value);
    }

    pub fn set_blend(&mut self, enabled: bool) {
        self.blend = enabled;
    }

    pub fn set_depth_write(&mut self, enabled: bool) {
        self.depth_write = enabled;
    }

    pub fn set_cull_face(&mut self, face: Option<CullFace>) {
        self.cull = face;
    }

    /// Drops buffers that no longer exist from the attribute table.
    pub fn forget_buffer(&mut self, buffer: BufferId) {
        self.pointers.retain(|_, (bound, _)| *bound != buffer);
        if self.array_buffer == Some(buffer) {
            self.array_buffer = None;
        }
        if self.index_buffer == Some(buffer) {
            self.index_buffer = None;
        }
    }

    pub fn draw(&mut self, index_count: u32, instance_count: u32) {
        let (Some(program), Some(index_buffer)) = (self.program, self.index_buffer) else {
            log::warn!("Draw without a bound program or index buffer ignored");
            return;
        };

        let mut vertex_bindings = Vec::with_capacity(self.enabled.len());
        for &slot in &self.enabled {
            let Some(&(buffer, format)) = self.pointers.get(&slot) else {
                log::warn!("Draw ignored: attribute {} enabled without a pointer", slot);
                return;
            };
            vertex_bindings.push(VertexBinding {
                slot,
                buffer,
                format,
                divisor: self.divisors.get(&slot).copied().unwrap_or(0),
            });
        }

        self.packets.push(DrawPacket {
            pipeline: PipelineKey {
                program,
                blend: self.blend,
                depth_write: self.depth_write,
                cull: self.cull,
            },
            vertex_bindings,
            index_buffer,
            texture: self.texture,
            index_count,
            instance_count,
            uniforms: self.uniforms,
        });
    }

    pub fn packets(&self) -> &[DrawPacket] {
        &self.packets
    }

    pub fn take_packets(&mut self) -> Vec<DrawPacket> {
        std::mem::take(&mut self.packets)
    }
}

impl Default for PacketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Host side of the wgpu backend: shader modules, pipelines and bind groups.
///
/// Group 0 is the uniform buffer returned by [`WgpuDevice::upload_uniforms`]
/// bound with a dynamic offset; group 1 is the texture.
pub trait PipelineProvider {
    fn pipeline(&self, key: &PipelineKey, bindings: &[VertexBinding]) -> Option<&wgpu::RenderPipeline>;
    fn uniform_bind_group(&self) -> &wgpu::BindGroup;
    fn texture_bind_group(&self, texture: Option<TextureId>) -> Option<&wgpu::BindGroup>;
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// `GraphicsDevice` over wgpu. Buffers and textures are real GPU resources;
/// draws are collected as packets and replayed by [`WgpuDevice::encode`].
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    textures: HashMap<TextureId, GpuTexture>,
    next_buffer: u32,
    next_texture: u32,
    builder: PacketBuilder,
    clear_color: wgpu::Color,
    pending_clear: ClearFlags,
    uniform_buffer: Option<wgpu::Buffer>,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            next_buffer: 1,
            next_texture: 1,
            builder: PacketBuilder::new(),
            clear_color: wgpu::Color::BLACK,
            pending_clear: ClearFlags::empty(),
            uniform_buffer: None,
        }
    }

    pub fn buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(&id)
    }

    pub fn texture_view(&self, id: TextureId) -> Option<&wgpu::TextureView> {
        self.textures.get(&id).map(|t| &t.view)
    }

    pub fn sampler(&self, id: TextureId) -> Option<&wgpu::Sampler> {
        self.textures.get(&id).map(|t| &t.sampler)
    }

    pub fn packets(&self) -> &[DrawPacket] {
        self.builder.packets()
    }

    /// Load operations for the next render pass, consuming the pending clear.
    pub fn take_load_ops(&mut self) -> (wgpu::LoadOp<wgpu::Color>, wgpu::LoadOp<f32>) {
        let flags = std::mem::replace(&mut self.pending_clear, ClearFlags::empty());
        let color = if flags.contains(ClearFlags::COLOR) {
            wgpu::LoadOp::Clear(self.clear_color)
        } else {
            wgpu::LoadOp::Load
        };
        let depth = if flags.contains(ClearFlags::DEPTH) {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        };
        (color, depth)
    }

    /// Writes every pending packet's uniforms at `index * UNIFORM_STRIDE`,
    /// growing the buffer when needed. Returns the buffer for bind-group
    /// creation.
    pub fn upload_uniforms(&mut self) -> Option<&wgpu::Buffer> {
        let packets = self.builder.packets();
        if packets.is_empty() {
            return self.uniform_buffer.as_ref();
        }

        let needed = packets.len() as u64 * UNIFORM_STRIDE;
        let too_small = self
            .uniform_buffer
            .as_ref()
            .map_or(true, |buffer| buffer.size() < needed);
        if too_small {
            let size = needed.next_power_of_two();
            log::debug!("Growing draw uniform buffer to {} bytes", size);
            self.uniform_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("DrawUniforms"),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }

        let mut staging = vec![0u8; needed as usize];
        for (i, packet) in packets.iter().enumerate() {
            let start = i * UNIFORM_STRIDE as usize;
            let bytes = bytemuck::bytes_of(&packet.uniforms);
            staging[start..start + bytes.len()].copy_from_slice(bytes);
        }
        let buffer = self.uniform_buffer.as_ref()?;
        self.queue.write_buffer(buffer, 0, &staging);
        Some(buffer)
    }

    /// Replays and drains the collected packets, skipping redundant pipeline,
    /// texture, vertex and index binds. Returns the number of draws issued.
    pub fn encode(&mut self, pass: &mut wgpu::RenderPass<'_>, provider: &dyn PipelineProvider) -> u32 {
        let packets = self.builder.take_packets();
        let mut bound_pipeline: Option<PipelineKey> = None;
        let mut bound_texture: Option<Option<TextureId>> = None;
        let mut bound_slots: HashMap<u32, (BufferId, u32)> = HashMap::new();
        let mut bound_index: Option<BufferId> = None;
        let mut draws = 0;

        'packets: for (i, packet) in packets.iter().enumerate() {
            if bound_pipeline != Some(packet.pipeline) {
                let Some(pipeline) = provider.pipeline(&packet.pipeline, &packet.vertex_bindings) else {
                    log::warn!("No pipeline for {:?}, draw skipped", packet.pipeline);
                    continue;
                };
                pass.set_pipeline(pipeline);
                bound_pipeline = Some(packet.pipeline);
                bound_slots.clear();
            }

            pass.set_bind_group(
                0,
                provider.uniform_bind_group(),
                &[(i as u64 * UNIFORM_STRIDE) as u32],
            );

            if bound_texture != Some(packet.texture) {
                if let Some(group) = provider.texture_bind_group(packet.texture) {
                    pass.set_bind_group(1, group, &[]);
                }
                bound_texture = Some(packet.texture);
            }

            for binding in &packet.vertex_bindings {
                let key = (binding.buffer, binding.format.offset);
                if bound_slots.get(&binding.slot) == Some(&key) {
                    continue;
                }
                let Some(buffer) = self.buffers.get(&binding.buffer) else {
                    log::warn!("Draw skipped: vertex buffer {:?} was deleted", binding.buffer);
                    continue 'packets;
                };
                pass.set_vertex_buffer(binding.slot, buffer.slice(u64::from(binding.format.offset)..));
                bound_slots.insert(binding.slot, key);
            }

            if bound_index != Some(packet.index_buffer) {
                let Some(buffer) = self.buffers.get(&packet.index_buffer) else {
                    log::warn!("Draw skipped: index buffer {:?} was deleted", packet.index_buffer);
                    continue;
                };
                pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint16);
                bound_index = Some(packet.index_buffer);
            }

            pass.draw_indexed(0..packet.index_count, 0, 0..packet.instance_count);
            draws += 1;
        }
        draws
    }
}

impl GraphicsDevice for WgpuDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities { instancing: true }
    }

    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> BufferId {
        let usage = match target {
            BufferTarget::Vertex => {
                wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC
            }
            BufferTarget::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(match target {
                BufferTarget::Vertex => "Batch.VertexBuffer",
                BufferTarget::Index => "Batch.IndexBuffer",
            }),
            contents,
            usage,
        });
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(id, buffer);
        id
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 || data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            log::warn!("Unaligned write of {} bytes at {} ignored", data.len(), offset);
            return;
        }
        match self.buffers.get(&buffer) {
            Some(target) => self.queue.write_buffer(target, offset, data),
            None => log::warn!("Write to unknown buffer {:?}", buffer),
        }
    }

    fn copy_buffer_region(&mut self, buffer: BufferId, src_offset: u64, dst_offset: u64, size: u64) {
        let Some(target) = self.buffers.get(&buffer) else {
            log::warn!("Copy inside unknown buffer {:?}", buffer);
            return;
        };
        // Same-buffer copies are not allowed, so bounce through a scratch buffer.
        let scratch = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Batch.SlotCopy"),
            size,
            usage: wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Batch.SlotCopy"),
            });
        encoder.copy_buffer_to_buffer(target, src_offset, &scratch, 0, size);
        encoder.copy_buffer_to_buffer(&scratch, 0, target, dst_offset, size);
        self.queue.submit(Some(encoder.finish()));
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(gpu) = self.buffers.remove(&buffer) {
            gpu.destroy();
        }
        self.builder.forget_buffer(buffer);
    }

    fn create_texture(&mut self, desc: &TextureDesc, rgba: &[u8]) -> TextureId {
        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Batch.Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * desc.width),
                rows_per_image: Some(desc.height),
            },
            size,
        );

        let filter = match desc.filter {
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
            TextureFilter::Linear => wgpu::FilterMode::Linear,
        };
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            ..Default::default()
        });

        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(
            id,
            GpuTexture {
                _texture: texture,
                view,
                sampler,
            },
        );
        id
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = wgpu::Color {
            r: f64::from(color.x),
            g: f64::from(color.y),
            b: f64::from(color.z),
            a: f64::from(color.w),
        };
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.pending_clear |= flags;
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.builder.use_program(program);
    }

    fn set_attrib_enabled(&mut self, slot: u32, enabled: bool) {
        self.builder.set_attrib_enabled(slot, enabled);
    }

    fn set_attrib_divisor(&mut self, slot: u32, divisor: u32) {
        self.builder.set_attrib_divisor(slot, divisor);
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferId) {
        self.builder.bind_vertex_buffer(buffer);
    }

    fn vertex_attrib_pointer(&mut self, slot: u32, format: AttribFormat) {
        self.builder.vertex_attrib_pointer(slot, format);
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.builder.bind_index_buffer(buffer);
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.builder.bind_texture(texture);
    }

    fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) {
        self.builder.set_uniform(uniform, value);
    }

    fn set_blend(&mut self, enabled: bool) {
        self.builder.set_blend(enabled);
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.builder.set_depth_write(enabled);
    }

    fn set_cull_face(&mut self, face: Option<CullFace>) {
        self.builder.set_cull_face(face);
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.builder.draw(index_count, 1);
    }

    fn draw_indexed_instanced(&mut self, index_count: u32, instance_count: u32) {
        self.builder.draw(index_count, instance_count);
    }
}
