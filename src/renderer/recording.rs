// renderer/recording.rs
use super::device::{
    AttribFormat, BufferId, BufferTarget, ClearFlags, CullFace, DeviceCapabilities,
    GraphicsDevice, ProgramHandle, TextureDesc, TextureId, Uniform, UniformValue,
};
use glam::Vec4;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateBuffer { buffer: BufferId, target: BufferTarget, size: usize },
    WriteBuffer { buffer: BufferId, offset: u64, len: usize },
    CopyBufferRegion { buffer: BufferId, src_offset: u64, dst_offset: u64, size: u64 },
    DeleteBuffer(BufferId),
    CreateTexture { texture: TextureId, desc: TextureDesc },
    DeleteTexture(TextureId),
    SetClearColor(Vec4),
    Clear(ClearFlags),
    UseProgram(Option<ProgramHandle>),
    SetAttribEnabled { slot: u32, enabled: bool },
    SetAttribDivisor { slot: u32, divisor: u32 },
    BindVertexBuffer(BufferId),
    VertexAttribPointer { slot: u32, format: AttribFormat },
    BindIndexBuffer(BufferId),
    BindTexture(Option<TextureId>),
    SetUniform { uniform: Uniform, value: UniformValue },
    SetBlend(bool),
    SetDepthWrite(bool),
    SetCullFace(Option<CullFace>),
    DrawIndexed { index_count: u32 },
    DrawIndexedInstanced { index_count: u32, instance_count: u32 },
}

impl DeviceCommand {
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            DeviceCommand::DrawIndexed { .. } | DeviceCommand::DrawIndexedInstanced { .. }
        )
    }
}

/// Headless device: keeps buffer contents in memory and records every call.
///
/// Used for tests, frame capture and running the renderer without a GPU.
#[derive(Debug)]
pub struct RecordingDevice {
    capabilities: DeviceCapabilities,
    buffers: HashMap<BufferId, Vec<u8>>,
    textures: HashMap<TextureId, TextureDesc>,
    next_buffer: u32,
    next_texture: u32,
    commands: Vec<DeviceCommand>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::with_capabilities(DeviceCapabilities::default())
    }

    pub fn without_instancing() -> Self {
        Self::with_capabilities(DeviceCapabilities { instancing: false })
    }

    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            next_buffer: 1,
            next_texture: 1,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn count(&self, predicate: impl Fn(&DeviceCommand) -> bool) -> usize {
        self.commands.iter().filter(|cmd| predicate(cmd)).count()
    }

    pub fn buffer_data(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Buffer contents decoded as native-endian f32 values.
    pub fn buffer_f32(&self, buffer: BufferId) -> Option<Vec<f32>> {
        self.buffer_data(buffer)
            .map(|bytes| bytemuck::allocation::pod_collect_to_vec::<u8, f32>(bytes))
    }

    pub fn is_live_buffer(&self, buffer: BufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for RecordingDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> BufferId {
        let buffer = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(buffer, contents.to_vec());
        self.commands.push(DeviceCommand::CreateBuffer {
            buffer,
            target,
            size: contents.len(),
        });
        buffer
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        self.commands.push(DeviceCommand::WriteBuffer {
            buffer,
            offset,
            len: data.len(),
        });
        let Some(bytes) = self.buffers.get_mut(&buffer) else {
            log::warn!("Write to unknown buffer {:?}", buffer);
            return;
        };
        let start = offset as usize;
        let end = start + data.len();
        if end > bytes.len() {
            log::warn!(
                "Write of {} bytes at {} overruns buffer {:?} ({} bytes)",
                data.len(),
                offset,
                buffer,
                bytes.len()
            );
            return;
        }
        bytes[start..end].copy_from_slice(data);
    }

    fn copy_buffer_region(&mut self, buffer: BufferId, src_offset: u64, dst_offset: u64, size: u64) {
        self.commands.push(DeviceCommand::CopyBufferRegion {
            buffer,
            src_offset,
            dst_offset,
            size,
        });
        let Some(bytes) = self.buffers.get_mut(&buffer) else {
            log::warn!("Copy inside unknown buffer {:?}", buffer);
            return;
        };
        let (src, dst, size) = (src_offset as usize, dst_offset as usize, size as usize);
        if src.max(dst) + size > bytes.len() {
            log::warn!("Copy region out of bounds in buffer {:?}", buffer);
            return;
        }
        bytes.copy_within(src..src + size, dst);
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        self.commands.push(DeviceCommand::DeleteBuffer(buffer));
    }

    fn create_texture(&mut self, desc: &TextureDesc, _rgba: &[u8]) -> TextureId {
        let texture = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(texture, *desc);
        self.commands.push(DeviceCommand::CreateTexture {
            texture,
            desc: *desc,
        });
        texture
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.commands.push(DeviceCommand::DeleteTexture(texture));
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.commands.push(DeviceCommand::SetClearColor(color));
    }

    fn clear(&mut self, flags: ClearFlags) {
        self.commands.push(DeviceCommand::Clear(flags));
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn set_attrib_enabled(&mut self, slot: u32, enabled: bool) {
        self.commands
            .push(DeviceCommand::SetAttribEnabled { slot, enabled });
    }

    fn set_attrib_divisor(&mut self, slot: u32, divisor: u32) {
        self.commands
            .push(DeviceCommand::SetAttribDivisor { slot, divisor });
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferId) {
        self.commands.push(DeviceCommand::BindVertexBuffer(buffer));
    }

    fn vertex_attrib_pointer(&mut self, slot: u32, format: AttribFormat) {
        self.commands
            .push(DeviceCommand::VertexAttribPointer { slot, format });
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.commands.push(DeviceCommand::BindIndexBuffer(buffer));
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.commands.push(DeviceCommand::BindTexture(texture));
    }

    fn set_uniform(&mut self, uniform: Uniform, value: UniformValue) {
        self.commands
            .push(DeviceCommand::SetUniform { uniform, value });
    }

    fn set_blend(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::SetBlend(enabled));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.commands.push(DeviceCommand::SetDepthWrite(enabled));
    }

    fn set_cull_face(&mut self, face: Option<CullFace>) {
        self.commands.push(DeviceCommand::SetCullFace(face));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.commands.push(DeviceCommand::DrawIndexed { index_count });
    }

    fn draw_indexed_instanced(&mut self, index_count: u32, instance_count: u32) {
        self.commands.push(DeviceCommand::DrawIndexedInstanced {
            index_count,
            instance_count,
        });
    }
}
