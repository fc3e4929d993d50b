// renderer/mod.rs

pub mod batch;
pub mod device;
pub mod ids;
pub mod primitives;
pub mod program;
pub mod recording;
pub mod registry;
pub mod renderer;
pub mod sequencer;
pub mod uniforms;
pub mod vertex;
pub mod wgpu_device;

pub use batch::{BatchFlags, BatchKind, BatchOptions, Colors, DrawBatch, Transforms};
pub use device::{ClearFlags, GraphicsDevice, ProgramHandle, TextureFilter};
pub use ids::{IdentityAllocator, ObjectId};
pub use primitives::{cube_mesh, quad_mesh};
pub use program::{ProgramId, ProgramLayout, ProgramManager};
pub use recording::RecordingDevice;
pub use registry::{BatchError, BatchRegistry};
pub use renderer::Renderer;
pub use sequencer::{FrameStats, FrameView, RenderStateSequencer, SequencerSettings};
pub use vertex::Vertex;
pub use wgpu_device::WgpuDevice;
