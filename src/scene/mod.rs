// scene/mod.rs

pub mod camera;
pub mod manipulator;
pub mod state;

pub use camera::{Camera, FrameUpdate, ManipulatorKind, PointerButton, WheelDelta};
pub use manipulator::{Examine, Fly, Manipulator, OrthoExamine};
pub use state::{CameraState, MoveFlags};
