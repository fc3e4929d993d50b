pub mod asset;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod time;

pub use renderer::Renderer;
pub use scene::Camera;
pub use settings::RenderSettings;

pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
