use glam::{Mat4, Vec2, Vec3, Vec4};
use wgpu_batch::renderer::{
    cube_mesh, quad_mesh, BatchOptions, Colors, ProgramHandle, ProgramManager, RecordingDevice,
    Renderer, Transforms,
};
use wgpu_batch::scene::{Camera, PointerButton, WheelDelta};
use wgpu_batch::time::FrameClock;
use wgpu_batch::RenderSettings;

const GRID: i32 = 10;
const FRAMES: u32 = 120;

fn grid_instances() -> (Vec<Mat4>, Vec<Vec4>) {
    let mut transforms = Vec::new();
    let mut colors = Vec::new();
    for x in 0..GRID {
        for z in 0..GRID {
            let offset = Vec3::new(x as f32 - GRID as f32 / 2.0, 0.0, z as f32 - GRID as f32 / 2.0);
            transforms.push(Mat4::from_translation(offset * 1.5));
            colors.push(Vec4::new(x as f32 / GRID as f32, 0.5, z as f32 / GRID as f32, 1.0));
        }
    }
    (transforms, colors)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = RenderSettings::load();
    let programs = ProgramManager::with_builtin(
        ProgramHandle(1),
        ProgramHandle(2),
        ProgramHandle(3),
        ProgramHandle(4),
        ProgramHandle(5),
    );
    let mut renderer = Renderer::new(RecordingDevice::new(), programs, &settings);
    let mut camera = Camera::new(&settings.camera);
    camera.resize(settings.resolution.width, settings.resolution.height);
    renderer.set_viewport(settings.resolution.width, settings.resolution.height);

    let (vertices, indices) = cube_mesh();
    let cube = renderer.upload_vertices(&vertices, &indices)?;
    let (vertices, indices) = quad_mesh();
    let quad = renderer.upload_vertices(&vertices, &indices)?;
    renderer.set_texture(
        "spark",
        2,
        2,
        &[255, 255, 255, 255, 255, 200, 0, 128, 255, 200, 0, 128, 255, 255, 255, 255],
        wgpu_batch::renderer::TextureFilter::Linear,
    )?;

    let (transforms, colors) = grid_instances();
    let ids = renderer.add_instances(
        cube,
        Transforms::Matrices(&transforms),
        Colors::Rgba(&colors),
        &BatchOptions::default().with_cull_face(false),
    )?;
    renderer.add_object(
        cube,
        Mat4::from_scale(Vec3::new(20.0, 0.1, 20.0)),
        Vec4::new(0.3, 0.3, 0.3, 1.0),
        &BatchOptions::default().with_transform(Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0))),
    )?;
    renderer.add_layer(1);
    let sparks: Vec<Vec3> = (0..16)
        .map(|i| Vec3::new((i as f32 * 0.4).sin() * 6.0, 3.0, (i as f32 * 0.4).cos() * 6.0))
        .collect();
    renderer.add_point_mesh(
        quad,
        &sparks,
        Colors::Rgba(&vec![Vec4::new(1.0, 0.8, 0.2, 0.6); sparks.len()]),
        &BatchOptions::default()
            .with_texture("spark")
            .with_billboard(Some(Vec2::splat(0.5)), None)
            .on_layer(1),
    )?;
    renderer.sort_by_program(0);

    // Orbit with a drag, then zoom in.
    camera.pointer_down(Vec2::new(640.0, 360.0), PointerButton::Primary);
    camera.pointer_move(Vec2::new(700.0, 340.0));
    camera.pointer_up();
    camera.scroll(WheelDelta::Lines(-3.0));

    let mut clock = FrameClock::new();
    for frame in 0..FRAMES {
        // Headless frames run back to back; pretend they are 60 Hz.
        let dt = clock.tick().max(1.0 / 60.0);
        let update = camera.frame(dt);
        renderer.apply_camera(&update);

        if frame == FRAMES / 2 {
            if let Some(&first) = ids.first() {
                renderer.update_color(first, Vec4::new(1.0, 0.0, 0.0, 0.5), false);
            }
            if let Some(&last) = ids.last() {
                renderer.remove_object(last);
            }
        }

        let stats = renderer.draw();
        if frame % 30 == 0 {
            log::info!(
                "frame {}: {} draws, {} binds, {} state changes",
                frame,
                stats.draw_calls,
                stats.total_binds(),
                stats.state_changes
            );
        }
        renderer.device_mut().clear_commands();
    }

    renderer.shutdown();
    log::info!("Demo finished");
    Ok(())
}

fn main() {
    wgpu_batch::init_logging();
    if let Err(err) = run() {
        eprintln!("Application error: {err}");
    }
}
