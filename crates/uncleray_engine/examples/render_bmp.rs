//! Progressive render of the demo scene, saved as a BMP.
//!
//! Usage: cargo run --release --example render_bmp -- [width] [height] [frames] [output]

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use uncleray_engine::{CameraSettings, Engine, EngineSettings, Scene, SeedMode, Vec3, BYTES_PER_PIXEL};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let width: u32 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(620);
    let height: u32 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(360);
    let frames: u32 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(8);
    let output = args.next().unwrap_or_else(|| "output.bmp".to_string());

    let settings = EngineSettings {
        seed_mode: SeedMode::FrameNumber,
        ..EngineSettings::default().with_quality(16, 20).with_progressive(frames)
    };
    let camera = CameraSettings::default()
        .with_position(Vec3::new(-2.0, 2.0, 1.0), Vec3::new(0.0, 0.0, -1.0), Vec3::Y)
        .with_lens(40.0, 0.1, None);

    let mut engine = Engine::with_scene(width, height, settings, &camera, Scene::demo())?;

    let start = Instant::now();
    let mut partials = 0;
    while engine.render_with_partials(|_| partials += 1, Duration::from_millis(250)) {
        log::info!("Frame {}/{} done", engine.frame(), frames);
    }
    log::info!(
        "Rendered {} frames in {:?} ({} partial updates)",
        engine.frame(),
        start.elapsed(),
        partials
    );

    save_bmp(&engine, &output).with_context(|| format!("Failed to save {}", output))?;
    log::info!("Saved to {}", output);
    Ok(())
}

/// Swap the engine's B/G/R bytes into an RGB image, keeping row order.
fn save_bmp(engine: &Engine, path: &str) -> Result<()> {
    let rgb: Vec<u8> = engine
        .data()
        .chunks_exact(BYTES_PER_PIXEL)
        .flat_map(|bgr| [bgr[2], bgr[1], bgr[0]])
        .collect();

    let image = image::RgbImage::from_raw(engine.width(), engine.height(), rgb)
        .context("Framebuffer size does not match its dimensions")?;
    image.save(path)?;
    Ok(())
}
