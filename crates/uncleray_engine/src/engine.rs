//! The rendering engine: owns the scene, camera and framebuffer, and drives
//! the row-band scheduler on a bounded worker pool.

use crate::band::{generate_bands, render_band, BandJob, StopCheck};
use crate::error::{EngineError, EngineResult};
use crate::framebuffer::Framebuffer;
use crate::renderer::PixelSampler;
use crate::settings::EngineSettings;
use crate::{Camera, CameraSettings, Color, Scene};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a single render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A full frame was rendered (or blended in)
    Rendered,
    /// The progressive frame ceiling is reached; nothing was done
    Exhausted,
    /// Cancelled or timed out before every band finished
    Cancelled,
}

impl FrameStatus {
    pub fn is_rendered(self) -> bool {
        self == FrameStatus::Rendered
    }
}

/// Handle that aborts the engine's current or next render.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Callback handed the live framebuffer while a frame is in flight.
pub type PartialFrameFn<'a> = dyn FnMut(&[u8]) + Send + 'a;

/// Path tracing engine.
pub struct Engine {
    width: u32,
    height: u32,
    settings: EngineSettings,
    camera: Camera,
    scene: Scene,
    /// Linear colors of the last completed frame, in framebuffer row order
    accum: Vec<Color>,
    /// Frame in flight; swapped with `accum` once every band finished
    pending: Vec<Color>,
    live: Framebuffer,
    /// Last completed frame
    published: Vec<u8>,
    pool: rayon::ThreadPool,
    frame: u32,
    started: Instant,
    cancel: CancelToken,
}

impl Engine {
    /// Create an engine with default settings, camera and the demo scene.
    pub fn new(width: u32, height: u32) -> EngineResult<Self> {
        Self::with_scene(
            width,
            height,
            EngineSettings::default(),
            &CameraSettings::default(),
            Scene::demo(),
        )
    }

    /// Create an engine for a custom scene.
    pub fn with_scene(
        width: u32,
        height: u32,
        settings: EngineSettings,
        camera: &CameraSettings,
        scene: Scene,
    ) -> EngineResult<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidDimensions { width, height });
        }
        settings.validate()?;
        camera.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.threads.unwrap_or(0))
            .thread_name(|i| format!("uncleray-band-{}", i))
            .build()?;

        let camera = Camera::new(camera, width as f32 / height as f32);
        let live = Framebuffer::new(width, height);
        let published = live.snapshot();

        log::info!(
            "Engine {}x{} with {} primitives, {} spp, depth {}, {} workers",
            width,
            height,
            scene.len(),
            settings.samples_per_pixel,
            settings.max_depth,
            pool.current_num_threads()
        );

        Ok(Self {
            width,
            height,
            settings,
            camera,
            scene,
            accum: vec![Color::ZERO; width as usize * height as usize],
            pending: vec![Color::ZERO; width as usize * height as usize],
            live,
            published,
            pool,
            frame: 0,
            started: Instant::now(),
            cancel: CancelToken::default(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Number of frames completed since construction or the last reset.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn samples_per_pixel(&self) -> u32 {
        self.settings.samples_per_pixel
    }

    pub fn set_samples_per_pixel(&mut self, samples: u32) -> EngineResult<()> {
        if samples == 0 {
            return Err(EngineError::InvalidSamples(samples));
        }
        self.settings.samples_per_pixel = samples;
        Ok(())
    }

    pub fn max_depth(&self) -> u32 {
        self.settings.max_depth
    }

    /// Set the bounce limit; 0 renders every pixel black.
    pub fn set_max_depth(&mut self, depth: u32) {
        self.settings.max_depth = depth;
    }

    /// Token that cancels the render in flight, or the next one.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Restart progressive accumulation from frame 0.
    pub fn reset_progress(&mut self) {
        self.frame = 0;
        self.accum.fill(Color::ZERO);
        self.live.clear();
        self.live.copy_into(&mut self.published);
    }

    /// Last completed frame: `width * height * 3` bytes, B/G/R, top scanline first.
    pub fn data(&self) -> &[u8] {
        &self.published
    }

    /// Copy of the live framebuffer, possibly mid-frame.
    pub fn snapshot(&self) -> Vec<u8> {
        self.live.snapshot()
    }

    /// Render one frame (or one progressive step).
    ///
    /// Returns false once the progressive frame ceiling is reached or the
    /// frame was cancelled.
    pub fn render(&mut self) -> bool {
        self.render_frame(None).is_rendered()
    }

    /// Like [`Engine::render`], calling `on_partial_frame` with the live
    /// framebuffer every `interval` while bands are in flight.
    pub fn render_with_partials<F>(&mut self, mut on_partial_frame: F, interval: Duration) -> bool
    where
        F: FnMut(&[u8]) + Send,
    {
        let callback: &mut PartialFrameFn<'_> = &mut on_partial_frame;
        self.render_frame(Some((callback, interval))).is_rendered()
    }

    /// Render one frame and report how it ended.
    pub fn render_frame(
        &mut self,
        partials: Option<(&mut PartialFrameFn<'_>, Duration)>,
    ) -> FrameStatus {
        if self.settings.progressive && self.frame >= self.settings.max_frames {
            log::debug!("Frame ceiling {} reached, nothing to do", self.settings.max_frames);
            return FrameStatus::Exhausted;
        }

        let start = Instant::now();
        self.scene.animate(self.started.elapsed().as_secs_f32());

        let bands = generate_bands(self.height, self.settings.chunk_height);
        log::debug!(
            "Frame {}: dispatching {} bands of {} rows",
            self.frame,
            bands.len(),
            self.settings.chunk_height
        );

        let settings = &self.settings;
        let job = BandJob {
            camera: &self.camera,
            world: &self.scene,
            sampler: PixelSampler {
                width: self.width,
                height: self.height,
                samples_per_pixel: settings.samples_per_pixel,
                max_depth: settings.max_depth,
                jitter: settings.jitter,
                sky: &settings.sky,
            },
            seed: settings.seed,
            seed_mode: settings.seed_mode,
            frame: self.frame,
            progressive: settings.progressive,
            stop: StopCheck {
                cancelled: &self.cancel.0,
                deadline: settings
                    .time_limit_ms
                    .map(|ms| start + Duration::from_millis(ms)),
            },
        };
        let band_pixels = settings.chunk_height as usize * self.width as usize;
        let accum = &self.accum;
        let pending = &mut self.pending;
        let live = &self.live;
        let pool = &self.pool;

        let unfinished = thread::scope(|s| {
            let (done_tx, done_rx) = mpsc::channel::<()>();

            if let Some((on_partial_frame, interval)) = partials {
                s.spawn(move || {
                    let mut buffer = Vec::with_capacity(live.len());
                    loop {
                        match done_rx.recv_timeout(interval) {
                            Err(RecvTimeoutError::Timeout) => {
                                live.copy_into(&mut buffer);
                                on_partial_frame(&buffer);
                            }
                            _ => break,
                        }
                    }
                });
            }

            let unfinished = pool.install(|| {
                bands
                    .par_iter()
                    .zip(accum.par_chunks(band_pixels))
                    .zip(pending.par_chunks_mut(band_pixels))
                    .zip(live.par_bands(settings.chunk_height))
                    .map(|(((band, previous), out), bytes)| {
                        render_band(&job, band, previous, out, bytes)
                    })
                    .filter(|finished| !finished)
                    .count()
            });

            // Disconnecting wakes the poller so the scope can join it
            drop(done_tx);
            unfinished
        });

        if unfinished > 0 {
            log::warn!(
                "Frame {} stopped with {} of {} bands unfinished",
                self.frame,
                unfinished,
                bands.len()
            );
            // Finished bands only touched the pending buffer; roll the live bytes back too
            self.live.load(&self.published);
            self.cancel.reset();
            return FrameStatus::Cancelled;
        }

        std::mem::swap(&mut self.accum, &mut self.pending);
        self.frame += 1;
        self.live.copy_into(&mut self.published);
        log::debug!("Frame {} rendered in {:?}", self.frame, start.elapsed());
        FrameStatus::Rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{color_to_bgr, Sky};
    use crate::{Material, Ray, Sphere, Vec3};
    use std::sync::Mutex;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn pixel(engine: &Engine, x: u32, y: u32) -> [u8; 3] {
        let offset = engine.live.offset(x, y);
        let data = engine.data();
        [data[offset], data[offset + 1], data[offset + 2]]
    }

    fn sharp(samples: u32, depth: u32) -> EngineSettings {
        EngineSettings {
            jitter: false,
            ..EngineSettings::default().with_quality(samples, depth)
        }
    }

    fn matte_ball() -> Scene {
        let mut scene = Scene::new();
        scene.add(Sphere::new(
            Vec3::new(0.0, 0.0, -1.0),
            0.5,
            Arc::new(Material::matte(Color::new(0.8, 0.2, 0.2))),
        ));
        scene
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(matches!(
            Engine::new(0, 10),
            Err(EngineError::InvalidDimensions { width: 0, height: 10 })
        ));
        assert!(matches!(
            Engine::with_scene(4, 4, sharp(0, 5), &CameraSettings::default(), Scene::new()),
            Err(EngineError::InvalidSamples(0))
        ));

        let mut engine = Engine::new(4, 4).unwrap();
        assert!(engine.set_samples_per_pixel(0).is_err());
        assert_eq!(engine.samples_per_pixel(), 15);
    }

    #[test]
    fn test_empty_scene_sky_by_hand() {
        init_logger();
        // Pinhole at the origin looking down -Z with a 90 degree field of view:
        // the four unjittered primary rays are (+-1, +-1, -1).
        let mut engine =
            Engine::with_scene(2, 2, sharp(1, 50), &CameraSettings::default(), Scene::new())
                .unwrap();
        assert!(engine.render());

        // Top row: t = 0.5 * (1 + 1/sqrt(3)) = 0.7887
        // color = (0.6057, 0.7634, 1.0), gamma -> (0.7782, 0.8737, 1.0)
        let top = [255, 222, 198];
        // Bottom row: t = 0.2113, color = (0.8943, 0.9366, 1.0)
        // gamma -> (0.9457, 0.9678, 1.0)
        let bottom = [255, 246, 241];

        assert_eq!(engine.data(), &[top, top, bottom, bottom].concat()[..]);
    }

    #[test]
    fn test_matte_ball_center_and_corners() {
        init_logger();
        let mut engine =
            Engine::with_scene(15, 15, sharp(8, 10), &CameraSettings::default(), matte_ball())
                .unwrap();
        assert!(engine.render());

        let sky = Sky::default();
        let background = |x: f32, y: f32| {
            color_to_bgr(sky.color(&Ray::new(Vec3::ZERO, Vec3::new(x, y, -1.0))))
        };

        // Centre ray looks straight at the ball
        let center = pixel(&engine, 7, 7);
        assert_ne!(center, background(0.0, 0.0));
        // A reddish albedo keeps the blue channel well below the sky's
        assert!(center[0] < 200);

        assert_eq!(pixel(&engine, 0, 0), background(-1.0, -1.0));
        assert_eq!(pixel(&engine, 14, 0), background(1.0, -1.0));
        assert_eq!(pixel(&engine, 0, 14), background(-1.0, 1.0));
        assert_eq!(pixel(&engine, 14, 14), background(1.0, 1.0));
    }

    #[test]
    fn test_zero_depth_is_black() {
        let mut engine = Engine::new(12, 9).unwrap();
        engine.set_max_depth(0);
        assert!(engine.render());
        assert!(engine.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_band_seeding_is_reproducible() {
        let settings = EngineSettings {
            chunk_height: 3,
            threads: Some(3),
            ..EngineSettings::default().with_quality(4, 8)
        };
        let render = |settings: EngineSettings| {
            let mut engine =
                Engine::with_scene(16, 10, settings, &CameraSettings::default(), matte_ball())
                    .unwrap();
            assert!(engine.render());
            engine.data().to_vec()
        };

        let single = EngineSettings {
            threads: Some(1),
            ..settings.clone()
        };
        assert_eq!(render(settings), render(single));
    }

    #[test]
    fn test_progressive_ceiling() {
        let settings = EngineSettings::default()
            .with_quality(1, 4)
            .with_progressive(2);
        let mut engine =
            Engine::with_scene(8, 8, settings, &CameraSettings::default(), matte_ball()).unwrap();

        assert!(engine.render());
        assert!(engine.render());
        assert_eq!(engine.frame(), 2);
        assert!(!engine.render());
        assert_eq!(engine.render_frame(None), FrameStatus::Exhausted);

        engine.reset_progress();
        assert_eq!(engine.frame(), 0);
        assert!(engine.data().iter().all(|&b| b == 0));
        assert!(engine.render());
    }

    #[test]
    fn test_progressive_blends_frames() {
        let settings = EngineSettings {
            seed_mode: crate::SeedMode::FrameNumber,
            ..EngineSettings::default().with_quality(1, 4).with_progressive(10)
        };
        let mut engine =
            Engine::with_scene(6, 6, settings, &CameraSettings::default(), matte_ball()).unwrap();

        assert!(engine.render());
        let first = engine.accum.clone();
        assert!(engine.render());
        let blended = engine.accum.clone();
        assert_eq!(engine.frame(), 2);

        // Frame 2 is the mean of two samples, so the second sample is
        // recoverable and must itself be a plausible radiance
        for (a, b) in first.iter().zip(&blended) {
            let second = 2.0 * *b - *a;
            assert!(second.min_element() > -1e-4);
            assert!(second.max_element() < 1.0 + 1e-4);
        }
        assert_ne!(first, blended);
    }

    #[test]
    fn test_progressive_default_seeding_refines() {
        let settings = EngineSettings::default()
            .with_quality(1, 4)
            .with_progressive(10);
        assert_eq!(settings.seed_mode, crate::SeedMode::BandRow);
        let mut engine =
            Engine::with_scene(6, 6, settings, &CameraSettings::default(), matte_ball()).unwrap();

        let mut previous = Vec::new();
        for _ in 0..3 {
            assert!(engine.render());
            let current = engine.accum.clone();
            assert_ne!(current, previous);
            previous = current;
        }
    }

    #[test]
    fn test_cancelled_progressive_frame_keeps_running_mean() {
        let settings = EngineSettings {
            seed_mode: crate::SeedMode::FrameNumber,
            chunk_height: 1,
            threads: Some(1),
            ..EngineSettings::default().with_quality(4, 8).with_progressive(10)
        };
        let build = || {
            Engine::with_scene(
                96,
                96,
                settings.clone(),
                &CameraSettings::default(),
                matte_ball(),
            )
            .unwrap()
        };

        let mut clean = build();
        assert!(clean.render());
        assert!(clean.render());

        let mut interrupted = build();
        assert!(interrupted.render());
        let committed = interrupted.accum.clone();
        let published = interrupted.data().to_vec();

        let token = interrupted.cancel_token();
        let status = {
            let mut on_partial = |_: &[u8]| token.cancel();
            let callback: &mut PartialFrameFn<'_> = &mut on_partial;
            interrupted.render_frame(Some((callback, Duration::from_millis(1))))
        };
        if status == FrameStatus::Cancelled {
            assert_eq!(interrupted.frame(), 1);
            assert_eq!(interrupted.accum, committed);
            assert_eq!(interrupted.snapshot(), published);
            assert!(interrupted.render());
        }

        assert_eq!(interrupted.frame(), 2);
        assert_eq!(interrupted.accum, clean.accum);
        assert_eq!(interrupted.data(), clean.data());
    }

    #[test]
    fn test_converged_sky_survives_progressive_blend() {
        // No randomness reaches an empty unjittered scene, so every frame is identical
        let settings = EngineSettings {
            jitter: false,
            ..EngineSettings::default().with_quality(1, 3).with_progressive(5)
        };
        let mut engine =
            Engine::with_scene(4, 4, settings, &CameraSettings::default(), Scene::new()).unwrap();

        assert!(engine.render());
        let first = engine.data().to_vec();
        for _ in 0..4 {
            assert!(engine.render());
            assert_eq!(engine.data(), &first[..]);
        }
    }

    #[test]
    fn test_cancel_before_render() {
        let mut engine = Engine::new(8, 8).unwrap();
        let token = engine.cancel_token();
        token.cancel();

        assert_eq!(engine.render_frame(None), FrameStatus::Cancelled);
        assert_eq!(engine.frame(), 0);
        // The token is consumed by the cancelled frame
        assert!(!token.is_cancelled());
        assert!(engine.render());
        assert_eq!(engine.frame(), 1);
    }

    #[test]
    fn test_time_limit_cancels() {
        let settings = EngineSettings {
            time_limit_ms: Some(0),
            ..EngineSettings::default().with_quality(1, 2)
        };
        let mut engine =
            Engine::with_scene(8, 8, settings, &CameraSettings::default(), matte_ball()).unwrap();

        assert!(!engine.render());
        assert_eq!(engine.frame(), 0);
    }

    #[test]
    fn test_partials_see_whole_buffer() {
        init_logger();
        let seen = Mutex::new(Vec::new());
        let mut engine = Engine::with_scene(
            32,
            32,
            EngineSettings::default().with_quality(8, 8),
            &CameraSettings::default(),
            matte_ball(),
        )
        .unwrap();

        let rendered = engine.render_with_partials(
            |frame| seen.lock().unwrap().push(frame.len()),
            Duration::from_millis(1),
        );

        assert!(rendered);
        assert!(seen.lock().unwrap().iter().all(|&len| len == 32 * 32 * 3));
        assert_eq!(engine.snapshot(), engine.data());
    }

    #[test]
    fn test_demo_scene_pulses_before_dispatch() {
        let mut engine = Engine::new(4, 4).unwrap();
        let pulse = *engine.scene().pulse().unwrap();
        assert!(engine.render());

        let radius = engine.scene().objects()[pulse.primitive].radius();
        assert!((radius - pulse.base_radius).abs() <= pulse.amplitude + 1e-6);
    }
}
