//! # Mix Demo
//!
//! Headless cross-fade between orbiting cameras.
//!
//! Three cameras orbit the origin. A mixer built from a TOML preset blends
//! them; over the run the weight moves from the near orbit to the far one,
//! and halfway through the overview camera is despawned so the mixer has to
//! prune it. The dominant source is logged every `--report-every` frames.

use std::path::PathBuf;

use clap::Parser;
use mixcam::{CameraSource, CameraState, MixerConfig, MixingCamera, SourceRef, parse_config};
use mixcam_core::math::world_up;
use mixcam_demos::orbit::OrbitCamera;
use mixcam_demos::scene::Scene;

const DEFAULT_PRESET: &str = include_str!("../../presets/crossfade.toml");

/// Lowest height the blended camera may reach.
const MIN_HEIGHT: f32 = 0.5;

/// Weighted camera mixer demo.
#[derive(Parser, Debug)]
#[command(name = "mix_demo", about = "Cross-fade orbiting cameras through a mixer", version)]
struct Args {
    /// Mixer preset (TOML). Uses the built-in cross-fade preset if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to simulate.
    #[arg(long, default_value = "600")]
    frames: u64,

    /// Seconds per frame.
    #[arg(long, default_value = "0.016666668")]
    delta_time: f32,

    /// Log the mix every N frames.
    #[arg(long, default_value = "60")]
    report_every: u64,
}

fn load_preset(args: &Args) -> MixerConfig {
    match &args.config {
        Some(path) => mixcam::load_or_default(path),
        None => parse_config(DEFAULT_PRESET).unwrap_or_else(|e| {
            log::error!("Built-in preset is invalid: {e}");
            MixerConfig::default()
        }),
    }
}

fn setup_scene(scene: &Scene) {
    scene.spawn(
        OrbitCamera::new("orbit_near")
            .with_distance(6.0)
            .with_elevation(0.3)
            .with_angular_speed(0.6),
    );
    scene.spawn(
        OrbitCamera::new("orbit_far")
            .with_distance(18.0)
            .with_elevation(0.5)
            .with_angular_speed(-0.2)
            .with_fov_y(0.7),
    );
    scene.spawn(
        OrbitCamera::new("overview")
            .with_distance(30.0)
            .with_elevation(1.2)
            .with_angular_speed(0.0),
    );
}

fn find(scene: &Scene, name: &str) -> Option<SourceRef<CameraState>> {
    scene
        .cameras()
        .into_iter()
        .find(|camera| camera.name() == name)
        .map(|camera| camera as SourceRef<CameraState>)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    mixcam_core::profiling::init();

    let args = Args::parse();
    log::info!("mixcam demo v{}", mixcam_demos::VERSION);

    let scene = Scene::new();
    setup_scene(&scene);

    let config = load_preset(&args);
    let mixer = MixingCamera::from_config(&config, scene.provider());
    mixer.add_finalize_hook(|_, _, state: &mut CameraState, _| {
        state.position.y = state.position.y.max(MIN_HEIGHT);
    });

    let near = find(&scene, "orbit_near");
    let far = find(&scene, "orbit_far");
    let frames = args.frames.max(1);
    let report_every = args.report_every.max(1);

    for frame in 0..frames {
        scene.advance(args.delta_time);

        let t = frame as f32 / frames as f32;
        if let Some(near) = &near {
            mixer.set_weight_of(near, 1.0 - t);
        }
        if let Some(far) = &far {
            mixer.set_weight_of(far, t);
        }

        if frame == frames / 2 && scene.despawn("overview").is_some() {
            log::info!("Frame {frame}: despawned 'overview'");
        }

        let result = mixer.update(world_up(), args.delta_time);
        if frame % report_every == 0 {
            let p = result.state.position;
            log::info!(
                "Frame {frame:>5}: {} at ({:.2}, {:.2}, {:.2}), {} sources",
                mixer.description(),
                p.x,
                p.y,
                p.z,
                mixer.entry_count()
            );
        }

        mixcam_core::frame_mark!();
    }

    for camera in scene.cameras() {
        log::info!(
            "{}: became live {} time(s)",
            camera.name(),
            camera.activations()
        );
    }
    log::info!(
        "Finished {frames} frames, final mix {} (cache generation {})",
        mixer.description(),
        mixer.cache_generation()
    );
}
