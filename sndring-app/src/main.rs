//! `sndring` — plays a test tone through the ring buffer engine from a
//! frame-paced producer loop, the way an emulator drives its sound output.

mod settings;
mod tone;

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::bail;
use sndring_core::{audio::device::list_output_devices, AudioEngine, CpalOutput, PauseMode};
use tracing::{info, warn};

use settings::{default_settings_path, load_settings, load_settings_strict, AppSettings};
use tone::SquareTone;

#[derive(Debug, Default)]
struct Args {
    settings: Option<PathBuf>,
    list_devices: bool,
    seconds: Option<u64>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--settings" => match it.next() {
                Some(path) => args.settings = Some(PathBuf::from(path)),
                None => bail!("--settings requires a path"),
            },
            "--seconds" => match it.next().map(|v| v.parse::<u64>()) {
                Some(Ok(secs)) => args.seconds = Some(secs),
                _ => bail!("--seconds requires a whole number"),
            },
            "--list-devices" => args.list_devices = true,
            "-h" | "--help" => {
                println!("usage: sndring [--settings <path>] [--seconds <n>] [--list-devices]");
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn main() -> anyhow::Result<()> {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sndring=info,sndring_core=info".into()),
        )
        .init();

    let args = parse_args()?;

    if args.list_devices {
        for device in list_output_devices() {
            let marker = if device.is_default { "*" } else { " " };
            println!("{marker} {}", device.name);
        }
        return Ok(());
    }

    let mut settings = match args.settings.as_deref() {
        Some(path) => load_settings_strict(path)?,
        None => load_settings(&default_settings_path()),
    };
    if let Some(secs) = args.seconds {
        settings.run_seconds = secs;
    }
    info!(
        sample_rate = settings.engine.sample_rate,
        latency_ms = settings.engine.latency_ms,
        tone_hz = settings.tone_hz,
        run_seconds = settings.run_seconds,
        "settings loaded"
    );

    run(&settings);
    Ok(())
}

/// Producer loop: render one video frame of audio, hand it to the engine,
/// sleep until the next frame.
fn run(settings: &AppSettings) {
    let device = CpalOutput::with_preference(settings.engine.output_device.clone());
    let mut engine = AudioEngine::new(device);

    let rate = engine.initialize_with(&settings.engine);
    if rate == 0 {
        warn!("audio unavailable, emulation would continue silently");
        return;
    }

    let mut tone = SquareTone::new(rate, settings.tone_hz, settings.volume);
    let samples_per_frame = (rate / settings.frames_per_second) as usize;
    let frame_time = Duration::from_secs_f64(1.0 / f64::from(settings.frames_per_second));
    let total_frames = settings.total_frames();

    let mut scratch = Vec::with_capacity(samples_per_frame);
    let mut next_frame = Instant::now();

    for frame in 0..total_frames {
        // Render only what fits; the rest of this frame's audio is dropped.
        let count = samples_per_frame.min(engine.available_capacity());
        tone.render(&mut scratch, count);
        engine.produce(&scratch);

        let fps = u64::from(settings.frames_per_second);
        if frame > 0 && frame % fps == 0 {
            let snap = engine.diagnostics_snapshot();
            info!(
                second = frame / fps,
                queued_ms = engine.queued_duration().as_millis() as u64,
                samples_written = snap.samples_written,
                samples_dropped = snap.samples_dropped,
                underrun_frames = snap.underrun_frames,
                "audio stats"
            );
        }

        // Brief pause halfway through, as a menu overlay would.
        if frame == total_frames / 2 {
            engine.pause(PauseMode::Pause);
            thread::sleep(Duration::from_millis(250));
            engine.reset();
            engine.pause(PauseMode::Resume);
            next_frame = Instant::now();
        }

        next_frame += frame_time;
        if let Some(wait) = next_frame.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }

    engine.shutdown();
    info!("done");
}
