use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use impact_scene::*;

/// Prints instead of playing sound.
struct LogBackend;

impl AudioBackend for LogBackend {
    fn play(&mut self, clip: &AudioClip, volume: f32) -> Result<(), AudioError> {
        log::info!("play {} at volume {volume:.2}", clip.name());
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SimulationConfig::default();
    let sink = ChannelAudioSink::spawn(LogBackend, config.feedback.queue_capacity)?;
    let mut sim = Simulation::new(config).with_audio(Some(AudioClip::new("sounds/hit.mp3")), Box::new(sink));

    sim.add_fixture(RigidBody::fixed(ShapeDescriptor::Plane));
    sim.spawn(SpawnRequest::new(ShapeDescriptor::cuboid(Vec3::ONE)).with_position(Vec3::new(1.0, 3.0, 0.0)))?;
    sim.spawn(SpawnRequest::new(ShapeDescriptor::sphere(0.5)).with_position(Vec3::new(0.0, 5.0, 0.0)))?;

    // Stands in for the debug UI: a few random drops, then a reset.
    let ui = sim.command_sender();
    let ui_thread = thread::spawn(move || {
        for i in 0..6 {
            thread::sleep(Duration::from_millis(150));
            let kind = if i % 2 == 0 { SpawnKind::Sphere } else { SpawnKind::Box };
            ui.spawn_random(kind);
        }
        thread::sleep(Duration::from_millis(500));
        ui.reset_all();
    });

    let shutdown = AtomicBool::new(false);
    let frames = sim.run(
        &shutdown,
        || {
            thread::sleep(Duration::from_millis(16));
            1.0 / 60.0
        },
        |scene, report| {
            if report.frame % 30 == 0 {
                for (handle, proxy) in scene.iter() {
                    log::info!("frame {} {:?} {:?} at {:.3}", report.frame, handle, proxy.kind(), proxy.position());
                }
            }
            if report.frame >= 180 {
                shutdown.store(true, Ordering::Release);
            }
        },
    );

    if ui_thread.join().is_err() {
        log::warn!("ui thread panicked");
    }
    let stats = sim.bridge().stats();
    println!("ran {frames} frames, {} sounds, {} quiet impacts", stats.dispatched, stats.below_threshold);
    Ok(())
}
