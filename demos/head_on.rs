use impact_scene::*;

fn main() {
    env_logger::init();

    let mut config = SimulationConfig::default();
    config.world.gravity = Vec3::ZERO;
    config.world.linear_damping = 0.0;

    let sink = CapturingAudioSink::new();
    let mut sim = Simulation::new(config).with_audio(Some(AudioClip::new("hit")), Box::new(sink.clone()));

    for (x, vx) in [(-2.1, 10.0), (2.1, -10.0)] {
        let request = SpawnRequest::new(ShapeDescriptor::sphere(0.5))
            .with_position(Vec3::new(x, 0.0, 0.0))
            .with_velocity(Vec3::new(vx, 0.0, 0.0), Vec3::ZERO);
        if let Err(err) = sim.spawn(request) {
            eprintln!("spawn failed: {err}");
            return;
        }
    }

    for _ in 0..30 {
        let report = sim.frame(1.0 / 60.0);
        if report.step.events_dispatched > 0 {
            println!("frame {}: {} collision event(s)", report.frame, report.step.events_dispatched);
        }
    }

    for trigger in sink.triggers() {
        println!("{} at volume {:.2} from {:?}", trigger.clip.name(), trigger.volume, trigger.entry);
    }
    println!("released {} entries", sim.shutdown());
}
