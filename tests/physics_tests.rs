use approx::assert_relative_eq;
use impact_scene::*;

fn floor() -> RigidBody {
    RigidBody::fixed(ShapeDescriptor::Plane)
}

fn weightless_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.world.gravity = Vec3::ZERO;
    config.world.linear_damping = 0.0;
    config.world.angular_damping = 0.0;
    config
}

#[test]
fn dropped_sphere_comes_to_rest_and_sleeps() {
    let mut sim = Simulation::default();
    sim.add_fixture(floor());
    // The default 0.7 restitution keeps a sphere dropped from 5 m bouncing
    // for roughly 12 s; an inelastic pair lets it settle within the 2 s run.
    let inelastic = MaterialTag(1);
    sim.world_mut()
        .materials_mut()
        .insert(
            MaterialTag::DEFAULT,
            inelastic,
            ContactMaterial::new(0.1, 0.0).expect("valid material"),
        )
        .expect("inserted");

    let handle = sim
        .spawn(
            SpawnRequest::new(ShapeDescriptor::sphere(1.0))
                .with_material(inelastic)
                .with_position(Vec3::new(0.0, 5.0, 0.0)),
        )
        .expect("spawned");

    for _ in 0..120 {
        sim.frame(1.0 / 60.0);
    }

    let entry = *sim.registry().get(handle).expect("entry");
    let body = sim.world().body(entry.body).expect("body");
    assert!(body.is_sleeping(), "state {:?}", body.sleep_state());
    assert_relative_eq!(body.pose.position.y, 1.0, epsilon = 0.02);
    assert_relative_eq!(body.pose.position.x, 0.0, epsilon = 1e-4);

    let proxy = sim.scene().proxy(entry.proxy).expect("proxy");
    assert_eq!(proxy.position(), body.pose.position);
}

#[test]
fn head_on_spheres_raise_exactly_one_event() {
    let config = weightless_config();
    let mut world = PhysicsWorld::new(config.world);
    let left = world.add_body(
        RigidBody::new(ShapeDescriptor::sphere(0.5), 1.0)
            .with_position(Vec3::new(-2.1, 0.0, 0.0))
            .with_velocity(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO),
    );
    let right = world.add_body(
        RigidBody::new(ShapeDescriptor::sphere(0.5), 1.0)
            .with_position(Vec3::new(2.1, 0.0, 0.0))
            .with_velocity(Vec3::new(-10.0, 0.0, 0.0), Vec3::ZERO),
    );

    let mut events = Vec::new();
    for _ in 0..60 {
        world.step(1.0 / 60.0, 1, &mut |event: &CollisionEvent| events.push(*event));
    }

    assert_eq!(events.len(), 1);
    let event = events[0];
    assert_eq!((event.body_a, event.body_b), (left, right));
    assert!((event.normal - Vec3::X).length() < 1e-5);
    assert_relative_eq!(event.impact_strength(), 20.0, epsilon = 1e-3);
    assert!(event.relative_normal_velocity < 0.0);

    let vl = world.body(left).expect("left").velocity.linear.x;
    let vr = world.body(right).expect("right").velocity.linear.x;
    assert!(vl < 0.0 && vr > 0.0, "bodies bounced apart: {vl} {vr}");
}

#[test]
fn head_on_spheres_trigger_one_full_volume_sound() {
    let sink = CapturingAudioSink::new();
    let mut sim = Simulation::new(weightless_config())
        .with_audio(Some(AudioClip::new("hit.mp3")), Box::new(sink.clone()));

    let left = sim
        .spawn(
            SpawnRequest::new(ShapeDescriptor::sphere(0.5))
                .with_position(Vec3::new(-2.1, 0.0, 0.0))
                .with_velocity(Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO),
        )
        .expect("left");
    sim.spawn(
        SpawnRequest::new(ShapeDescriptor::sphere(0.5))
            .with_position(Vec3::new(2.1, 0.0, 0.0))
            .with_velocity(Vec3::new(-10.0, 0.0, 0.0), Vec3::ZERO),
    )
    .expect("right");

    let mut dispatched = 0;
    for _ in 0..60 {
        dispatched += sim.frame(1.0 / 60.0).step.events_dispatched;
    }

    assert_eq!(dispatched, 1);
    let triggers = sink.triggers();
    assert_eq!(triggers.len(), 1);
    assert_relative_eq!(triggers[0].volume, 1.0);
    assert_eq!(triggers[0].entry, Some(left));
    assert_eq!(sim.bridge().stats().dispatched, 1);
}

#[test]
fn box_settles_on_floor_without_tipping() {
    let mut config = SimulationConfig::default();
    config.world.default_contact = ContactMaterial::new(0.5, 0.0).expect("valid");
    let mut sim = Simulation::new(config);
    sim.add_fixture(floor());
    let handle = sim
        .spawn(SpawnRequest::new(ShapeDescriptor::cuboid(Vec3::ONE)).with_position(Vec3::new(1.0, 3.0, 0.0)))
        .expect("spawned");

    for _ in 0..240 {
        sim.frame(1.0 / 60.0);
    }

    let entry = *sim.registry().get(handle).expect("entry");
    let body = sim.world().body(entry.body).expect("body");
    assert_relative_eq!(body.pose.position.y, 0.5, epsilon = 0.05);
    assert!(body.velocity.linear.length() < 0.2);
}

#[test]
fn stacked_contact_keeps_touching_state_while_asleep() {
    let mut world = PhysicsWorld::default();
    let ground = world.add_body(floor());
    let ball = world.add_body(RigidBody::new(ShapeDescriptor::sphere(0.5), 1.0).with_position(Vec3::new(0.0, 0.499, 0.0)));
    let mut events = Vec::new();

    world.step(1.0 / 60.0, 1, &mut |event: &CollisionEvent| events.push(*event));
    world.body_mut(ball).expect("ball").put_to_sleep();
    for _ in 0..10 {
        world.step(1.0 / 60.0, 1, &mut |event: &CollisionEvent| events.push(*event));
    }

    assert_eq!(events.len(), 1);
    assert!(world.is_touching(ground, ball));
}

#[test]
fn broadphase_strategies_produce_the_same_events() {
    let mut counts = Vec::new();
    for kind in ["naive", "sweep_and_prune", "uniform_grid"] {
        let config = SimulationConfig::from_toml_str(&format!("[world]\nbroadphase = \"{kind}\"\n"))
            .expect("config");
        let mut world = PhysicsWorld::new(config.world);
        world.add_body(floor());
        for i in 0..4 {
            world.add_body(
                RigidBody::new(ShapeDescriptor::sphere(0.25), 1.0)
                    .with_position(Vec3::new(i as f32 * 0.4, 1.0 + i as f32, 0.0)),
            );
        }
        let mut events = 0;
        for _ in 0..120 {
            world.step(1.0 / 60.0, 1, &mut |_: &CollisionEvent| events += 1);
        }
        counts.push(events);
    }
    assert!(counts[0] > 0);
    assert!(counts.iter().all(|&c| c == counts[0]), "{counts:?}");
}
