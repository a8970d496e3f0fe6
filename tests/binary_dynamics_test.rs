use approx::assert_relative_eq;
use asteroid_lab::{
    lightcurve::Lightcurve,
    physics::{
        DriftTracker, PhysicsError, Preset, Renormalization, SimulationConfig,
        quaternion::{EulerAngles, from_euler, to_euler},
    },
    resources::load_mesh_data,
};
use cgmath::{InnerSpace, Vector3};

#[test]
fn default_simulation_is_didymos_and_stays_on_unit_quaternions() {
    let config = SimulationConfig::default();
    assert_eq!(config.preset, Preset::Didymos);
    assert_eq!(config.renormalization, Renormalization::AfterStep);

    let mut system = config.build();
    let tracker = DriftTracker::new(&system);
    for _ in 0..500 {
        system.advance(config.steps_per_frame, config.dt).unwrap();
    }
    assert!(system.quaternion_norm_error() < 1e-12);
    let drift = tracker.drift(&system);
    assert!(drift.energy < 1e-4, "energy drift {}", drift.energy);
    assert!(drift.angular_momentum < 1e-4, "momentum drift {}", drift.angular_momentum);
}

#[test]
fn renormalizing_before_the_step_also_conserves() {
    let mut config = SimulationConfig::for_preset(Preset::Patroclus);
    config.renormalization = Renormalization::BeforeStep;
    let mut system = config.build();
    let tracker = DriftTracker::new(&system);
    system.advance(2_000, config.dt).unwrap();
    let drift = tracker.drift(&system);
    assert!(drift.energy < 1e-4, "energy drift {}", drift.energy);
}

#[test]
fn braking_the_moonlet_ends_in_contact() {
    let mut config = SimulationConfig::for_preset(Preset::Didymos);
    // nearly cancels the ~15 km/day circular speed, the moonlet falls in
    config.velocity_kick = Vector3::new(0.0, -14.0, 0.0);
    let mut system = config.build();

    let err = system.advance(2_000, config.dt).unwrap_err();
    match err {
        PhysicsError::Contact {
            separation,
            contact,
            time,
        } => {
            assert!(separation < contact);
            assert!(time > 0.0 && time < 0.2, "contact at {time}");
        }
        other => panic!("expected contact, got {other}"),
    }
    // the failing step is not applied
    assert!(system.state.separation() >= system.contact_distance);
}

#[test]
fn invalid_steps_are_rejected() {
    let mut system = Preset::Didymos.system();
    assert_eq!(system.step(0.0), Err(PhysicsError::InvalidStep(0.0)));
    assert!(matches!(system.step(f64::NAN), Err(PhysicsError::InvalidStep(_))));
    assert_eq!(system.time, 0.0);
}

#[test]
fn bodies_orbit_the_barycentre() {
    let mut system = Preset::Patroclus.system();
    system.advance(100, 0.001).unwrap();
    let (p1, p2) = system.positions();
    let barycentre = p1 * system.primary.mass + p2 * system.secondary.mass;
    assert!(barycentre.magnitude() < 1e-6 * system.total_mass());
    assert_relative_eq!((p2 - p1).magnitude(), system.state.separation(), epsilon = 1e-9);
}

#[test]
fn render_instances_scale_with_the_unit() {
    let system = Preset::Didymos.system();
    let [near_primary, near_secondary] = system.instances(0.5);
    let [far_primary, far_secondary] = system.instances(1.0);

    assert_relative_eq!(near_secondary.position.x, 2.0 * far_secondary.position.x, epsilon = 1e-5);
    assert_relative_eq!(near_primary.position.x, 2.0 * far_primary.position.x, epsilon = 1e-5);
    assert_relative_eq!(far_primary.scale.x, 0.416, epsilon = 1e-6);
    assert_relative_eq!(far_secondary.scale.z, 0.058, epsilon = 1e-6);
}

#[test]
fn euler_angles_round_trip() {
    let angles = EulerAngles::new(0.3, -0.4, 1.2);
    let back = to_euler(from_euler(angles));
    assert_relative_eq!(back.roll, angles.roll, epsilon = 1e-12);
    assert_relative_eq!(back.pitch, angles.pitch, epsilon = 1e-12);
    assert_relative_eq!(back.yaw, angles.yaw, epsilon = 1e-12);
}

#[test]
fn bundled_asteroid_shape_loads() {
    let text = std::fs::read_to_string("assets/models/asteroid.obj").unwrap();
    let meshes = load_mesh_data(&text).unwrap();
    assert_eq!(meshes.len(), 1);
    let mesh = &meshes[0];
    assert_eq!(mesh.normals.len(), mesh.positions.len());
    assert_eq!(mesh.tex_coords.len(), mesh.positions.len());
    assert_eq!(mesh.indices.len() % 3, 0);
    assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.positions.len()));
}

#[test]
fn lightcurve_file_has_two_normalized_columns() {
    let mut lc = Lightcurve::new();
    for i in 0..10 {
        let t = i as f64 * 0.01;
        lc.push(t, 0.2 + 0.1 * (t * 40.0).sin());
    }
    let path = std::env::temp_dir().join(format!("lightcurve_test_{}.txt", std::process::id()));
    lc.write_to(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let rows: Vec<(f64, f64)> = text
        .lines()
        .map(|line| {
            let mut cols = line.split_whitespace().map(|c| c.parse::<f64>().unwrap());
            (cols.next().unwrap(), cols.next().unwrap())
        })
        .collect();
    assert_eq!(rows.len(), 10);
    assert_relative_eq!(rows[3].0, 0.03, epsilon = 1e-9);
    let max = rows.iter().map(|&(_, b)| b).fold(0.0, f64::max);
    assert_relative_eq!(max, 1.0, epsilon = 1e-6);
}
