//! End-to-end: a delimited text file through the registry, the schema
//! resolver, and the binder.

use core_data::{RecordStream, SourceRegistry, bind_particles};
use core_sim::Simulation;
use std::io::Write as _;

#[test]
fn fifty_row_csv_seeds_fifty_particles() {
    let mut contents = String::from("x,y,speed,value\n");
    for i in 0..50 {
        let x = (i % 90) as f32 + 1.0;
        let y = (i % 40) as f32 + 1.0;
        contents.push_str(&format!("{x},{y},{},{}\n", i % 7, i * 2));
    }
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();

    let registry = SourceRegistry::with_defaults();
    let mut source = registry.create("csv").unwrap();
    source.init(file.path().to_str().unwrap()).unwrap();
    source.open().unwrap();

    let mut sim = Simulation::new(256, 100, 50).unwrap();
    let report = bind_particles(source.as_mut(), &mut sim, 256).unwrap();
    assert_eq!(report.bound, 50);
    assert_eq!(sim.particle_count(), 50);

    // Positions match the x/y columns; velocity magnitude matches speed.
    let particles: Vec<_> = sim.pool().iter().map(|(_, p)| *p).collect();
    for (i, p) in particles.iter().enumerate() {
        assert_eq!(p.x, (i % 90) as f32 + 1.0);
        assert_eq!(p.y, (i % 40) as f32 + 1.0);
        let expected_speed = (i % 7) as f32;
        assert!(
            (p.speed() - expected_speed).abs() < 1e-3,
            "particle {i}: speed {} vs {expected_speed}",
            p.speed()
        );
    }

    source.close();
}
