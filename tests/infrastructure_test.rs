//! Test to verify test infrastructure works correctly

mod common;

use common::builders::{ConfigBuilder, ReadingBuilder};
use common::sim_helpers::plant_for;
use linewatch::Quality;

#[test]
fn test_infrastructure_setup() {
    // Test that builders work
    let reading = ReadingBuilder::new("Speed")
        .value("40.0")
        .quality(Quality::Bad)
        .build();

    assert_eq!(reading.variable, "Speed");
    assert_eq!(reading.value, "40.0");
    assert_eq!(reading.quality, Quality::Bad);
}

#[test]
fn test_simulated_plant_matches_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigBuilder::new(&dir.path().join("readings.db"))
        .line("Serac5")
        .machine("Filler")
        .build();
    let (server, machine) = plant_for(&config);

    assert_eq!(server.find(&["Matics", "Serac5", "Filler"]), Some(machine));
    config.validate().unwrap();
}
