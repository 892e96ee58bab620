use flocknet_core::config::AppConfig;
use flocknet_lib::app::load_config;
use std::path::PathBuf;

fn scratch_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("flocknet-{}-{}.toml", name, std::process::id()));
    std::fs::write(&path, content).expect("Failed to write scratch config");
    path
}

#[test]
fn test_shipped_config_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config.toml");
    let config = load_config(&path).expect("Shipped config should load");
    assert_eq!(config.simulation.seed, Some(42));
    assert_eq!(config.replication.batches_per_update, 10);
    assert_eq!(config.replication.max_outbound_bytes_per_sec, Some(65536.0));
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let config = load_config("/definitely/not/here/flocknet.toml").expect("Defaults");
    assert_eq!(config.simulation.num_of_boids, AppConfig::default().simulation.num_of_boids);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let path = scratch_file("partial", "[replication]\nbatches_per_update = 4\n");
    let config = load_config(&path).expect("Partial config should load");
    std::fs::remove_file(&path).ok();

    assert_eq!(config.replication.batches_per_update, 4);
    assert_eq!(config.replication.net_update_precision_tolerance, 2.0);
    assert_eq!(config.target_fps, 60);
}

#[test]
fn test_zero_batches_rejected_at_load() {
    let path = scratch_file("zero-batches", "[replication]\nbatches_per_update = 0\n");
    let result = load_config(&path);
    std::fs::remove_file(&path).ok();

    let err = result.expect_err("Zero batches must be rejected");
    assert!(format!("{:#}", err).contains("Batches per update"));
}

#[test]
fn test_malformed_file_reports_path() {
    let path = scratch_file("malformed", "[simulation\nnum_of_boids = ");
    let result = load_config(&path);
    std::fs::remove_file(&path).ok();

    let err = result.expect_err("Malformed TOML must be rejected");
    assert!(err.to_string().contains("Invalid config file"));
}

#[test]
fn test_extent_beyond_wire_range_is_rejected() {
    let path = scratch_file(
        "wire-range",
        "[replication]\nnet_update_precision_tolerance = 0.1\n",
    );
    let result = load_config(&path);
    std::fs::remove_file(&path).ok();
    let err = result.expect_err("Default extent overflows i16 at tolerance 0.1");
    assert!(format!("{:#}", err).contains("wire range"));

    let mut config = AppConfig::default();
    config.replication.net_update_precision_tolerance = 0.1;
    assert!(flocknet_lib::app::Harness::new(config).is_err());
}
