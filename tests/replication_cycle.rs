use flocknet_core::config::{ReplicationConfig, SimulationConfig};
use flocknet_core::directory::SimulationDirectory;
use flocknet_core::replication::{dequantize, quantize, AuthoritativeReplicator, ObservingReplicator};
use flocknet_data::NetId;
use flocknet_net::SpawnData;
use glam::Vec3;
use proptest::prelude::*;

fn populated(agents: u16, batches: u8) -> (SimulationDirectory, AuthoritativeReplicator) {
    let mut directory = SimulationDirectory::new(&SimulationConfig::default());
    let mut replicator = AuthoritativeReplicator::new(&ReplicationConfig {
        batches_per_update: batches,
        ..Default::default()
    });
    let spawns: Vec<SpawnData> = (1..=agents)
        .map(|i| SpawnData::new(NetId(i), Vec3::new(f32::from(i), 0.0, 0.0), Vec3::ZERO))
        .collect();
    directory.spawn_agents(&spawns, &mut replicator);
    (directory, replicator)
}

#[test]
fn test_hundred_agents_ten_batches() {
    let (directory, mut replicator) = populated(100, 10);

    replicator.check_locations(&directory);
    assert_eq!(replicator.last_visited(), 10);
    assert_eq!(replicator.current_batch_index(), 1);
    assert_eq!(replicator.current_index(), 10);

    for _ in 1..10 {
        replicator.check_locations(&directory);
        assert_eq!(replicator.last_visited(), 10);
    }
    assert_eq!(replicator.current_index(), 0);
    assert_eq!(replicator.current_batch_index(), 0);
}

#[test]
fn test_single_agent_update_round_trip() {
    let mut authority = SimulationDirectory::new(&SimulationConfig::default());
    let mut observer_dir = SimulationDirectory::new(&SimulationConfig::default());
    let config = ReplicationConfig {
        batches_per_update: 1,
        net_update_precision_tolerance: 2.0,
        ..Default::default()
    };
    let mut replicator = AuthoritativeReplicator::new(&config);
    let mut observer = ObservingReplicator::new(&config);

    let spawn = [SpawnData::new(NetId(1), Vec3::ZERO, Vec3::ZERO)];
    let handle = authority.spawn_agents(&spawn, &mut replicator)[0];
    observer.apply_spawn(&mut observer_dir, &spawn);

    assert!(replicator.check_locations(&authority).is_none());
    authority.relocate_agent(handle, Vec3::new(5.0, 0.0, 0.0));

    let batch = replicator.check_locations(&authority).expect("one record");
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].x, 2);

    observer.apply_batch(&mut observer_dir, &batch, 0.0);
    let mirrored = observer_dir.resolve(NetId(1)).expect("spawned");
    assert_eq!(observer_dir.location(mirrored), Some(Vec3::new(4.0, 0.0, 0.0)));
}

#[test]
fn test_agents_spawned_mid_cycle_join_next_cycle() {
    let (mut directory, mut replicator) = populated(10, 5);
    replicator.check_locations(&directory);
    replicator.check_locations(&directory);

    let late: Vec<SpawnData> = (11..=15)
        .map(|i| SpawnData::new(NetId(i), Vec3::ZERO, Vec3::ZERO))
        .collect();
    directory.spawn_agents(&late, &mut replicator);

    let mut visited = 0;
    for _ in 2..5 {
        replicator.check_locations(&directory);
        visited += replicator.last_visited();
    }
    // The rest of this cycle covers the remaining originals and the newcomers.
    assert_eq!(visited, 11);
    assert_eq!(replicator.current_index(), 0);

    let mut next_cycle = 0;
    for _ in 0..5 {
        replicator.check_locations(&directory);
        next_cycle += replicator.last_visited();
    }
    assert_eq!(next_cycle, 15);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_cycle_covers_roster_exactly_once(agents in 0u16..400, batches in 1u8..=32) {
        let (directory, mut replicator) = populated(agents, batches);
        let mut total = 0;
        for _ in 0..batches {
            replicator.check_locations(&directory);
            total += replicator.last_visited();
        }
        prop_assert_eq!(total, usize::from(agents));
        prop_assert_eq!(replicator.current_index(), 0);
        prop_assert_eq!(replicator.current_batch_index(), 0);
    }

    #[test]
    fn test_static_roster_sends_nothing(agents in 1u16..200, batches in 1u8..=16, cycles in 1usize..4) {
        let (directory, mut replicator) = populated(agents, batches);
        for _ in 0..(usize::from(batches) * cycles) {
            prop_assert!(replicator.check_locations(&directory).is_none());
        }
    }

    #[test]
    fn test_quantization_error_below_tolerance(
        x in -30000.0f32..30000.0,
        y in -30000.0f32..30000.0,
        z in -30000.0f32..30000.0,
        tolerance in 2.0f32..10.0,
    ) {
        let p = Vec3::new(x, y, z);
        let error = (dequantize(quantize(p, tolerance), tolerance) - p).abs().max_element();
        prop_assert!(error < tolerance, "error {} for {:?} at {}", error, p, tolerance);
    }
}
