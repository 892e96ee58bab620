/// Asserts that every observer holds every authority agent within `tolerance` per axis.
#[macro_export]
macro_rules! assert_converged {
    ($harness:expr, $tolerance:expr) => {
        let divergence = $harness.max_divergence();
        assert!(
            divergence <= $tolerance,
            "Observers diverged by {} (allowed {})",
            divergence,
            $tolerance
        );
    };
}

/// Asserts that the authority and every observer hold `$count` agents.
#[macro_export]
macro_rules! assert_population {
    ($harness:expr, $count:expr) => {
        assert_eq!(
            $harness.authority().directory().len(),
            $count,
            "Authority population mismatch"
        );
        for i in 0..$harness.observer_count() {
            let observer = $harness.observer(i).expect("Observer not found");
            assert_eq!(
                observer.directory().len(),
                $count,
                "Observer {} population mismatch",
                i
            );
        }
    };
}

/// Asserts that two vectors differ by at most `$tolerance` on every axis.
#[macro_export]
macro_rules! assert_vec_near {
    ($actual:expr, $expected:expr, $tolerance:expr) => {
        let diff = ($actual - $expected).abs().max_element();
        assert!(
            diff <= $tolerance,
            "{:?} is not within {} of {:?}",
            $actual,
            $tolerance,
            $expected
        );
    };
}
