pub mod macros;

use flocknet_core::config::AppConfig;
use flocknet_lib::app::Harness;

#[allow(dead_code)]
pub struct HarnessBuilder {
    config: AppConfig,
}

#[allow(dead_code)]
impl HarnessBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.simulation.num_of_boids = 100;
        config.simulation.seed = Some(42);
        Self { config }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.simulation.seed = Some(seed);
        self
    }

    pub fn with_agents(mut self, count: usize) -> Self {
        self.config.simulation.num_of_boids = count;
        self
    }

    pub fn with_observers(mut self, count: usize) -> Self {
        self.config.link.observers = count;
        self
    }

    pub fn with_drop_rate(mut self, drop_rate: f64) -> Self {
        self.config.link.drop_rate = drop_rate;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    /// Builds the harness without connecting it.
    pub fn build_unconnected(self) -> Harness {
        Harness::new(self.config).expect("Failed to build harness")
    }

    pub fn build(self) -> Harness {
        let mut harness = self.build_unconnected();
        harness.connect().expect("Failed to connect harness");
        harness
    }
}

/// Runs `seconds` of frames at the configured frame rate.
#[allow(dead_code)]
pub fn run_for(harness: &mut Harness, seconds: f32) {
    let fps = harness.authority().config().target_fps as f32;
    let frames = (seconds * fps).round() as usize;
    for _ in 0..frames {
        harness.frame(1.0 / fps).expect("Frame failed");
    }
}
