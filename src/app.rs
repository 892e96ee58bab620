use anyhow::{Context, Result};
use flocknet_core::config::AppConfig;
use flocknet_core::replication::ApplyReport;
use flocknet_core::session::{AuthoritySession, ObserverSession};
use flocknet_data::NetId;
use flocknet_io::{LossyLink, NetStats, TokenBucket};
use flocknet_net::NetMessage;
use std::path::Path;

/// Reads `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    AppConfig::from_toml(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

struct ObserverEndpoint {
    session: ObserverSession,
    /// Authority to observer.
    downlink: LossyLink,
    /// Observer to authority; only carries the handshake.
    uplink: LossyLink,
}

/// What one harness frame did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub batches_sent: usize,
    pub throttled: usize,
    pub applied: usize,
    pub corrected: usize,
    pub unresolved: usize,
}

impl FrameReport {
    fn absorb(&mut self, report: &ApplyReport) {
        self.applied += report.applied;
        self.corrected += report.corrected;
        self.unresolved += report.unresolved;
    }
}

/// One authority and its observers connected by in-process lossy links.
pub struct Harness {
    authority: AuthoritySession,
    observers: Vec<ObserverEndpoint>,
    clock: f64,
    frames: u64,
}

impl Harness {
    pub fn new(config: AppConfig) -> Result<Self> {
        let authority = AuthoritySession::new(config.clone())?;
        let base_seed = config.simulation.seed.unwrap_or_default();

        let mut observers = Vec::with_capacity(config.link.observers);
        for i in 0..config.link.observers {
            let mut downlink = LossyLink::new(config.link.drop_rate, base_seed.wrapping_add(i as u64))?;
            if let Some(cap) = config.replication.max_outbound_bytes_per_sec {
                downlink = downlink.with_limiter(TokenBucket::per_second(cap));
            }
            observers.push(ObserverEndpoint {
                session: ObserverSession::new(config.clone())?,
                downlink,
                uplink: LossyLink::new(0.0, 0)?,
            });
        }

        Ok(Self {
            authority,
            observers,
            clock: 0.0,
            frames: 0,
        })
    }

    /// Handshakes every observer, spawns the initial population and starts updates.
    pub fn connect(&mut self) -> Result<()> {
        for endpoint in &mut self.observers {
            endpoint.uplink.send(&endpoint.session.handshake(), self.clock)?;
            for message in endpoint.uplink.receive_all(self.clock)? {
                if let NetMessage::Handshake { client_id } = message {
                    let welcome = self.authority.welcome(client_id);
                    endpoint.downlink.send(&welcome, self.clock)?;
                }
            }
        }

        if let Some(spawn) = self.authority.spawn_initial() {
            self.broadcast(&spawn)?;
        }
        self.authority.start_updates();
        self.deliver()?;
        Ok(())
    }

    /// Spawns `count` more agents on the authority and announces them.
    pub fn spawn(&mut self, count: usize) -> Result<()> {
        if let Some(message) = self.authority.spawn_random(count) {
            self.broadcast(&message)?;
        }
        Ok(())
    }

    pub fn despawn(&mut self, ids: &[NetId]) -> Result<()> {
        if let Some(message) = self.authority.despawn(ids) {
            self.broadcast(&message)?;
        }
        Ok(())
    }

    /// Runs one frame of `dt` seconds on every session.
    pub fn frame(&mut self, dt: f32) -> Result<FrameReport> {
        self.clock += f64::from(dt);
        self.frames += 1;

        let mut report = FrameReport::default();
        for message in self.authority.step(dt) {
            report.batches_sent += 1;
            report.throttled += self.broadcast(&message)?;
        }

        for endpoint in &mut self.observers {
            endpoint.session.step(dt);
        }
        for apply in self.deliver()? {
            report.absorb(&apply);
        }
        Ok(report)
    }

    /// Sends `message` to every observer. Returns how many links throttled it.
    fn broadcast(&mut self, message: &NetMessage) -> Result<usize> {
        let mut throttled = 0;
        for endpoint in &mut self.observers {
            match endpoint.downlink.send(message, self.clock) {
                Ok(_) => {}
                Err(e) if e.is_rate_limited() => {
                    tracing::debug!(client = %endpoint.session.client_id(), "{}", e);
                    throttled += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(throttled)
    }

    fn deliver(&mut self) -> Result<Vec<ApplyReport>> {
        let mut reports = Vec::new();
        for endpoint in &mut self.observers {
            for message in endpoint.downlink.receive_all(self.clock)? {
                if let Some(report) = endpoint.session.handle(&message)? {
                    reports.push(report);
                }
            }
        }
        Ok(reports)
    }

    /// Largest per-axis distance between an authority agent and its copy on any observer.
    ///
    /// Agents an observer does not know count as infinitely far.
    pub fn max_divergence(&self) -> f32 {
        let agents = self.authority.directory().agents();
        let mut worst = 0.0f32;
        for endpoint in &self.observers {
            let mirror = endpoint.session.directory();
            for agent in &agents {
                let distance = mirror
                    .resolve(agent.id)
                    .and_then(|handle| mirror.location(handle))
                    .map_or(f32::INFINITY, |loc| (loc - agent.location).abs().max_element());
                worst = worst.max(distance);
            }
        }
        worst
    }

    /// Authority-side totals across every downlink, with combined rates.
    pub fn net_summary(&mut self) -> NetSummary {
        let mut totals = NetStats::new();
        let mut out_rate = 0.0;
        let mut in_rate = 0.0;
        let mut lost = 0;
        let mut throttled = 0;
        for endpoint in &mut self.observers {
            let stats = endpoint.downlink.stats_mut();
            out_rate += stats.out_bytes_per_sec(self.clock);
            in_rate += stats.in_bytes_per_sec(self.clock);
            totals.absorb_totals(stats);
            lost += endpoint.downlink.lost();
            throttled += endpoint.downlink.throttled();
        }
        NetSummary {
            bytes_sent: totals.bytes_sent(),
            messages_sent: totals.messages_sent(),
            out_bytes_per_sec: out_rate,
            in_bytes_per_sec: in_rate,
            lost,
            throttled,
        }
    }

    pub fn authority(&self) -> &AuthoritySession {
        &self.authority
    }

    pub fn authority_mut(&mut self) -> &mut AuthoritySession {
        &mut self.authority
    }

    pub fn observer(&self, index: usize) -> Option<&ObserverSession> {
        self.observers.get(index).map(|endpoint| &endpoint.session)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Link totals as seen from the authority.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetSummary {
    pub bytes_sent: u64,
    pub messages_sent: u64,
    pub out_bytes_per_sec: f64,
    pub in_bytes_per_sec: f64,
    pub lost: u64,
    pub throttled: u64,
}
