use super::flow_control::TokenBucket;
use crate::codec;
use crate::error::{IoError, Result};
use crate::stats::NetStats;
use flocknet_net::{Delivery, NetMessage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// One-way in-process link from an authority to one observer.
///
/// Reliable messages are always delivered, in send order. Unreliable
/// messages are dropped with probability `drop_rate` and, when a limiter is
/// attached, whenever the outbound byte budget is exhausted. Everything that
/// is delivered comes out in the order it was sent.
pub struct LossyLink {
    queue: VecDeque<Vec<u8>>,
    drop_rate: f64,
    rng: ChaCha8Rng,
    limiter: Option<TokenBucket>,
    stats: NetStats,
    lost: u64,
    throttled: u64,
}

impl LossyLink {
    pub fn new(drop_rate: f64, seed: u64) -> Result<Self> {
        if !(0.0..=1.0).contains(&drop_rate) {
            return Err(IoError::validation(format!(
                "Drop rate {} outside [0, 1]",
                drop_rate
            )));
        }
        Ok(Self {
            queue: VecDeque::new(),
            drop_rate,
            rng: ChaCha8Rng::seed_from_u64(seed),
            limiter: None,
            stats: NetStats::new(),
            lost: 0,
            throttled: 0,
        })
    }

    /// Applies `limiter` to unreliable traffic.
    #[must_use]
    pub fn with_limiter(mut self, limiter: TokenBucket) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Encodes and enqueues `message`.
    ///
    /// Returns `Ok(true)` if the message will be delivered, `Ok(false)` if the
    /// link lost it, and `IoError::RateLimited` if the byte budget refused it.
    pub fn send(&mut self, message: &NetMessage, now_secs: f64) -> Result<bool> {
        let bytes = codec::encode(message)?;

        if message.delivery() == Delivery::Unreliable {
            if let Some(limiter) = &self.limiter {
                if !limiter.try_acquire_at(bytes.len() as f64, now_secs) {
                    self.throttled += 1;
                    return Err(IoError::RateLimited {
                        needed: bytes.len(),
                    });
                }
            }

            self.stats.record_sent(bytes.len(), now_secs);
            if self.drop_rate > 0.0 && self.rng.gen_bool(self.drop_rate) {
                self.lost += 1;
                tracing::trace!(bytes = bytes.len(), "Link lost unreliable message");
                return Ok(false);
            }
        } else {
            self.stats.record_sent(bytes.len(), now_secs);
        }

        self.queue.push_back(bytes);
        Ok(true)
    }

    /// Drains and decodes every delivered message.
    pub fn receive_all(&mut self, now_secs: f64) -> Result<Vec<NetMessage>> {
        let mut messages = Vec::with_capacity(self.queue.len());
        while let Some(bytes) = self.queue.pop_front() {
            self.stats.record_received(bytes.len(), now_secs);
            let message = codec::decode(&bytes).map_err(|e| e.with_context("decoding delivered message"))?;
            messages.push(message);
        }
        Ok(messages)
    }

    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    /// Unreliable messages lost to the drop rate.
    pub fn lost(&self) -> u64 {
        self.lost
    }

    /// Unreliable messages refused by the byte budget.
    pub fn throttled(&self) -> u64 {
        self.throttled
    }

    pub fn stats(&self) -> &NetStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut NetStats {
        &mut self.stats
    }
}
