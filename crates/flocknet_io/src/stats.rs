//! Throughput statistics for one end of a link.

use std::collections::VecDeque;

const WINDOW_SECS: f64 = 1.0;

#[derive(Debug, Default, Clone)]
struct Direction {
    total_bytes: u64,
    total_messages: u64,
    window: VecDeque<(f64, usize)>,
    window_bytes: usize,
}

impl Direction {
    fn record(&mut self, bytes: usize, now_secs: f64) {
        self.total_bytes += bytes as u64;
        self.total_messages += 1;
        self.window.push_back((now_secs, bytes));
        self.window_bytes += bytes;
        self.expire(now_secs);
    }

    fn expire(&mut self, now_secs: f64) {
        while let Some(&(at, bytes)) = self.window.front() {
            if now_secs - at < WINDOW_SECS {
                break;
            }
            self.window.pop_front();
            self.window_bytes -= bytes;
        }
    }

    fn rate(&mut self, now_secs: f64) -> f64 {
        self.expire(now_secs);
        self.window_bytes as f64 / WINDOW_SECS
    }
}

/// Bytes and messages in each direction, with per-second rates over the last second.
#[derive(Debug, Default, Clone)]
pub struct NetStats {
    outbound: Direction,
    inbound: Direction,
}

impl NetStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&mut self, bytes: usize, now_secs: f64) {
        self.outbound.record(bytes, now_secs);
    }

    pub fn record_received(&mut self, bytes: usize, now_secs: f64) {
        self.inbound.record(bytes, now_secs);
    }

    pub fn out_bytes_per_sec(&mut self, now_secs: f64) -> f64 {
        self.outbound.rate(now_secs)
    }

    pub fn in_bytes_per_sec(&mut self, now_secs: f64) -> f64 {
        self.inbound.rate(now_secs)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.outbound.total_bytes
    }

    pub fn bytes_received(&self) -> u64 {
        self.inbound.total_bytes
    }

    pub fn messages_sent(&self) -> u64 {
        self.outbound.total_messages
    }

    pub fn messages_received(&self) -> u64 {
        self.inbound.total_messages
    }

    /// Adds another end's totals into this one. Rate windows are not merged.
    pub fn absorb_totals(&mut self, other: &NetStats) {
        self.outbound.total_bytes += other.outbound.total_bytes;
        self.outbound.total_messages += other.outbound.total_messages;
        self.inbound.total_bytes += other.inbound.total_bytes;
        self.inbound.total_messages += other.inbound.total_messages;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_accumulate() {
        let mut stats = NetStats::new();
        stats.record_sent(100, 0.0);
        stats.record_sent(50, 0.5);
        stats.record_received(30, 0.5);

        assert_eq!(stats.bytes_sent(), 150);
        assert_eq!(stats.messages_sent(), 2);
        assert_eq!(stats.bytes_received(), 30);
        assert_eq!(stats.messages_received(), 1);
    }

    #[test]
    fn test_rate_uses_last_second_only() {
        let mut stats = NetStats::new();
        stats.record_sent(1000, 0.0);
        stats.record_sent(200, 0.6);
        assert_eq!(stats.out_bytes_per_sec(0.9), 1200.0);
        assert_eq!(stats.out_bytes_per_sec(1.2), 200.0);
        assert_eq!(stats.out_bytes_per_sec(5.0), 0.0);
        assert_eq!(stats.in_bytes_per_sec(5.0), 0.0);
        assert_eq!(stats.bytes_sent(), 1200);
    }

    #[test]
    fn test_absorb_totals() {
        let mut a = NetStats::new();
        let mut b = NetStats::new();
        a.record_sent(10, 0.0);
        b.record_sent(5, 0.0);
        b.record_received(7, 0.0);
        a.absorb_totals(&b);
        assert_eq!(a.bytes_sent(), 15);
        assert_eq!(a.bytes_received(), 7);
    }
}
