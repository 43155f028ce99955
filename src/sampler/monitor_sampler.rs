use std::time::{Duration, Instant};

use chrono::Local;
use rand::RngCore;
use tracing::debug;

use crate::{
    packet_record::PacketRecord,
    sampler::{Sampler, Verdict},
};

// ==========================================
// 1. 抽样统计表
// ==========================================
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SamplerStats {
    pub seen_pkts: u64,
    pub admitted_pkts: u64, // 被放行的不同包
    pub emitted_pkts: u64,  // 实际写出的次数 (含补发)
    pub seen_bytes: u64,
    pub emitted_bytes: u64,
}

impl SamplerStats {
    pub fn admit_ratio(&self) -> f64 {
        if self.seen_pkts == 0 {
            0.0
        } else {
            self.admitted_pkts as f64 / self.seen_pkts as f64
        }
    }
}

// ==========================================
// 2. 监控外壳：透传裁决，顺手记账
// ==========================================
pub struct MonitorSampler {
    inner: Box<dyn Sampler>,
    stats: SamplerStats,
    last_report: Instant,
    window_seen: u64,
    window_emitted: u64,
    report_every: Duration,
}

impl MonitorSampler {
    pub fn new(inner: Box<dyn Sampler>) -> Self {
        Self {
            inner,
            stats: SamplerStats::default(),
            last_report: Instant::now(),
            window_seen: 0,
            window_emitted: 0,
            report_every: Duration::from_secs(1),
        }
    }

    pub fn stats(&self) -> SamplerStats {
        self.stats
    }

    fn check_and_report(&mut self) {
        let elapsed = self.last_report.elapsed();
        if elapsed < self.report_every {
            return;
        }

        let now_str = Local::now().format("%H:%M:%S").to_string();
        let secs = elapsed.as_secs_f64();
        debug!(
            "[{}] {}: {:.0} pkt/s in, {:.0} pkt/s out, {} seen / {} admitted ({:.4}), {} out/{} B",
            now_str,
            self.inner.name(),
            self.window_seen as f64 / secs,
            self.window_emitted as f64 / secs,
            self.stats.seen_pkts,
            self.stats.admitted_pkts,
            self.stats.admit_ratio(),
            self.stats.emitted_pkts,
            self.stats.emitted_bytes,
        );

        // 只清窗口计数，累计值保留
        self.window_seen = 0;
        self.window_emitted = 0;
        self.last_report = Instant::now();
    }
}

impl Sampler for MonitorSampler {
    fn observe(&mut self, record: &PacketRecord, rng: &mut dyn RngCore) -> Verdict {
        let verdict = self.inner.observe(record, rng);
        let copies = verdict.copies();
        let len = record.captured_len as u64;

        self.stats.seen_pkts += 1;
        self.stats.seen_bytes += len;
        self.window_seen += 1;
        if verdict.is_admit() {
            self.stats.admitted_pkts += 1;
            self.stats.emitted_pkts += copies;
            self.stats.emitted_bytes += copies.saturating_mul(len);
            self.window_emitted += copies;
        }

        self.check_and_report();
        verdict
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
