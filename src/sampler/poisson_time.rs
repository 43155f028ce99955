use std::time::Duration;

use rand::{Rng, RngCore};

use crate::{
    packet_record::PacketRecord,
    sampler::{Sampler, Verdict},
};

// 单次间隔上限 = 均值的 100 倍
pub const GAP_CLAMP_FACTOR: f64 = 100.0;

// ==========================================
// 泊松过程抽样：指数分布间隔的更新过程
// ==========================================
pub struct PoissonTimeSampler {
    mean: f64,
    limit: Duration,
    next_threshold: Option<Duration>,
}

impl PoissonTimeSampler {
    pub fn new(mean_interval: f64) -> Self {
        assert!(
            mean_interval.is_finite() && mean_interval > 0.0,
            "mean interval must be positive"
        );
        let limit = Duration::try_from_secs_f64(mean_interval * GAP_CLAMP_FACTOR)
            .unwrap_or(Duration::MAX);
        Self {
            mean: mean_interval,
            limit,
            next_threshold: None,
        }
    }

    #[cfg(test)]
    pub fn next_threshold(&self) -> Option<Duration> {
        self.next_threshold
    }

    // -mean * ln(term)，截断到 limit
    fn gap(&self, term: f64) -> Duration {
        let secs = 0.0 - self.mean * term.ln();
        Duration::try_from_secs_f64(secs).map_or(self.limit, |gap| gap.min(self.limit))
    }
}

impl Sampler for PoissonTimeSampler {
    fn observe(&mut self, record: &PacketRecord, rng: &mut dyn RngCore) -> Verdict {
        let ts = record.timestamp();

        let threshold = match self.next_threshold {
            Some(t) => t,
            None => {
                let u: f64 = rng.random();
                let first = ts.saturating_add(self.gap(1.0 - u));
                self.next_threshold = Some(first);
                first
            }
        };

        if ts < threshold {
            return Verdict::Drop;
        }

        // 超出多少都只放行一次，阈值从上一个阈值累加
        let u: f64 = rng.random();
        self.next_threshold = Some(threshold.saturating_add(self.gap(u)));
        Verdict::Accept
    }

    fn name(&self) -> &'static str {
        "TIME_RAND_POISSON"
    }
}
