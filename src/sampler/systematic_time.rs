use std::time::Duration;

use rand::RngCore;

use crate::{
    packet_record::PacketRecord,
    sampler::{Sampler, Verdict},
};

// ==========================================
// 按时间的系统抽样 (允许同一个包补发多次)
// ==========================================
pub struct SystematicTimeSampler {
    interval: Duration,
    last_emission: Option<Duration>,
}

impl SystematicTimeSampler {
    pub fn new(interval: Duration) -> Self {
        assert!(!interval.is_zero(), "interval must be positive");
        Self {
            interval,
            last_emission: None,
        }
    }
}

impl Sampler for SystematicTimeSampler {
    fn observe(&mut self, record: &PacketRecord, _rng: &mut dyn RngCore) -> Verdict {
        let ts = record.timestamp();
        // 第一个包只用来对齐起点
        let last = *self.last_emission.get_or_insert(ts);

        // 空闲期间攒下的每个整区间都花在当前包上，余数丢弃
        let elapsed = ts.saturating_sub(last);
        let intervals = elapsed.as_nanos() / self.interval.as_nanos();
        if intervals > 0 {
            self.last_emission = Some(ts);
        }
        Verdict::from_copies(u64::try_from(intervals).unwrap_or(u64::MAX))
    }

    fn name(&self) -> &'static str {
        "TIME_SYS"
    }
}
