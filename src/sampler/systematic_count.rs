use rand::RngCore;

use crate::{
    packet_record::PacketRecord,
    sampler::{Sampler, Verdict},
};

// ==========================================
// 按包计数的系统抽样：每 period 个包放行第一个
// ==========================================
pub struct SystematicCountSampler {
    period: u64,
    index: u64,
}

impl SystematicCountSampler {
    pub fn new(period: u64) -> Self {
        assert!(period > 0, "period must be positive");
        Self { period, index: 0 }
    }
}

impl Sampler for SystematicCountSampler {
    fn observe(&mut self, _record: &PacketRecord, _rng: &mut dyn RngCore) -> Verdict {
        let admit = self.index % self.period == 0;
        self.index += 1;
        if admit { Verdict::Accept } else { Verdict::Drop }
    }

    fn name(&self) -> &'static str {
        "COUNT_SYS"
    }
}
