use rand::{Rng, RngCore};

use crate::{
    packet_record::PacketRecord,
    sampler::{Sampler, Verdict},
};

// 独立伯努利试验，配置值是 "每 N 个取 1"，内部换算成概率
pub struct UniformCountSampler {
    probability: f64,
}

impl UniformCountSampler {
    pub fn new(one_in: f64) -> Self {
        assert!(one_in > 0.0, "rate must be positive");
        Self {
            probability: 1.0 / one_in,
        }
    }

    #[cfg(test)]
    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl Sampler for UniformCountSampler {
    fn observe(&mut self, _record: &PacketRecord, rng: &mut dyn RngCore) -> Verdict {
        let draw: f64 = rng.random();
        if draw < self.probability { Verdict::Accept } else { Verdict::Drop }
    }

    fn name(&self) -> &'static str {
        "COUNT_RAND_UNIFORM"
    }
}
