use rand::RngCore;

use crate::packet_record::PacketRecord;

mod monitor_sampler;
mod poisson_time;
mod random_kn;
mod systematic_count;
mod systematic_time;
mod uniform_count;

pub use monitor_sampler::{MonitorSampler, SamplerStats};
pub use poisson_time::PoissonTimeSampler;
pub use random_kn::RandomKnSampler;
pub use systematic_count::SystematicCountSampler;
pub use systematic_time::SystematicTimeSampler;
pub use uniform_count::UniformCountSampler;

// 每个包的裁决：丢弃、放行一次、或同一个包连续写出多次 (按时间补发)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Drop,
    Accept,
    Burst(u64),
}

impl Verdict {
    pub fn from_copies(copies: u64) -> Self {
        match copies {
            0 => Verdict::Drop,
            1 => Verdict::Accept,
            n => Verdict::Burst(n),
        }
    }

    pub fn copies(self) -> u64 {
        match self {
            Verdict::Drop => 0,
            Verdict::Accept => 1,
            Verdict::Burst(n) => n,
        }
    }

    pub fn is_admit(self) -> bool {
        self != Verdict::Drop
    }
}

/// One sampling policy. Records arrive strictly in capture order, exactly once
/// each, and the policy keeps whatever state it needs between them.
///
/// Randomness is injected per call so every policy can be driven by a seeded
/// or scripted generator.
pub trait Sampler {
    fn observe(&mut self, record: &PacketRecord, rng: &mut dyn RngCore) -> Verdict;
    fn name(&self) -> &'static str;
}
