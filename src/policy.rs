use std::{collections::HashMap, fmt, str::FromStr, time::Duration};

use lazy_static::lazy_static;

use crate::{
    error::ConfigError,
    sampler::{
        PoissonTimeSampler, RandomKnSampler, Sampler, SystematicCountSampler,
        SystematicTimeSampler, UniformCountSampler,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingMode {
    CountSys,
    CountRandKn,
    CountRandUniform,
    TimeSys,
    TimeRandPoisson,
}

lazy_static! {
    // 命令行名字 → 模式
    static ref MODE_TABLE: HashMap<&'static str, SamplingMode> = {
        let mut m = HashMap::new();
        m.insert("COUNT_SYS", SamplingMode::CountSys);
        m.insert("COUNT_RAND_KN", SamplingMode::CountRandKn);
        m.insert("COUNT_RAND_UNIFORM", SamplingMode::CountRandUniform);
        m.insert("TIME_SYS", SamplingMode::TimeSys);
        m.insert("TIME_RAND_POISSON", SamplingMode::TimeRandPoisson);
        m
    };
}

impl SamplingMode {
    pub const ALL: [SamplingMode; 5] = [
        SamplingMode::CountSys,
        SamplingMode::CountRandKn,
        SamplingMode::CountRandUniform,
        SamplingMode::TimeSys,
        SamplingMode::TimeRandPoisson,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SamplingMode::CountSys => "COUNT_SYS",
            SamplingMode::CountRandKn => "COUNT_RAND_KN",
            SamplingMode::CountRandUniform => "COUNT_RAND_UNIFORM",
            SamplingMode::TimeSys => "TIME_SYS",
            SamplingMode::TimeRandPoisson => "TIME_RAND_POISSON",
        }
    }

    pub fn is_time_based(self) -> bool {
        matches!(self, SamplingMode::TimeSys | SamplingMode::TimeRandPoisson)
    }
}

impl fmt::Display for SamplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SamplingMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MODE_TABLE
            .get(s)
            .copied()
            .ok_or_else(|| ConfigError::UnknownMode {
                name: s.to_string(),
                expected: SamplingMode::ALL.map(SamplingMode::name).join(", "),
            })
    }
}

// ==========================================
// 已校验的策略参数 (任何 I/O 之前完成校验)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingPolicy {
    SystematicByCount { period: u64 },
    RandomKOutOfN { block: u32, picks: u32 },
    UniformByCount { one_in: f64 },
    SystematicByTime { interval: Duration },
    PoissonByTime { mean_interval: f64 },
}

impl SamplingPolicy {
    // 命令行只暴露 k = 1
    pub const DEFAULT_PICKS: u32 = 1;

    pub fn new(mode: SamplingMode, rate: f64) -> Result<Self, ConfigError> {
        Self::with_picks(mode, rate, Self::DEFAULT_PICKS)
    }

    pub fn with_picks(mode: SamplingMode, rate: f64, picks: u32) -> Result<Self, ConfigError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::InvalidRate(rate));
        }

        let policy = match mode {
            SamplingMode::CountSys => SamplingPolicy::SystematicByCount {
                period: whole(mode, rate)?,
            },
            SamplingMode::CountRandKn => {
                let block = u32::try_from(whole(mode, rate)?)
                    .map_err(|_| ConfigError::InvalidRate(rate))?;
                if picks == 0 || picks > block {
                    return Err(ConfigError::InvalidPicks { picks, block });
                }
                SamplingPolicy::RandomKOutOfN { block, picks }
            }
            SamplingMode::CountRandUniform => SamplingPolicy::UniformByCount { one_in: rate },
            SamplingMode::TimeSys => {
                let interval = Duration::try_from_secs_f64(rate)
                    .ok()
                    .filter(|d| !d.is_zero())
                    .ok_or(ConfigError::InvalidRate(rate))?;
                SamplingPolicy::SystematicByTime { interval }
            }
            SamplingMode::TimeRandPoisson => {
                // 截断上限也要能用 Duration 表示
                Duration::try_from_secs_f64(rate * 100.0)
                    .map_err(|_| ConfigError::InvalidRate(rate))?;
                SamplingPolicy::PoissonByTime {
                    mean_interval: rate,
                }
            }
        };
        Ok(policy)
    }

    pub fn mode(&self) -> SamplingMode {
        match self {
            SamplingPolicy::SystematicByCount { .. } => SamplingMode::CountSys,
            SamplingPolicy::RandomKOutOfN { .. } => SamplingMode::CountRandKn,
            SamplingPolicy::UniformByCount { .. } => SamplingMode::CountRandUniform,
            SamplingPolicy::SystematicByTime { .. } => SamplingMode::TimeSys,
            SamplingPolicy::PoissonByTime { .. } => SamplingMode::TimeRandPoisson,
        }
    }

    pub fn build(&self) -> Box<dyn Sampler> {
        match *self {
            SamplingPolicy::SystematicByCount { period } => {
                Box::new(SystematicCountSampler::new(period))
            }
            SamplingPolicy::RandomKOutOfN { block, picks } => {
                Box::new(RandomKnSampler::new(block, picks))
            }
            SamplingPolicy::UniformByCount { one_in } => Box::new(UniformCountSampler::new(one_in)),
            SamplingPolicy::SystematicByTime { interval } => {
                Box::new(SystematicTimeSampler::new(interval))
            }
            SamplingPolicy::PoissonByTime { mean_interval } => {
                Box::new(PoissonTimeSampler::new(mean_interval))
            }
        }
    }
}

// 计数类模式把 rate 向零截断成整数
fn whole(mode: SamplingMode, rate: f64) -> Result<u64, ConfigError> {
    let truncated = rate.trunc() as u64;
    if truncated == 0 {
        return Err(ConfigError::RateTooSmall {
            mode: mode.name(),
            rate,
            truncated,
        });
    }
    Ok(truncated)
}
