use std::time::Duration;

// 时间戳精度 (由 pcap 魔数决定)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsResolution {
    Micro,
    Nano,
}

impl TsResolution {
    pub fn nanos_per_tick(self) -> u32 {
        match self {
            TsResolution::Micro => 1_000,
            TsResolution::Nano => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketRecord {
    // 原始时间戳字段，写回时一字不差
    pub ts_sec: u32,
    pub ts_frac: u32,
    pub resolution: TsResolution,

    pub captured_len: u32,
    pub original_len: u32,
    pub payload: Vec<u8>, // 数据包实体，只读透传
}

impl PacketRecord {
    #[cfg(test)]
    pub fn new(ts_sec: u32, ts_frac: u32, resolution: TsResolution, payload: Vec<u8>) -> Self {
        let len = payload.len() as u32;
        Self {
            ts_sec,
            ts_frac,
            resolution,
            captured_len: len,
            original_len: len,
            payload,
        }
    }

    /// Capture time as an offset from the Unix epoch.
    pub fn timestamp(&self) -> Duration {
        let nanos = self.ts_frac as u64 * self.resolution.nanos_per_tick() as u64;
        Duration::from_secs(self.ts_sec as u64) + Duration::from_nanos(nanos)
    }
}
