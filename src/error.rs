use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown sampling mode `{name}` (expected one of: {expected})")]
    UnknownMode { name: String, expected: String },
    #[error("rate must be a finite positive number, got {0}")]
    InvalidRate(f64),
    #[error("rate {rate} truncates to {truncated}, {mode} needs a whole number >= 1")]
    RateTooSmall {
        mode: &'static str,
        rate: f64,
        truncated: u64,
    },
    #[error("cannot pick {picks} packets out of blocks of {block}")]
    InvalidPicks { picks: u32, block: u32 },
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error at packet {index}: {message}")]
    Pcap { index: u64, message: String },
    #[error("truncated {what} at packet {index}")]
    Truncated { what: &'static str, index: u64 },
    #[error("packet {index} does not fit in the {limit} byte read buffer")]
    Oversized { index: u64, limit: usize },
    #[error("packet {index} is older than the packet before it ({ts:?} < {prev:?})")]
    OutOfOrder {
        index: u64,
        ts: std::time::Duration,
        prev: std::time::Duration,
    },
    #[error("captured length {captured_len} does not match {payload_len} payload bytes")]
    LengthMismatch { captured_len: u32, payload_len: usize },
}
