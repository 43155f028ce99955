use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// 引入模块
mod engine;
mod error;
mod packet_record;
mod pcap;
mod policy;
mod sampler;

use crate::{
    engine::{PassSummary, run_pass},
    pcap::{PcapReader, PcapWriter},
    policy::{SamplingMode, SamplingPolicy},
};

#[derive(Parser, Debug)]
#[command(
    name = "pcapsample",
    about = "Reduce a pcap trace by statistical packet sampling",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Input trace (classic libpcap format)
    input: PathBuf,

    /// Output trace, written with the input's link type and resolution
    output: PathBuf,

    /// Sampling mode: COUNT_SYS, COUNT_RAND_KN, COUNT_RAND_UNIFORM, TIME_SYS, TIME_RAND_POISSON
    #[arg(short, long, default_value = "COUNT_SYS")]
    mode: SamplingMode,

    /// Packets per sample for count modes, seconds between samples for time modes
    #[arg(short, long, default_value_t = 1000.0, allow_negative_numbers = true)]
    rate: f64,

    /// Seed the random source for a reproducible run
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    run(Cli::parse())?;
    Ok(())
}

fn run(cli: Cli) -> Result<PassSummary> {
    // 配置错误必须在打开任何文件之前暴露
    let policy = SamplingPolicy::new(cli.mode, cli.rate)
        .with_context(|| format!("invalid --rate for {}", cli.mode))?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let input = File::open(&cli.input)
        .with_context(|| format!("open input {}", cli.input.display()))?;
    let mut source = PcapReader::new(BufReader::new(input))
        .with_context(|| format!("read pcap header from {}", cli.input.display()))?
        .require_order(policy.mode().is_time_based());
    let header = *source.header();

    let output = File::create(&cli.output)
        .with_context(|| format!("create output {}", cli.output.display()))?;
    let mut sink = PcapWriter::new(BufWriter::new(output), header)
        .with_context(|| format!("write pcap header to {}", cli.output.display()))?;

    info!(
        mode = %policy.mode(),
        rate = cli.rate,
        unit = if policy.mode().is_time_based() { "s" } else { "pkts" },
        seed = ?cli.seed,
        linktype = header.linktype,
        resolution = ?header.resolution,
        input = %cli.input.display(),
        output = %cli.output.display(),
        "sampling trace"
    );

    let summary = run_pass(&mut source, &mut sink, &policy, &mut rng).with_context(|| {
        format!("sampling {} into {}", cli.input.display(), cli.output.display())
    })?;

    if summary.read == 0 {
        warn!("input trace is empty, wrote header only");
    } else {
        info!(
            read = summary.read,
            admitted = summary.admitted,
            written = summary.written,
            ratio = summary.admit_ratio(),
            bytes_in = summary.sampler.seen_bytes,
            file_records = sink.written(),
            first = %render_ts(summary.first_ts),
            last = %render_ts(summary.last_ts),
            span_secs = summary.span().as_secs_f64(),
            "done"
        );
    }
    Ok(summary)
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

// 抓包时间 → UTC 字符串
fn render_ts(ts: Option<Duration>) -> String {
    ts.and_then(|d| DateTime::<Utc>::from_timestamp(d.as_secs() as i64, d.subsec_nanos()))
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .unwrap_or_else(|| "-".to_string())
}
