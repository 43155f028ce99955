use std::time::Duration;

use rand::RngCore;
use tracing::{debug, trace};

use crate::{
    error::TraceError,
    packet_record::PacketRecord,
    pcap::{PacketSink, PacketSource},
    policy::SamplingPolicy,
    sampler::{MonitorSampler, Sampler, SamplerStats},
};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PassSummary {
    pub read: u64,
    pub admitted: u64, // 写出的不同包
    pub written: u64,  // 写出的记录数 (含补发)
    pub first_ts: Option<Duration>,
    pub last_ts: Option<Duration>,
    pub sampler: SamplerStats,
}

impl PassSummary {
    pub fn span(&self) -> Duration {
        match (self.first_ts, self.last_ts) {
            (Some(first), Some(last)) => last.saturating_sub(first),
            _ => Duration::ZERO,
        }
    }

    // 按实际写出的不同包计算，含无条件写出的第一个包
    pub fn admit_ratio(&self) -> f64 {
        if self.read == 0 {
            0.0
        } else {
            self.admitted as f64 / self.read as f64
        }
    }
}

// ==========================================
// 单次顺序扫描：读 → 裁决 → 写
// ==========================================
pub fn run_pass<S, K>(
    source: &mut S,
    sink: &mut K,
    policy: &SamplingPolicy,
    rng: &mut dyn RngCore,
) -> Result<PassSummary, TraceError>
where
    S: PacketSource + ?Sized,
    K: PacketSink + ?Sized,
{
    let mut sampler = MonitorSampler::new(policy.build());
    let mut summary = PassSummary::default();

    // 第一个包无条件写出；策略照样观察它，用来初始化自身状态
    if let Some(first) = source.next_packet()? {
        let copies = sampler.observe(&first, rng).copies().max(1);
        summary.first_ts = Some(first.timestamp());
        emit(sink, &first, copies, &mut summary)?;

        while let Some(record) = source.next_packet()? {
            let copies = sampler.observe(&record, rng).copies();
            emit(sink, &record, copies, &mut summary)?;
        }
    } else {
        debug!("input trace holds no packets");
    }

    sink.finish()?;
    summary.sampler = sampler.stats();
    Ok(summary)
}

fn emit<K: PacketSink + ?Sized>(
    sink: &mut K,
    record: &PacketRecord,
    copies: u64,
    summary: &mut PassSummary,
) -> Result<(), TraceError> {
    summary.read += 1;
    summary.last_ts = Some(record.timestamp());
    if copies == 0 {
        return Ok(());
    }

    if copies > 1 {
        trace!(ts = ?record.timestamp(), copies, "burst emission");
    }
    for _ in 0..copies {
        sink.write_packet(record)?;
    }
    summary.admitted += 1;
    summary.written += copies;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::packet_record::TsResolution;
    use crate::pcap::{Endian, PcapHeader, PcapReader, PcapWriter};
    use crate::policy::SamplingMode;
    use crate::sampler::test_util::record_at;

    // 内存里的输入输出
    struct VecSource(std::vec::IntoIter<PacketRecord>);

    impl PacketSource for VecSource {
        fn next_packet(&mut self) -> Result<Option<PacketRecord>, TraceError> {
            Ok(self.0.next())
        }
    }

    #[derive(Default)]
    struct VecSink {
        out: Vec<PacketRecord>,
        finished: bool,
    }

    impl PacketSink for VecSink {
        fn write_packet(&mut self, record: &PacketRecord) -> Result<(), TraceError> {
            self.out.push(record.clone());
            Ok(())
        }

        fn finish(&mut self) -> Result<(), TraceError> {
            self.finished = true;
            Ok(())
        }
    }

    fn sample(
        records: Vec<PacketRecord>,
        mode: SamplingMode,
        rate: f64,
        seed: u64,
    ) -> (VecSink, PassSummary) {
        let policy = SamplingPolicy::new(mode, rate).unwrap();
        let mut source = VecSource(records.into_iter());
        let mut sink = VecSink::default();
        let mut rng = StdRng::seed_from_u64(seed);
        let summary = run_pass(&mut source, &mut sink, &policy, &mut rng).unwrap();
        (sink, summary)
    }

    fn numbered(n: usize) -> Vec<PacketRecord> {
        (0..n)
            .map(|i| {
                let mut rec = record_at(i as f64 * 0.01);
                rec.payload = (i as u32).to_be_bytes().to_vec();
                rec
            })
            .collect()
    }

    fn id_of(rec: &PacketRecord) -> u32 {
        u32::from_be_bytes([rec.payload[0], rec.payload[1], rec.payload[2], rec.payload[3]])
    }

    fn ids(sink: &VecSink) -> Vec<u32> {
        sink.out.iter().map(id_of).collect()
    }

    #[test]
    fn systematic_count_does_not_duplicate_first_record() {
        let (sink, summary) = sample(numbered(10), SamplingMode::CountSys, 4.0, 0);
        assert_eq!(ids(&sink), vec![0, 4, 8]);
        assert_eq!(summary.read, 10);
        assert_eq!(summary.admitted, 3);
        assert_eq!(summary.written, 3);
        assert!(sink.finished);
    }

    #[test]
    fn admit_ratio_counts_the_forced_first_record() {
        // 块远大于输入，写出的只剩第一个包
        let (sink, summary) = sample(numbered(10), SamplingMode::CountRandKn, 1_000_000.0, 3);
        assert_eq!(ids(&sink), vec![0]);
        assert_eq!(summary.admitted, 1);
        assert!((summary.admit_ratio() - 0.1).abs() < 1e-12);

        assert_eq!(PassSummary::default().admit_ratio(), 0.0);
    }

    #[test]
    fn count_sampling_tolerates_reordered_capture() {
        let header = PcapHeader::new(Endian::Little, TsResolution::Micro, 65535, 1);
        let mut input = PcapWriter::new(Vec::new(), header).unwrap();
        for (i, (sec, usec)) in [(10, 0), (10, 500), (10, 400), (11, 0)].into_iter().enumerate() {
            let rec = PacketRecord::new(sec, usec, TsResolution::Micro, vec![i as u8]);
            input.write_packet(&rec).unwrap();
        }
        input.finish().unwrap();
        let bytes = input.into_inner();

        let policy = SamplingPolicy::new(SamplingMode::CountSys, 1.0).unwrap();
        let mut source = PcapReader::new(Cursor::new(bytes.clone()))
            .unwrap()
            .require_order(policy.mode().is_time_based());
        let mut sink = VecSink::default();
        let mut rng = StdRng::seed_from_u64(0);
        let summary = run_pass(&mut source, &mut sink, &policy, &mut rng).unwrap();
        assert_eq!(summary.written, 4);

        // 时间类策略仍然拒绝乱序输入
        let policy = SamplingPolicy::new(SamplingMode::TimeSys, 0.001).unwrap();
        let mut source = PcapReader::new(Cursor::new(bytes))
            .unwrap()
            .require_order(policy.mode().is_time_based());
        let err = run_pass(&mut source, &mut VecSink::default(), &policy, &mut rng).unwrap_err();
        assert!(matches!(err, TraceError::OutOfOrder { index: 2, .. }), "{err:?}");
    }

    #[test]
    fn first_record_always_written_once() {
        for mode in SamplingMode::ALL {
            let (sink, _) = sample(numbered(3), mode, 1_000_000.0, 17);
            assert_eq!(ids(&sink).first(), Some(&0), "{mode}");
            assert_eq!(ids(&sink).iter().filter(|&&i| i == 0).count(), 1, "{mode}");
        }
    }

    #[test]
    fn systematic_time_repeats_records_after_gap() {
        let records: Vec<_> = [0.0, 0.5, 2.5, 2.6].iter().map(|&t| record_at(t)).collect();
        let (sink, summary) = sample(records, SamplingMode::TimeSys, 1.0, 0);

        let times: Vec<_> = sink.out.iter().map(|r| r.timestamp().as_secs_f64()).collect();
        assert_eq!(times, vec![0.0, 2.5, 2.5]);
        assert_eq!(summary.admitted, 2);
        assert_eq!(summary.written, 3);
        assert_eq!(summary.span(), Duration::from_millis(2600));
    }

    #[test]
    fn empty_input_writes_nothing() {
        let (sink, summary) = sample(Vec::new(), SamplingMode::CountRandKn, 10.0, 0);
        assert!(sink.out.is_empty());
        assert!(sink.finished);
        assert_eq!(summary, PassSummary::default());
    }

    #[test]
    fn same_seed_gives_identical_output() {
        for mode in SamplingMode::ALL {
            let rate = if mode.is_time_based() { 0.05 } else { 7.0 };
            let (a, _) = sample(numbered(500), mode, rate, 1234);
            let (b, _) = sample(numbered(500), mode, rate, 1234);
            assert_eq!(a.out, b.out, "{mode}");
        }
    }

    #[test]
    fn random_kn_admits_one_per_block() {
        let (sink, summary) = sample(numbered(100), SamplingMode::CountRandKn, 10.0, 8);
        let got = ids(&sink);
        // 第 0 组可能额外包含无条件写出的第一个包
        assert!(summary.admitted == 10 || summary.admitted == 11);
        for block in 1..10 {
            assert_eq!(got.iter().filter(|&&i| i / 10 == block).count(), 1);
        }
    }

    #[test]
    fn pcap_round_trip_is_bit_exact() {
        let header = PcapHeader::new(Endian::Big, TsResolution::Nano, 96, 101);
        let mut input = PcapWriter::new(Vec::new(), header).unwrap();
        for i in 0..20u32 {
            let mut rec = PacketRecord::new(
                1_700_000_000 + i,
                i * 7919,
                TsResolution::Nano,
                (0..=(i as u8)).collect(),
            );
            rec.original_len = 1500 - i;
            input.write_packet(&rec).unwrap();
        }
        input.finish().unwrap();
        let input_bytes = input.into_inner();

        // rate 1 会放行全部，输出应与输入逐字节一致
        let policy = SamplingPolicy::new(SamplingMode::CountSys, 1.0).unwrap();
        let mut source = PcapReader::new(Cursor::new(input_bytes.clone())).unwrap();
        let mut sink = PcapWriter::new(Vec::new(), *source.header()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let summary = run_pass(&mut source, &mut sink, &policy, &mut rng).unwrap();

        assert_eq!(summary.written, 20);
        assert_eq!(sink.into_inner(), input_bytes);
    }

    #[test]
    fn sampled_records_match_source_records() {
        let records = numbered(300);
        let (sink, _) = sample(records.clone(), SamplingMode::CountRandUniform, 5.0, 77);
        for out in &sink.out {
            assert_eq!(out, &records[id_of(out) as usize]);
        }
    }

    #[test]
    fn source_errors_abort_the_pass() {
        struct Broken(u32);
        impl PacketSource for Broken {
            fn next_packet(&mut self) -> Result<Option<PacketRecord>, TraceError> {
                self.0 += 1;
                if self.0 > 2 {
                    return Err(TraceError::Truncated { what: "record body", index: 2 });
                }
                Ok(Some(record_at(self.0 as f64)))
            }
        }

        let policy = SamplingPolicy::new(SamplingMode::CountSys, 1.0).unwrap();
        let mut sink = VecSink::default();
        let mut rng = StdRng::seed_from_u64(0);
        let err = run_pass(&mut Broken(0), &mut sink, &policy, &mut rng).unwrap_err();
        assert!(matches!(err, TraceError::Truncated { index: 2, .. }));
        assert_eq!(sink.out.len(), 2);
        assert!(!sink.finished);
    }
}
