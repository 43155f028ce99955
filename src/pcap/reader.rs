use std::fmt::Debug;
use std::io::{self, Read};
use std::time::Duration;

use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError, traits::PcapReaderIterator};
use tracing::trace;

use crate::{
    error::TraceError,
    packet_record::PacketRecord,
    pcap::{PacketSource, PcapHeader},
};

// 读缓冲大小，也是单包上限
pub const DEFAULT_CAPACITY: usize = 1 << 20;

pub struct PcapReader<R: Read> {
    inner: LegacyPcapReader<R>,
    header: PcapHeader,
    capacity: usize,
    index: u64,
    require_order: bool,
    last_ts: Option<Duration>,
}

impl<R: Read> PcapReader<R> {
    pub fn new(inner: R) -> Result<Self, TraceError> {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: R, capacity: usize) -> Result<Self, TraceError> {
        let truncated = || TraceError::Truncated {
            what: "global header",
            index: 0,
        };
        let mut inner = LegacyPcapReader::new(capacity, inner).map_err(|err| match err {
            PcapError::Incomplete(_) | PcapError::UnexpectedEof | PcapError::Eof => truncated(),
            other => map_error(other, 0, capacity),
        })?;

        // 第一个块一定是文件头
        let header = loop {
            match inner.next() {
                Ok((offset, PcapBlockOwned::LegacyHeader(hdr))) => {
                    let header = PcapHeader::from(&hdr);
                    inner.consume(offset);
                    break header;
                }
                Ok(_) | Err(PcapError::Eof) | Err(PcapError::UnexpectedEof) => {
                    return Err(truncated());
                }
                Err(PcapError::Incomplete(_)) => {
                    inner.refill().map_err(|err| map_error(err, 0, capacity))?;
                }
                Err(err) => return Err(map_error(err, 0, capacity)),
            }
        };
        trace!(?header, "pcap header parsed");

        Ok(Self {
            inner,
            header,
            capacity,
            index: 0,
            require_order: false,
            last_ts: None,
        })
    }

    // 只有时间类策略依赖单调时间戳
    pub fn require_order(mut self, on: bool) -> Self {
        self.require_order = on;
        self
    }

    pub fn header(&self) -> &PcapHeader {
        &self.header
    }

    fn next_record(&mut self) -> Result<Option<PacketRecord>, TraceError> {
        loop {
            match self.inner.next() {
                Ok((offset, PcapBlockOwned::Legacy(b))) => {
                    let record = PacketRecord {
                        ts_sec: b.ts_sec,
                        ts_frac: b.ts_usec,
                        resolution: self.header.resolution,
                        captured_len: b.caplen,
                        original_len: b.origlen,
                        payload: b.data.to_vec(),
                    };
                    self.inner.consume(offset);
                    return Ok(Some(record));
                }
                Ok(_) => {
                    return Err(TraceError::Pcap {
                        index: self.index,
                        message: "unexpected header block inside trace".to_string(),
                    });
                }
                Err(PcapError::Eof) => return Ok(None),
                Err(PcapError::Incomplete(_)) => {
                    let (index, capacity) = (self.index, self.capacity);
                    self.inner
                        .refill()
                        .map_err(|err| map_error(err, index, capacity))?;
                }
                Err(err) => return Err(map_error(err, self.index, self.capacity)),
            }
        }
    }
}

impl<R: Read> PacketSource for PcapReader<R> {
    fn next_packet(&mut self) -> Result<Option<PacketRecord>, TraceError> {
        let Some(record) = self.next_record()? else {
            return Ok(None);
        };

        let ts = record.timestamp();
        if let Some(prev) = self.last_ts {
            if self.require_order && ts < prev {
                return Err(TraceError::OutOfOrder {
                    index: self.index,
                    ts,
                    prev,
                });
            }
        }
        self.last_ts = Some(ts);
        self.index += 1;

        Ok(Some(record))
    }
}

// pcap_parser 的错误 → TraceError
fn map_error<I: Debug>(err: PcapError<I>, index: u64, capacity: usize) -> TraceError {
    match err {
        PcapError::UnexpectedEof | PcapError::Incomplete(_) => TraceError::Truncated {
            what: "record",
            index,
        },
        PcapError::BufferTooSmall => TraceError::Oversized {
            index,
            limit: capacity,
        },
        PcapError::ReadError => TraceError::Io(io::Error::other("read from trace failed")),
        other => TraceError::Pcap {
            index,
            message: format!("{other:?}"),
        },
    }
}
