use std::io::Write;

use crate::{
    error::TraceError,
    packet_record::PacketRecord,
    pcap::{PacketSink, PcapHeader, RECORD_HEADER_LEN},
};

pub struct PcapWriter<W: Write> {
    inner: W,
    header: PcapHeader,
    written: u64,
}

impl<W: Write> PcapWriter<W> {
    // 创建即写出全局头
    pub fn new(mut inner: W, header: PcapHeader) -> Result<Self, TraceError> {
        inner.write_all(&header.to_bytes())?;
        Ok(Self {
            inner,
            header,
            written: 0,
        })
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> PacketSink for PcapWriter<W> {
    fn write_packet(&mut self, record: &PacketRecord) -> Result<(), TraceError> {
        if record.captured_len as usize != record.payload.len() {
            return Err(TraceError::LengthMismatch {
                captured_len: record.captured_len,
                payload_len: record.payload.len(),
            });
        }

        // 时间戳按原始字段写回，不做精度换算
        let e = self.header.endian;
        let mut hdr = [0u8; RECORD_HEADER_LEN];
        e.write_u32(&mut hdr[0..4], record.ts_sec);
        e.write_u32(&mut hdr[4..8], record.ts_frac);
        e.write_u32(&mut hdr[8..12], record.captured_len);
        e.write_u32(&mut hdr[12..16], record.original_len);

        self.inner.write_all(&hdr)?;
        self.inner.write_all(&record.payload)?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TraceError> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet_record::TsResolution;
    use crate::pcap::{Endian, GLOBAL_HEADER_LEN};

    #[test]
    fn writes_header_then_records() {
        let header = PcapHeader::new(Endian::Little, TsResolution::Micro, 65535, 1);
        let mut writer = PcapWriter::new(Vec::new(), header).unwrap();
        let rec = PacketRecord::new(0x0102_0304, 42, TsResolution::Micro, vec![0xaa, 0xbb]);
        writer.write_packet(&rec).unwrap();
        writer.finish().unwrap();
        assert_eq!(writer.written(), 1);

        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), GLOBAL_HEADER_LEN + RECORD_HEADER_LEN + 2);
        assert_eq!(&bytes[0..4], &[0xd4, 0xc3, 0xb2, 0xa1]);
        let body = &bytes[GLOBAL_HEADER_LEN..];
        assert_eq!(&body[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&body[4..8], &[42, 0, 0, 0]);
        assert_eq!(&body[8..12], &[2, 0, 0, 0]);
        assert_eq!(&body[12..16], &[2, 0, 0, 0]);
        assert_eq!(&body[16..], &[0xaa, 0xbb]);
    }

    #[test]
    fn big_endian_header_is_written_big_endian() {
        let header = PcapHeader::new(Endian::Big, TsResolution::Nano, 65535, 1);
        let writer = PcapWriter::new(Vec::new(), header).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(&bytes[0..4], &[0xa1, 0xb2, 0x3c, 0x4d]);
    }

    #[test]
    fn mismatched_capture_length_is_refused() {
        let header = PcapHeader::new(Endian::Little, TsResolution::Micro, 65535, 1);
        let mut writer = PcapWriter::new(Vec::new(), header).unwrap();
        let mut rec = PacketRecord::new(1, 0, TsResolution::Micro, vec![1, 2, 3]);
        rec.captured_len = 4;
        assert!(matches!(
            writer.write_packet(&rec),
            Err(TraceError::LengthMismatch { captured_len: 4, payload_len: 3 })
        ));
        assert_eq!(writer.written(), 0);
    }
}
