use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::{
    error::TraceError,
    packet_record::{PacketRecord, TsResolution},
};

mod reader;
mod writer;

pub use reader::PcapReader;
pub use writer::PcapWriter;

pub const GLOBAL_HEADER_LEN: usize = 24;
pub const RECORD_HEADER_LEN: usize = 16;

const MAGIC_MICRO: u32 = 0xa1b2_c3d4;
const MAGIC_NANO: u32 = 0xa1b2_3c4d;

// 输入端：按时间顺序吐出记录，Ok(None) 表示读完
pub trait PacketSource {
    fn next_packet(&mut self) -> Result<Option<PacketRecord>, TraceError>;
}

// 输出端：按给定顺序落盘
pub trait PacketSink {
    fn write_packet(&mut self, record: &PacketRecord) -> Result<(), TraceError>;
    fn finish(&mut self) -> Result<(), TraceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn write_u16(self, buf: &mut [u8], n: u16) {
        match self {
            Endian::Little => LittleEndian::write_u16(buf, n),
            Endian::Big => BigEndian::write_u16(buf, n),
        }
    }

    pub fn write_u32(self, buf: &mut [u8], n: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(buf, n),
            Endian::Big => BigEndian::write_u32(buf, n),
        }
    }
}

// ==========================================
// 全局文件头 (输出文件原样复用输入的)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcapHeader {
    pub endian: Endian,
    pub resolution: TsResolution,
    pub version_major: u16,
    pub version_minor: u16,
    pub thiszone: i32,
    pub sigfigs: u32,
    pub snaplen: u32,
    pub linktype: u32,
}

impl PcapHeader {
    #[cfg(test)]
    pub fn new(endian: Endian, resolution: TsResolution, snaplen: u32, linktype: u32) -> Self {
        Self {
            endian,
            resolution,
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen,
            linktype,
        }
    }

    pub fn to_bytes(&self) -> [u8; GLOBAL_HEADER_LEN] {
        let magic = match self.resolution {
            TsResolution::Micro => MAGIC_MICRO,
            TsResolution::Nano => MAGIC_NANO,
        };
        let e = self.endian;
        let mut buf = [0u8; GLOBAL_HEADER_LEN];
        e.write_u32(&mut buf[0..4], magic);
        e.write_u16(&mut buf[4..6], self.version_major);
        e.write_u16(&mut buf[6..8], self.version_minor);
        e.write_u32(&mut buf[8..12], self.thiszone as u32);
        e.write_u32(&mut buf[12..16], self.sigfigs);
        e.write_u32(&mut buf[16..20], self.snaplen);
        e.write_u32(&mut buf[20..24], self.linktype);
        buf
    }
}

// pcap_parser 负责识别魔数和字节序，这里只记下写回所需的字段
impl From<&pcap_parser::PcapHeader> for PcapHeader {
    fn from(hdr: &pcap_parser::PcapHeader) -> Self {
        Self {
            endian: if hdr.is_bigendian() { Endian::Big } else { Endian::Little },
            resolution: if hdr.is_nanosecond_precision() {
                TsResolution::Nano
            } else {
                TsResolution::Micro
            },
            version_major: hdr.version_major,
            version_minor: hdr.version_minor,
            thiszone: hdr.thiszone,
            sigfigs: hdr.sigfigs,
            snaplen: hdr.snaplen,
            linktype: hdr.network.0 as u32,
        }
    }
}
