use byteorder::{ByteOrder, LittleEndian};
use vfs::{Error, Result};

/// 分区首扇区内的固件头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareHeader {
    /// 镜像表相对分区起点的字节偏移，已按版本修正
    pub bl_table: u32,
    pub ext_head: u16,
    pub version: u16,
}

impl FirmwareHeader {
    pub const OFFSET: usize = 0x100;
    pub const MAGIC: [u8; 4] = *b"]ih[";

    /// `sector`是分区的第一个扇区
    pub fn parse(sector: &[u8]) -> Result<Self> {
        let raw = &sector[Self::OFFSET..Self::OFFSET + 12];
        if raw[0..4] != Self::MAGIC {
            return Err(Error::BadSignature("firmware header"));
        }

        let version = LittleEndian::read_u16(&raw[10..]);
        let bl_table = match version {
            // 第一版的表位置是固定的
            1 => 0x4000,
            2 | 3 => LittleEndian::read_u32(&raw[4..]),
            _ => return Err(Error::UnsupportedFormat("firmware format version")),
        };

        Ok(Self {
            bl_table,
            ext_head: LittleEndian::read_u16(&raw[8..]),
            version,
        })
    }

    /// 镜像表所在的扇区，相对分区起点
    pub const fn table_sector(&self) -> usize {
        let sector = self.bl_table as usize / 512;
        if self.version >= 2 { sector + 1 } else { sector }
    }

    /// 第3版的镜像数据整体后移一个扇区
    pub const fn data_bias(&self) -> usize {
        if self.version == 3 { 512 } else { 0 }
    }
}
