use alloc::vec::Vec;

use block_dev::{BlockCache, SECTOR_SIZE, SectorId};
use byteorder::{ByteOrder, LittleEndian};
use vfs::{FsKind, Result};

use super::{PartitionDescriptor, PartitionTag};

pub const SIGNATURE: u16 = 0xAA55;

const TABLE: usize = 0x1BE;
const ENTRY_SIZE: usize = 16;
const SLOTS: usize = 4;

/// MBR代码区第11、12字节记录的块大小（常见`02 00`、`00 02`、`00 08`）折算出的倍数，
/// 不在1..=4时取1
pub fn logical_multiplier(mbr: &[u8]) -> usize {
    let mul = (mbr[12] | mbr[11]) as usize / 2;
    if (1..=4).contains(&mul) { mul } else { 1 }
}

/// 按分区类型在候选起点上找签名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Fat,
    Ext2,
    Firmware,
}

impl Probe {
    const fn of(ty: u8) -> Option<Self> {
        match ty {
            0x04 | 0x06 | 0x0E | 0x0B | 0x0C => Some(Self::Fat),
            0x83 => Some(Self::Ext2),
            0x00 => Some(Self::Firmware),
            _ => None,
        }
    }

    const fn kind(self) -> FsKind {
        match self {
            Self::Fat => FsKind::Fat,
            Self::Ext2 => FsKind::Ext2,
            Self::Firmware => FsKind::Firmware,
        }
    }

    /// 以`lba * mul`为分区起点找签名，地址溢出算作不匹配
    fn find(self, cache: &mut BlockCache, lba: usize, mul: usize) -> Result<Option<usize>> {
        let Some(start) = lba.checked_mul(mul) else {
            log::debug!("lba {lba} * {mul} overflows");
            return Ok(None);
        };
        let at = match self {
            // 超级块在分区内第1024字节
            Self::Ext2 => start.checked_add(2),
            Self::Fat | Self::Firmware => Some(start),
        };
        let Some(at) = at else {
            return Ok(None);
        };

        let mut sector = [0u8; SECTOR_SIZE];
        cache.read_uncached(&mut sector, SectorId::new(at), 1)?;
        let found = match self {
            Self::Fat => LittleEndian::read_u16(&sector[510..]) == 0xAA55,
            Self::Ext2 => LittleEndian::read_u16(&sector[56..]) == 0xEF53,
            Self::Firmware => sector[0x100..0x104] == *b"]ih[",
        };
        Ok(found.then_some(start))
    }
}

pub fn scan(cache: &mut BlockCache, mbr: &[u8]) -> Result<Vec<PartitionDescriptor>> {
    let sector_mul = cache.sector_multiplier();
    let logical_mul = logical_multiplier(mbr);
    log::debug!("sector multiplier {sector_mul}, logical block multiplier {logical_mul}");

    let mut parts = Vec::new();
    let table = &mbr[TABLE..TABLE + SLOTS * ENTRY_SIZE];
    for (index, entry) in table.chunks_exact(ENTRY_SIZE).enumerate() {
        let ty = entry[4];
        let lba = LittleEndian::read_u32(&entry[8..]) as usize;
        let Some(probe) = Probe::of(ty) else {
            log::debug!("slot {index}: unsupported type {ty:#04x}");
            continue;
        };
        // 空槽
        if ty == 0 && lba == 0 {
            continue;
        }

        // 有的机器上两种倍数不一致，只能逐个试
        let mut found = probe.find(cache, lba, sector_mul)?;
        if logical_mul != 1 && logical_mul != sector_mul {
            found = probe.find(cache, lba, logical_mul)?.or(found);
        }
        let start = found.unwrap_or_else(|| {
            log::warn!("slot {index}: no {} signature near lba {lba}", probe.kind());
            lba
        });

        parts.push(PartitionDescriptor {
            index,
            tag: PartitionTag::Dos(ty),
            start: SectorId::new(start),
            kind: probe.kind(),
        });
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec;

    use block_dev::Disk;
    use block_dev::mem::MemDisk;

    use super::*;

    #[test]
    fn overflowing_offset_is_a_miss() {
        let dev = Arc::new(MemDisk::new(vec![0u8; 8 * SECTOR_SIZE]));
        let mut cache = BlockCache::new(Disk::new(dev.clone()));
        let reads = dev.reads();

        assert_eq!(Ok(None), Probe::Fat.find(&mut cache, usize::MAX / 2, 4));
        assert_eq!(Ok(None), Probe::Ext2.find(&mut cache, usize::MAX, 1));
        assert_eq!(reads, dev.reads());
        assert_eq!(Ok(None), Probe::Firmware.find(&mut cache, 1, 2));
    }
}
