//! # 分区定位
//!
//! 0号扇区以0xAA55结尾是DOS分区表，以`ER`开头是Apple分区图，
//! 两者皆非则无法引导。扫描只读设备，重复扫描得到相同的结果。

mod apple;
mod dos;

use alloc::vec::Vec;

use block_dev::{BlockCache, SECTOR_SIZE, SectorId};
use byteorder::{ByteOrder, LittleEndian};
use derive_more::Display;
use vfs::{Error, FsKind, Result};

pub use self::{apple::block_multiplier, dos::logical_multiplier};

/// 分区表中的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PartitionTag {
    #[display(fmt = "{:#04x}", _0)]
    Dos(u8),
    #[display(fmt = "{}", _0)]
    Apple(&'static str),
}

/// 认出的分区
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionDescriptor {
    /// 即`(hd0,N)`中的N
    pub index: usize,
    pub tag: PartitionTag,
    /// 分区起点，已按块大小换算为逻辑扇区
    pub start: SectorId,
    pub kind: FsKind,
}

pub fn scan(cache: &mut BlockCache) -> Result<Vec<PartitionDescriptor>> {
    let mut sector0 = [0u8; SECTOR_SIZE];
    cache.read_uncached(&mut sector0, SectorId::new(0), 1)?;

    let parts = if LittleEndian::read_u16(&sector0[510..]) == dos::SIGNATURE {
        log::info!("Detected DOS partition table");
        dos::scan(cache, &sector0)?
    } else if sector0[0..2] == apple::DRIVER_SIGNATURE {
        log::info!("Detected Apple partition map");
        apple::scan(cache, &sector0)?
    } else {
        log::error!(
            "Invalid MBR: {:02x?} .. {:02x?}",
            &sector0[..16],
            &sector0[SECTOR_SIZE - 16..]
        );
        return Err(Error::UnknownPartitionScheme);
    };

    for part in &parts {
        log::info!(
            "partition {}: type {} at sector {} -> {}",
            part.index,
            part.tag,
            part.start,
            part.kind
        );
    }
    Ok(parts)
}
