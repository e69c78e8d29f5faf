use alloc::vec::Vec;

use block_dev::{BlockCache, SECTOR_SIZE, SectorId};
use byteorder::{BigEndian, ByteOrder};
use vfs::{FsKind, Result};

use super::{PartitionDescriptor, PartitionTag};

/// 驱动描述块（0号块）的签名
pub const DRIVER_SIGNATURE: [u8; 2] = *b"ER";

const ENTRY_SIGNATURE: [u8; 2] = *b"PM";

const FIRMWARE: &str = "Apple_MDFW";
const HFS: &str = "Apple_HFS";

/// 分区图的块大小（0号块中sbBlkSize的高字节）折算为512字节扇区数
pub fn block_multiplier(blk0: &[u8]) -> usize {
    (blk0[2] as usize / 2).max(1)
}

/// 以NUL结尾的pmParType
fn partition_type(entry: &[u8]) -> &[u8] {
    let raw = &entry[48..80];
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    &raw[..len]
}

pub fn scan(cache: &mut BlockCache, blk0: &[u8]) -> Result<Vec<PartitionDescriptor>> {
    let mul = block_multiplier(blk0);
    let mut entry = [0u8; SECTOR_SIZE];
    let mut parts = Vec::new();

    // 分区图的长度记在每个表项里，读到第一项才知道
    let mut map_len = 1;
    let mut n = 1;
    while n <= map_len {
        cache.read_cached(&mut entry, SectorId::new(n * mul), 1)?;
        if entry[0..2] != ENTRY_SIGNATURE {
            break;
        }
        map_len = BigEndian::read_u32(&entry[4..]) as usize;
        let start = BigEndian::read_u32(&entry[8..]) as usize * mul;

        let found = match partition_type(&entry) {
            ty if ty == FIRMWARE.as_bytes() => Some((FIRMWARE, FsKind::Firmware)),
            ty if ty == HFS.as_bytes() => Some((HFS, FsKind::HfsPlus)),
            ty => {
                log::debug!("map entry {n}: ignoring {:?}", core::str::from_utf8(ty));
                None
            }
        };

        if let Some((tag, kind)) = found {
            // 第1项是分区图自身，卷从第2项起编号
            match n.checked_sub(2) {
                Some(index) => parts.push(PartitionDescriptor {
                    index,
                    tag: PartitionTag::Apple(tag),
                    start: SectorId::new(start),
                    kind,
                }),
                None => log::warn!("{tag} in map entry {n} has no volume index"),
            }
        }
        n += 1;
    }
    Ok(parts)
}
