use byteorder::{BigEndian, ByteOrder};
use vfs::{Error, Result};

/// 连续的分配块
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub start: u32,
    pub count: u32,
}

/// HFSPlusForkData：卷头与文件记录中都只内嵌前8个extent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fork {
    pub logical_size: u64,
    pub total_blocks: u32,
    pub extents: [Extent; Self::EXTENTS],
}

impl Fork {
    pub const SIZE: usize = 80;
    pub const EXTENTS: usize = 8;

    pub fn parse(raw: &[u8]) -> Self {
        let mut extents = [Extent::default(); Self::EXTENTS];
        for (extent, raw) in extents.iter_mut().zip(raw[16..Self::SIZE].chunks_exact(8)) {
            *extent = Extent {
                start: BigEndian::read_u32(raw),
                count: BigEndian::read_u32(&raw[4..]),
            };
        }

        Self {
            logical_size: BigEndian::read_u64(raw),
            total_blocks: BigEndian::read_u32(&raw[12..]),
            extents,
        }
    }

    /// 内嵌的extent必须覆盖全部分配块，剩下的在extents overflow文件里
    pub fn check_coverage(&self) -> Result<()> {
        let covered: u64 = self.extents.iter().map(|ext| u64::from(ext.count)).sum();
        if covered != u64::from(self.total_blocks) {
            log::error!(
                "fork of {} blocks only has {covered} in its extent record",
                self.total_blocks
            );
            return Err(Error::ExtentsOverflow);
        }
        Ok(())
    }

    /// fork内的字节偏移 -> (分区内的字节地址, 所在extent剩余的字节数)
    pub fn map(&self, offset: u64, block_size: usize) -> Option<(u64, u64)> {
        let block_size = block_size as u64;
        let mut rest = offset;
        for ext in self.extents.iter().take_while(|ext| ext.count > 0) {
            let bytes = u64::from(ext.count) * block_size;
            if rest < bytes {
                return Some((u64::from(ext.start) * block_size + rest, bytes - rest));
            }
            rest -= bytes;
        }
        None
    }
}
