use byteorder::{ByteOrder, LittleEndian};
use vfs::{Error, Result};

/// 超级块位于分区起点后1024字节处，长1024字节
#[derive(Debug, Clone)]
pub struct SuperBlock {
    inodes_count: u32,
    first_data_block: u32,
    log_block_size: u32,
    inodes_per_group: u32,
    rev_level: u32,
    inode_size: u16,
}

impl SuperBlock {
    pub const MAGIC: u16 = 0xEF53;

    /// 超级块相对分区起点的扇区号
    pub const SECTOR: usize = 2;

    /// 块大小超过4096字节的卷不予支持
    const MAX_LOG_BLOCK_SIZE: u32 = 2;

    pub fn parse(raw: &[u8]) -> Result<Self> {
        let le32 = |offset: usize| LittleEndian::read_u32(&raw[offset..]);

        if LittleEndian::read_u16(&raw[56..]) != Self::MAGIC {
            return Err(Error::BadSignature("ext2 superblock"));
        }

        let sb = Self {
            inodes_count: le32(0),
            first_data_block: le32(20),
            log_block_size: le32(24),
            inodes_per_group: le32(40),
            rev_level: le32(76),
            inode_size: LittleEndian::read_u16(&raw[88..]),
        };

        if sb.log_block_size > Self::MAX_LOG_BLOCK_SIZE {
            return Err(Error::UnsupportedFormat("ext2 block size"));
        }
        if sb.inodes_per_group == 0 {
            return Err(Error::Corrupted("ext2 inodes per group"));
        }
        if sb.inode_record_size() < 128 || sb.inode_record_size() > sb.block_size() {
            return Err(Error::Corrupted("ext2 inode size"));
        }

        Ok(sb)
    }

    pub const fn block_size(&self) -> usize {
        1024 << self.log_block_size
    }

    /// 一个块包含的512字节扇区数
    pub const fn block_sectors(&self) -> usize {
        2 << self.log_block_size
    }

    pub const fn inodes_per_group(&self) -> u32 {
        self.inodes_per_group
    }

    pub const fn inodes_count(&self) -> u32 {
        self.inodes_count
    }

    /// 块组描述符表紧跟超级块所在的块
    pub const fn group_table_block(&self) -> u32 {
        self.first_data_block + 1
    }

    pub const fn group_count(&self) -> usize {
        self.inodes_count.div_ceil(self.inodes_per_group) as usize
    }

    /// 修订版0的inode固定为128字节
    pub const fn inode_record_size(&self) -> usize {
        if self.rev_level == 0 {
            128
        } else {
            self.inode_size as usize
        }
    }
}
