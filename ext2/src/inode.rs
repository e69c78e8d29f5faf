use byteorder::{ByteOrder, LittleEndian};
use vfs::{DirEntryType, Error, Result};

pub const ROOT_INODE: u32 = 2;

/// 直接块的数量
const DIRECT: usize = 12;

/// inode记录中读取所需的部分
#[derive(Debug, Clone)]
pub struct Inode {
    mode: u16,
    size: u32,
    /// 0..12为直接块，12为一次间接块，13为二次间接块，14为三次间接块
    block: [u32; 15],
}

impl Inode {
    pub fn parse(raw: &[u8]) -> Self {
        let mut block = [0; 15];
        LittleEndian::read_u32_into(&raw[40..100], &mut block);

        Self {
            mode: LittleEndian::read_u16(&raw[0..]),
            size: LittleEndian::read_u32(&raw[4..]),
            block,
        }
    }

    pub fn kind(&self) -> DirEntryType {
        match self.mode & 0xF000 {
            0x4000 => DirEntryType::Directory,
            0x8000 => DirEntryType::Regular,
            0xA000 => DirEntryType::SymLink,
            _ => DirEntryType::Special,
        }
    }

    pub const fn size(&self) -> usize {
        self.size as usize
    }

    pub const fn block(&self, index: usize) -> u32 {
        self.block[index]
    }
}

/// 逻辑块号落在哪一级索引上
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTier {
    /// `i_block[n]`
    Direct(usize),
    /// 一次间接块中的下标
    Single(usize),
    /// 二次间接块中的下标，以及其指向的间接块中的下标
    Double(usize, usize),
}

impl BlockTier {
    /// `per_block`为一个块能容纳的块号个数
    pub fn of(num: usize, per_block: usize) -> Result<Self> {
        if num < DIRECT {
            return Ok(Self::Direct(num));
        }

        let num = num - DIRECT;
        if num < per_block {
            return Ok(Self::Single(num));
        }

        let num = num - per_block;
        if num < per_block * per_block {
            return Ok(Self::Double(num / per_block, num % per_block));
        }

        log::error!("block {} needs triple-indirect lookup", num + DIRECT + per_block);
        Err(Error::TripleIndirect)
    }
}
