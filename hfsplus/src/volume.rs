use block_dev::SECTOR_SIZE;
use byteorder::{BigEndian, ByteOrder};
use vfs::{Error, Result};

use crate::Fork;

/// HFS+卷头（即MDB）
#[derive(Debug, Clone)]
pub struct VolumeHeader {
    block_size: usize,
    file_count: u32,
    folder_count: u32,
    catalog: Fork,
}

impl VolumeHeader {
    /// 卷头位于分区内第1024字节
    pub const SECTOR: usize = 2;
    pub const SIGNATURE: [u8; 2] = *b"H+";

    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw[0..2] != Self::SIGNATURE {
            return Err(Error::BadSignature("HFS+ volume header"));
        }

        let block_size = BigEndian::read_u32(&raw[40..]) as usize;
        if block_size == 0 || block_size % SECTOR_SIZE != 0 {
            return Err(Error::UnsupportedFormat("HFS+ block size"));
        }

        let catalog = Fork::parse(&raw[272..272 + Fork::SIZE]);
        catalog.check_coverage()?;

        Ok(Self {
            block_size,
            file_count: BigEndian::read_u32(&raw[32..]),
            folder_count: BigEndian::read_u32(&raw[36..]),
            catalog,
        })
    }

    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    pub const fn file_count(&self) -> u32 {
        self.file_count
    }

    pub const fn folder_count(&self) -> u32 {
        self.folder_count
    }

    pub const fn catalog(&self) -> &Fork {
        &self.catalog
    }
}
