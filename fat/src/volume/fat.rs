//! FAT区，条目`n`存放着簇`n`的后继。

use alloc::vec;
use alloc::vec::Vec;

use block_dev::{BlockCache, SectorId};
use byteorder::{ByteOrder, LittleEndian};
use vfs::Result;

use crate::volume::reserved::{Bpb, FatType};
use crate::{ClusterError, ClusterId};

/// 查找簇链时独占的单扇区缓存
///
/// 簇链遍历几乎总是落在同一个FAT扇区上。
#[derive(Debug)]
pub struct FatArea {
    /// 分区起点
    start: SectorId,
    ty: FatType,
    sector_bytes: usize,
    sector_blocks: usize,
    reserved_bytes: usize,
    buf: Vec<u8>,
    /// `buf`保存的是第几个FAT扇区（相对分区起点）
    cached: Option<usize>,
}

impl FatArea {
    pub fn new(start: SectorId, bpb: &Bpb) -> Self {
        Self {
            start,
            ty: bpb.fat_type(),
            sector_bytes: bpb.sector_bytes(),
            sector_blocks: bpb.sector_blocks(),
            reserved_bytes: bpb.reserved_sectors() * bpb.sector_bytes(),
            buf: vec![0; bpb.sector_bytes()],
            cached: None,
        }
    }

    /// 获取下一个簇编号。
    /// `Ok(None)`表示`id`为链表上最后一个簇。
    pub fn next(&mut self, cache: &mut BlockCache, id: ClusterId) -> Result<Option<ClusterId>> {
        let offset = self.reserved_bytes + u32::from(id) as usize * self.ty.entry_bytes();
        let (sector, offset) = (offset / self.sector_bytes, offset % self.sector_bytes);
        self.load(cache, sector)?;

        let raw = match self.ty {
            FatType::Fat32 => LittleEndian::read_u32(&self.buf[offset..]),
            FatType::Fat16 => u32::from(LittleEndian::read_u16(&self.buf[offset..])),
        };

        match ClusterId::new(raw).validate(self.ty) {
            Ok(next) => Ok(Some(next)),
            Err(reason) => {
                if reason != ClusterError::Eof {
                    log::trace!("chain of cluster {id} ends with {reason:?}");
                }
                Ok(None)
            }
        }
    }

    fn load(&mut self, cache: &mut BlockCache, sector: usize) -> Result<()> {
        if self.cached != Some(sector) {
            self.cached = None;
            let lba = self.start + sector * self.sector_blocks;
            cache.read_cached(&mut self.buf, lba, self.sector_blocks)?;
            self.cached = Some(sector);
        }
        Ok(())
    }
}
