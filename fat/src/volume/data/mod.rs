mod dir_entry;

use block_dev::SectorId;

pub use self::dir_entry::*;
use crate::ClusterId;
use crate::volume::reserved::Bpb;

/// 数据区，以簇编号索引。以下所有扇区号都以512字节为单位。
#[derive(Debug, Clone)]
pub struct DataArea {
    /// 分区起点
    start: SectorId,
    /// 保留区 + FAT区，单位为FAT扇区
    fat_area_end: usize,
    /// FAT16固定根目录占用的FAT扇区数
    root_dir_sectors: usize,
    cluster_sectors: usize,
    sector_blocks: usize,
}

impl DataArea {
    pub fn new(start: SectorId, bpb: &Bpb) -> Self {
        Self {
            start,
            fat_area_end: bpb.fat_area_end(),
            root_dir_sectors: bpb.root_dir_sectors(),
            cluster_sectors: bpb.cluster_sectors(),
            sector_blocks: bpb.sector_blocks(),
        }
    }

    /// FAT16固定根目录的首扇区
    pub fn root_dir(&self) -> SectorId {
        self.start + self.fat_area_end * self.sector_blocks
    }

    /// 返回簇的首扇区，`id`须已校验
    ///
    /// FAT16的数据区排在固定根目录之后；FAT32的根目录也是普通簇链。
    pub fn cluster(&self, id: ClusterId) -> SectorId {
        let sectors = self.fat_area_end + id.data_index() * self.cluster_sectors + self.root_dir_sectors;
        self.start + sectors * self.sector_blocks
    }

    pub const fn sector_blocks(&self) -> usize {
        self.sector_blocks
    }

    pub const fn cluster_sectors(&self) -> usize {
        self.cluster_sectors
    }
}
