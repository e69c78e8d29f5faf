use core::num::{NonZeroU8, NonZeroU16};

use block_dev::SECTOR_SIZE;
use byteorder::{ByteOrder, LittleEndian};
use vfs::{Error, Result};

use crate::ClusterId;

/// FAT条目宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat16,
    Fat32,
}

impl FatType {
    pub const fn entry_bytes(self) -> usize {
        match self {
            Self::Fat16 => 2,
            Self::Fat32 => 4,
        }
    }

    /// 不小于此值的条目表示簇链结束
    pub const fn chain_end(self) -> u32 {
        match self {
            Self::Fat16 => 0xFFF0,
            Self::Fat32 => 0x0FFF_FFF0,
        }
    }
}

/// BIOS Parameter Block BIOS参数块
/// 位于保留区的第一扇区，该扇区又名启动扇区。
///
/// 只保留读取所需的几何信息。
#[derive(Debug, Clone)]
pub struct Bpb {
    /// 一个扇区的字节量，512的整数倍
    byts_per_sec: NonZeroU16,
    /// 一个簇的扇区数
    sec_per_clus: NonZeroU8,
    /// 保留区的扇区数
    rsvd_sec_cnt: u16,
    /// 此卷的文件分配表(FAT)数量
    num_fats: NonZeroU8,
    /// FAT占用扇区数
    fat_sz: u32,
    /// - FAT16: 根目录的目录项数
    /// - FAT32: 0
    root_ent_cnt: u16,
    /// 根目录首个簇的编号，FAT16恒为2
    root_clus: ClusterId,
    ty: FatType,
}

impl Bpb {
    const FAT16_TAG: &'static [u8] = b"FAT16   ";
    const FAT32_TAG: &'static [u8] = b"FAT32   ";

    /// 解析启动扇区，调用者已校验过0xAA55
    pub fn parse(boot: &[u8]) -> Result<Self> {
        let le16 = |offset: usize| LittleEndian::read_u16(&boot[offset..]);
        let le32 = |offset: usize| LittleEndian::read_u32(&boot[offset..]);

        let byts_per_sec = NonZeroU16::new(le16(11))
            .filter(|bps| usize::from(bps.get()) % SECTOR_SIZE == 0)
            .ok_or(Error::Corrupted("FAT bytes per sector"))?;
        let sec_per_clus = NonZeroU8::new(boot[13]).ok_or(Error::Corrupted("FAT sectors per cluster"))?;
        let num_fats = NonZeroU8::new(boot[16]).ok_or(Error::Corrupted("FAT count"))?;
        let rsvd_sec_cnt = le16(14);

        let (ty, fat_sz, root_ent_cnt, root_clus) = if &boot[54..62] == Self::FAT16_TAG {
            (FatType::Fat16, u32::from(le16(22)), le16(17), ClusterId::MIN)
        } else if &boot[82..90] == Self::FAT32_TAG {
            (FatType::Fat32, le32(0x24), 0, ClusterId::new(le32(0x2C)))
        } else {
            return Err(Error::UnsupportedFormat("neither FAT16 nor FAT32"));
        };

        Ok(Self {
            byts_per_sec,
            sec_per_clus,
            rsvd_sec_cnt,
            num_fats,
            fat_sz,
            root_ent_cnt,
            root_clus,
            ty,
        })
    }

    pub const fn fat_type(&self) -> FatType {
        self.ty
    }

    pub const fn sector_bytes(&self) -> usize {
        self.byts_per_sec.get() as usize
    }

    /// 一个FAT扇区对应多少个512字节的逻辑块
    pub const fn sector_blocks(&self) -> usize {
        self.sector_bytes() / SECTOR_SIZE
    }

    pub const fn cluster_sectors(&self) -> usize {
        self.sec_per_clus.get() as usize
    }

    pub const fn cluster_bytes(&self) -> usize {
        self.sector_bytes() * self.cluster_sectors()
    }

    pub const fn reserved_sectors(&self) -> usize {
        self.rsvd_sec_cnt as usize
    }

    /// 保留区与全部FAT占用的扇区数
    pub const fn fat_area_end(&self) -> usize {
        self.reserved_sectors() + self.num_fats.get() as usize * self.fat_sz as usize
    }

    /// FAT16根目录的目录项数，FAT32为0
    pub const fn root_entries(&self) -> usize {
        self.root_ent_cnt as usize
    }

    /// FAT16固定根目录占用的扇区数
    pub const fn root_dir_sectors(&self) -> usize {
        (self.root_entries() * 32).div_ceil(self.sector_bytes())
    }

    pub const fn root_cluster(&self) -> ClusterId {
        self.root_clus
    }

    pub const fn sector_dirents(&self) -> usize {
        self.sector_bytes() / 32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boot_sector(tag_at: usize, tag: &[u8]) -> [u8; 512] {
        let mut boot = [0u8; 512];
        boot[11..13].copy_from_slice(&512u16.to_le_bytes());
        boot[13] = 4;
        boot[14..16].copy_from_slice(&32u16.to_le_bytes());
        boot[16] = 2;
        boot[17..19].copy_from_slice(&512u16.to_le_bytes());
        boot[22..24].copy_from_slice(&20u16.to_le_bytes());
        boot[0x24..0x28].copy_from_slice(&100u32.to_le_bytes());
        boot[0x2C..0x30].copy_from_slice(&5u32.to_le_bytes());
        boot[tag_at..tag_at + 8].copy_from_slice(tag);
        boot[510] = 0x55;
        boot[511] = 0xAA;
        boot
    }

    #[test]
    fn fat32_geometry() {
        let bpb = Bpb::parse(&boot_sector(82, b"FAT32   ")).unwrap();
        assert_eq!(FatType::Fat32, bpb.fat_type());
        assert_eq!(2048, bpb.cluster_bytes());
        assert_eq!(32 + 2 * 100, bpb.fat_area_end());
        assert_eq!(ClusterId::new(5), bpb.root_cluster());
        assert_eq!(0, bpb.root_dir_sectors());
    }

    #[test]
    fn fat16_geometry() {
        let bpb = Bpb::parse(&boot_sector(54, b"FAT16   ")).unwrap();
        assert_eq!(FatType::Fat16, bpb.fat_type());
        assert_eq!(32 + 2 * 20, bpb.fat_area_end());
        assert_eq!(32, bpb.root_dir_sectors());
        assert_eq!(ClusterId::MIN, bpb.root_cluster());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(matches!(
            Bpb::parse(&boot_sector(82, b"FAT12   ")),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
