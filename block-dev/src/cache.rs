//! # 块缓存层
//!
//! 设备读取远慢于内存，因此在内存中保留少量最近用过的物理块。
//! 元数据（FAT、目录、inode、B树节点）反复命中缓存；
//! 大段文件数据应走 [`BlockCache::read_uncached`]，以免把元数据挤出去。
//!
//! 0号扇区只在启动时读一次，永不进入缓存。

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::config::{CACHE_BLOCK_SIZE, CACHE_BLOCKS};
use crate::{DeviceError, Disk, SECTOR_SIZE, SectorId};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// 绕过缓存读取的扇区数
    pub uncached: usize,
}

/// 内存中的缓存槽
#[derive(Debug)]
struct Slot {
    /// 物理传输的起始扇区，`None`表示空槽
    tag: Option<usize>,
    data: Box<[u8]>,
    /// 最近一次使用的序号，空槽为0
    tick: u64,
}

#[derive(Debug)]
pub struct BlockCache {
    disk: Disk,
    slots: Vec<Slot>,
    ticks: u64,
    stats: CacheStats,
}

impl BlockCache {
    pub fn new(disk: Disk) -> Self {
        let slots = (0..CACHE_BLOCKS)
            .map(|_| Slot {
                tag: None,
                data: vec![0; CACHE_BLOCK_SIZE].into_boxed_slice(),
                tick: 0,
            })
            .collect();

        Self {
            disk,
            slots,
            ticks: 0,
            stats: CacheStats::default(),
        }
    }

    pub const fn disk(&self) -> &Disk {
        &self.disk
    }

    pub const fn sector_multiplier(&self) -> usize {
        self.disk.sector_multiplier()
    }

    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// 读取`count`个连续扇区，逐个扇区查缓存。
    pub fn read_cached(
        &mut self,
        dst: &mut [u8],
        sector: SectorId,
        count: usize,
    ) -> Result<(), DeviceError> {
        let Some(dst) = dst.get_mut(..count * SECTOR_SIZE) else {
            return Err(DeviceError {
                sector: sector.get(),
                count,
            });
        };
        for (i, out) in dst.chunks_exact_mut(SECTOR_SIZE).enumerate() {
            self.read_one(out, sector.get() + i)?;
        }
        Ok(())
    }

    /// 直通设备，既不查也不填缓存。
    pub fn read_uncached(
        &mut self,
        dst: &mut [u8],
        sector: SectorId,
        count: usize,
    ) -> Result<(), DeviceError> {
        self.stats.uncached += count;
        self.disk.read(dst, sector.get(), count)
    }

    /// 清空所有槽位
    pub fn invalidate(&mut self) {
        for slot in &mut self.slots {
            slot.tag = None;
            slot.tick = 0;
        }
    }

    /// 扇区所在的物理块是否在缓存中
    pub fn is_cached(&self, sector: SectorId) -> bool {
        let (phys, _) = self.disk.mode().locate(sector.get());
        self.lookup(phys).is_some()
    }

    /// 当前缓存着的物理块，按槽位顺序
    pub fn tags(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().filter_map(|slot| slot.tag)
    }
}

impl BlockCache {
    fn read_one(&mut self, out: &mut [u8], sector: usize) -> Result<(), DeviceError> {
        if sector == 0 {
            self.stats.uncached += 1;
            return self.disk.read(out, 0, 1);
        }

        let mode = self.disk.mode();
        let (phys, offset) = mode.locate(sector);

        let index = match self.lookup(phys) {
            Some(index) => {
                self.stats.hits += 1;
                index
            }
            None => {
                self.stats.misses += 1;
                let index = self.victim();
                log::trace!("cache miss: sector={sector} slot={index}");

                let slot = &mut self.slots[index];
                // 读失败时不能留下错误的标签
                slot.tag = None;
                self.disk
                    .read_transfer(phys, &mut slot.data[..mode.transfer_bytes()])?;
                slot.tag = Some(phys);
                index
            }
        };

        self.ticks += 1;
        let slot = &mut self.slots[index];
        slot.tick = self.ticks;
        out.copy_from_slice(&slot.data[offset..offset + SECTOR_SIZE]);

        Ok(())
    }

    fn lookup(&self, phys: usize) -> Option<usize> {
        self.slots.iter().position(|slot| slot.tag == Some(phys))
    }

    // 块缓存调度策略：踢走最久未用的槽
    fn victim(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.tick)
            .map(|(index, _)| index)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use super::*;
    use crate::mem::MemDisk;
    use crate::TransferMode;

    fn pattern(sectors: usize) -> Vec<u8> {
        (0..sectors * SECTOR_SIZE)
            .map(|i| ((i / SECTOR_SIZE) as u8).wrapping_mul(31) ^ (i as u8))
            .collect()
    }

    fn cache_over(data: Vec<u8>, mode: TransferMode) -> (Arc<MemDisk>, BlockCache) {
        let dev = Arc::new(if mode == TransferMode::Paired {
            MemDisk::new(data).paired()
        } else {
            MemDisk::new(data)
        });
        let cache = BlockCache::new(Disk::with_mode(dev.clone(), mode));
        (dev, cache)
    }

    #[test]
    fn cached_equals_uncached() {
        for mode in [TransferMode::Single, TransferMode::Paired] {
            let (_, mut cache) = cache_over(pattern(64), mode);
            let sequence = [3usize, 5, 3, 17, 0, 9, 40, 41, 2, 3, 63, 17, 5, 1];

            for &sector in &sequence {
                let mut cached = [0u8; 2 * SECTOR_SIZE];
                let mut direct = [0u8; 2 * SECTOR_SIZE];
                let count = if sector < 63 { 2 } else { 1 };
                cache
                    .read_cached(&mut cached, SectorId::new(sector), count)
                    .unwrap();
                cache
                    .read_uncached(&mut direct, SectorId::new(sector), count)
                    .unwrap();
                assert_eq!(cached[..count * SECTOR_SIZE], direct[..count * SECTOR_SIZE]);
            }
        }
    }

    #[test]
    fn tags_are_unique() {
        let (_, mut cache) = cache_over(pattern(32), TransferMode::Single);
        let mut buf = [0u8; SECTOR_SIZE];
        for sector in [1, 2, 1, 3, 2, 1, 4, 5, 6, 7, 8, 9, 10, 1, 2, 3] {
            cache
                .read_cached(&mut buf, SectorId::new(sector), 1)
                .unwrap();
            let mut tags: Vec<_> = cache.tags().collect();
            let len = tags.len();
            tags.sort_unstable();
            tags.dedup();
            assert_eq!(len, tags.len());
        }
    }

    #[test]
    fn evicts_least_recently_used() {
        let (dev, mut cache) = cache_over(pattern(32), TransferMode::Single);
        let mut buf = [0u8; SECTOR_SIZE];

        for sector in 1..=CACHE_BLOCKS {
            cache
                .read_cached(&mut buf, SectorId::new(sector), 1)
                .unwrap();
        }
        // 再次触碰1号，2号便成为最久未用
        cache.read_cached(&mut buf, SectorId::new(1), 1).unwrap();
        let before = dev.reads();
        cache
            .read_cached(&mut buf, SectorId::new(20), 1)
            .unwrap();
        assert_eq!(before + 1, dev.reads());

        assert!(cache.is_cached(SectorId::new(1)));
        assert!(!cache.is_cached(SectorId::new(2)));
        assert!(cache.is_cached(SectorId::new(20)));
    }

    #[test]
    fn hit_does_not_touch_device() {
        let (dev, mut cache) = cache_over(pattern(16), TransferMode::Single);
        let mut buf = [0u8; 3 * SECTOR_SIZE];
        cache.read_cached(&mut buf, SectorId::new(4), 3).unwrap();
        let reads = dev.reads();
        cache.read_cached(&mut buf, SectorId::new(4), 3).unwrap();
        assert_eq!(reads, dev.reads());
        assert_eq!(3, cache.stats().hits);
    }

    #[test]
    fn sector_zero_is_never_cached() {
        let (dev, mut cache) = cache_over(pattern(16), TransferMode::Single);
        let mut buf = [0u8; SECTOR_SIZE];
        cache.read_cached(&mut buf, SectorId::new(0), 1).unwrap();
        cache.read_cached(&mut buf, SectorId::new(0), 1).unwrap();
        assert_eq!(2, dev.reads());
        assert_eq!(0, cache.tags().count());
    }

    #[test]
    fn paired_halves_share_a_slot() {
        let (dev, mut cache) = cache_over(pattern(16), TransferMode::Paired);
        let mut buf = [0u8; SECTOR_SIZE];
        cache.read_cached(&mut buf, SectorId::new(6), 1).unwrap();
        cache.read_cached(&mut buf, SectorId::new(7), 1).unwrap();
        assert_eq!(1, dev.reads());
        assert_eq!(&pattern(16)[7 * SECTOR_SIZE..8 * SECTOR_SIZE], &buf[..]);
    }

    #[test]
    fn device_error_leaves_no_tag() {
        let dev = Arc::new(MemDisk::new(pattern(16)).failing_at(5));
        let mut cache = BlockCache::new(Disk::with_mode(dev, TransferMode::Single));
        let mut buf = [0u8; SECTOR_SIZE];
        let err = cache
            .read_cached(&mut buf, SectorId::new(5), 1)
            .unwrap_err();
        assert_eq!(5, err.sector);
        assert!(!cache.is_cached(SectorId::new(5)));
    }

    #[test]
    fn short_buffer_is_a_device_error() {
        let (dev, mut cache) = cache_over(pattern(16), TransferMode::Single);
        let mut buf = [0u8; SECTOR_SIZE];
        assert_eq!(
            Err(DeviceError { sector: 3, count: 2 }),
            cache.read_cached(&mut buf, SectorId::new(3), 2)
        );
        assert_eq!(
            Err(DeviceError { sector: 3, count: 2 }),
            cache.read_uncached(&mut buf, SectorId::new(3), 2)
        );
        assert_eq!(0, dev.reads());
    }
}
