use alloc::vec;
use alloc::vec::Vec;

use block_dev::{BlockCache, SECTOR_SIZE};
use vfs::{DirEntryType, Error, Result};

use crate::control::Volume;
use crate::volume::data::*;
use crate::ClusterId;

/// 目录项会指向一个簇链表，这就是FAT文件系统中的inode。
#[derive(Debug, Clone)]
pub(crate) struct Inode {
    start_id: ClusterId,
    ty: DirEntryType,
    size: usize,
    /// FAT16的根目录不在数据区
    is_root: bool,
}

impl Inode {
    pub fn root(vol: &Volume) -> Self {
        Self {
            start_id: vol.bpb.root_cluster(),
            ty: DirEntryType::Directory,
            size: 0,
            is_root: true,
        }
    }

    pub const fn kind(&self) -> DirEntryType {
        self.ty
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    /// 目录
    ///
    /// # 参数
    ///
    /// `relat_path`: 相对于[`Inode`]的路径，空的路径段被忽略。
    pub fn find(&self, relat_path: &str, vol: &mut Volume, cache: &mut BlockCache) -> Result<Self> {
        debug_assert_eq!(self.ty, DirEntryType::Directory);

        let mut inode = self.clone();
        for cmp in relat_path.split('/').filter(|cmp| !cmp.is_empty()) {
            if inode.ty != DirEntryType::Directory {
                log::debug!("Middle segment isn't directory");
                return Err(Error::NotADirectory);
            }
            inode = inode.find_cwd(cmp, vol, cache)?;
        }
        Ok(inode)
    }

    /// 文件
    ///
    /// 从簇链开头快进到`offset`所在的簇，再逐簇经块缓存读取。
    pub fn read_at(
        &self,
        offset: usize,
        buf: &mut [u8],
        vol: &mut Volume,
        cache: &mut BlockCache,
    ) -> Result<usize> {
        debug_assert_eq!(self.ty, DirEntryType::Regular);

        let end = (offset + buf.len()).min(self.size);
        if offset >= end {
            return Ok(0);
        }

        let cluster_bytes = vol.bpb.cluster_bytes();
        let mut cluster = self
            .start_id
            .validate(vol.bpb.fat_type())
            .map_err(|_| Error::Corrupted("file without clusters"))?;
        for _ in 0..offset / cluster_bytes {
            cluster = vol.next_cluster(cache, cluster)?;
        }

        let mut read = 0;
        let mut in_cluster = offset % cluster_bytes;
        loop {
            let take = (cluster_bytes - in_cluster).min(end - offset - read);
            vol.read_cluster(cache, cluster, in_cluster, &mut buf[read..read + take])?;
            read += take;
            in_cluster = 0;

            if offset + read == end {
                break;
            }
            cluster = vol.next_cluster(cache, cluster)?;
        }

        Ok(read)
    }
}

impl Inode {
    /// 目录
    ///
    /// 搜索当前目录下指定名称的项。
    fn find_cwd(&self, name: &str, vol: &mut Volume, cache: &mut BlockCache) -> Result<Self> {
        let mut dir = DirReader::new(self, vol);

        while let Some(dirent) = dir.next(vol, cache)? {
            if dirent.short.is_volume_label() || !dirent.matches(name) {
                continue;
            }
            log::debug!("{name} found at cluster {}", dirent.short.cluster_id());

            let short = &dirent.short;
            let start_id = short.cluster_id();
            // NOTE: 指向根目录的`..`簇号为0
            let is_root = short.kind() == DirEntryType::Directory && start_id == ClusterId::FREE;
            return Ok(Self {
                start_id: if is_root { vol.bpb.root_cluster() } else { start_id },
                ty: short.kind(),
                size: short.size(),
                is_root,
            });
        }

        Err(Error::NotFound)
    }
}

/// 逐个读出目录的原始目录项，一次缓存一个FAT扇区
#[derive(Debug)]
pub(crate) struct DirReader {
    /// FAT16根目录的目录项数；其余目录为`None`，沿簇链读取
    fixed_entries: Option<usize>,
    cluster: ClusterId,
    index: usize,
    buf: Vec<u8>,
    long: LongName,
}

impl DirReader {
    pub fn new(dir: &Inode, vol: &Volume) -> Self {
        let root_entries = vol.bpb.root_entries();
        Self {
            fixed_entries: (dir.is_root && root_entries > 0).then_some(root_entries),
            cluster: dir.start_id,
            index: 0,
            buf: vec![0; vol.bpb.sector_bytes()],
            long: LongName::default(),
        }
    }

    /// 下一个完整的目录项，已跳过删除项
    pub fn next(&mut self, vol: &mut Volume, cache: &mut BlockCache) -> Result<Option<DirEntry>> {
        while let Some(raw) = self.next_raw(vol, cache)? {
            match DirEntryStatus::of(&raw) {
                DirEntryStatus::TailFree => return Ok(None),
                DirEntryStatus::Long => self.long.push(&LongDirEntry::parse(&raw)),
                DirEntryStatus::Free => {}
                DirEntryStatus::Occupied => {
                    let short = ShortDirEntry::parse(&raw, vol.bpb.fat_type());
                    let long_name = self.long.take(&short);
                    return Ok(Some(DirEntry { short, long_name }));
                }
            }
        }
        Ok(None)
    }

    fn next_raw(&mut self, vol: &mut Volume, cache: &mut BlockCache) -> Result<Option<RawDirEntry>> {
        let per_sector = vol.bpb.sector_dirents();
        let index = self.index;
        self.index += 1;

        if self.fixed_entries.is_some_and(|total| index >= total) {
            return Ok(None);
        }

        if index % per_sector == 0 {
            let sector = index / per_sector;
            let lba = match self.fixed_entries {
                Some(_) => vol.data.root_dir() + sector * vol.data.sector_blocks(),
                None => {
                    let in_cluster = sector % vol.data.cluster_sectors();
                    if in_cluster == 0 && index > 0 {
                        match vol.fat.next(cache, self.cluster)? {
                            Some(next) => self.cluster = next,
                            None => return Ok(None),
                        }
                    }
                    if self.cluster.validate(vol.bpb.fat_type()).is_err() {
                        return Ok(None);
                    }
                    vol.data.cluster(self.cluster) + in_cluster * vol.data.sector_blocks()
                }
            };
            cache.read_cached(&mut self.buf, lba, vol.data.sector_blocks())?;
        }

        let offset = (index % per_sector) * 32;
        let mut raw = [0; 32];
        raw.copy_from_slice(&self.buf[offset..offset + 32]);
        Ok(Some(raw))
    }
}

impl Volume {
    fn next_cluster(&mut self, cache: &mut BlockCache, id: ClusterId) -> Result<ClusterId> {
        self.fat
            .next(cache, id)?
            .ok_or(Error::Corrupted("cluster chain ends before the file does"))
    }

    /// 读取簇内`[offset, offset + dst.len())`范围，只读取涉及的扇区
    fn read_cluster(
        &mut self,
        cache: &mut BlockCache,
        id: ClusterId,
        offset: usize,
        dst: &mut [u8],
    ) -> Result<()> {
        let first = offset / SECTOR_SIZE;
        let last = (offset + dst.len()).div_ceil(SECTOR_SIZE);
        let scratch = &mut self.cluster_buf[..(last - first) * SECTOR_SIZE];
        cache.read_cached(scratch, self.data.cluster(id) + first, last - first)?;

        let skip = offset - first * SECTOR_SIZE;
        dst.copy_from_slice(&scratch[skip..skip + dst.len()]);
        Ok(())
    }
}
