use alloc::vec::Vec;

use block_dev::{BlockCache, SECTOR_SIZE, SectorId};
use vfs::{Error, FileCursor, FileSystem, FsKind, HandleStack, Result, Whence};

use crate::btree::{CatalogTree, NodeBuffer};
use crate::{BTreeHeader, CatalogKey, CatalogRecord, Fork, ROOT_FOLDER_ID, VolumeHeader};

/// 分区位置与分配块大小
#[derive(Debug, Clone, Copy)]
pub(crate) struct Geometry {
    pub start: SectorId,
    pub block_size: usize,
}

#[derive(Debug)]
struct HfsFile {
    /// 从目录记录拷出的数据fork
    fork: Fork,
    cursor: FileCursor,
}

#[derive(Debug)]
pub struct HfsPlusFileSystem {
    pub(crate) geo: Geometry,
    volume: VolumeHeader,
    pub(crate) tree: CatalogTree,
    pub(crate) nodes: NodeBuffer,
    /// 不足一个扇区的读取经过这里
    sector_buf: [u8; SECTOR_SIZE],
    files: HandleStack<HfsFile>,
}

impl HfsPlusFileSystem {
    pub fn mount(cache: &mut BlockCache, start: SectorId) -> Result<Self> {
        let mut raw = [0u8; SECTOR_SIZE];
        cache.read_cached(&mut raw, start + VolumeHeader::SECTOR, 1)?;
        let volume = VolumeHeader::parse(&raw)?;
        let geo = Geometry {
            start,
            block_size: volume.block_size(),
        };

        let fork = volume.catalog().clone();
        let (addr, _) = fork
            .map(0, geo.block_size)
            .ok_or(Error::Corrupted("empty catalog file"))?;
        cache.read_cached(&mut raw, start + (addr / SECTOR_SIZE as u64) as usize, 1)?;
        let header = BTreeHeader::parse(&raw)?;

        log::info!(
            "hfs+ at sector {start}: {} byte blocks, {} files, catalog depth {} with {} byte nodes",
            geo.block_size,
            volume.file_count(),
            header.depth,
            header.node_size
        );

        Ok(Self {
            geo,
            volume,
            tree: CatalogTree { fork, header },
            nodes: NodeBuffer::new(header.node_size),
            sector_buf: [0; SECTOR_SIZE],
            files: HandleStack::new(),
        })
    }

    pub const fn volume(&self) -> &VolumeHeader {
        &self.volume
    }

    pub(crate) fn lookup(
        &mut self,
        cache: &mut BlockCache,
        parent: u32,
        name: &str,
    ) -> Result<CatalogRecord> {
        let key = CatalogKey::new(parent, name);
        let record = self
            .tree
            .lookup(cache, &self.geo, &mut self.nodes, &key)?
            .ok_or(Error::NotFound)?;
        CatalogRecord::parse(&record)
    }
}

impl Geometry {
    /// 读取fork内`[offset, offset + dst.len())`，调用者保证不越过逻辑长度
    fn read_fork(
        &self,
        cache: &mut BlockCache,
        fork: &Fork,
        offset: usize,
        dst: &mut [u8],
        sector_buf: &mut [u8; SECTOR_SIZE],
    ) -> Result<()> {
        let mut read = 0;
        while read < dst.len() {
            let (addr, left) = fork
                .map((offset + read) as u64, self.block_size)
                .ok_or(Error::Corrupted("file data beyond its extents"))?;
            let sector = self.start + (addr / SECTOR_SIZE as u64) as usize;
            let in_sector = (addr % SECTOR_SIZE as u64) as usize;
            let want = (dst.len() - read).min(usize::try_from(left).unwrap_or(usize::MAX));
            let out = &mut dst[read..];

            if in_sector != 0 || want < SECTOR_SIZE {
                // 零散部分经过块缓存
                let take = want.min(SECTOR_SIZE - in_sector);
                cache.read_cached(sector_buf, sector, 1)?;
                out[..take].copy_from_slice(&sector_buf[in_sector..in_sector + take]);
                read += take;
            } else {
                // 整扇区直接读进调用者的缓冲区
                let count = want / SECTOR_SIZE;
                cache.read_uncached(&mut out[..count * SECTOR_SIZE], sector, count)?;
                read += count * SECTOR_SIZE;
            }
        }
        Ok(())
    }
}

impl FileSystem for HfsPlusFileSystem {
    fn kind(&self) -> FsKind {
        FsKind::HfsPlus
    }

    fn open(&mut self, cache: &mut BlockCache, path: &str) -> Result<usize> {
        let names: Vec<&str> = path.split('/').filter(|name| !name.is_empty()).collect();
        let (last, dirs) = names.split_last().ok_or(Error::IsADirectory)?;

        let mut parent = ROOT_FOLDER_ID;
        for name in dirs {
            match self.lookup(cache, parent, name)? {
                CatalogRecord::Folder { id } => parent = id,
                CatalogRecord::File { .. } => return Err(Error::NotADirectory),
                CatalogRecord::Thread => return Err(Error::Corrupted("thread record under a name")),
            }
        }

        let fork = match self.lookup(cache, parent, last)? {
            CatalogRecord::File { id, data } => {
                log::debug!("{last} is file {id} in folder {parent}");
                data
            }
            CatalogRecord::Folder { .. } => return Err(Error::IsADirectory),
            CatalogRecord::Thread => return Err(Error::Corrupted("thread record under a name")),
        };
        fork.check_coverage()?;

        let size = usize::try_from(fork.logical_size)
            .map_err(|_| Error::UnsupportedFormat("HFS+ file larger than the address space"))?;
        self.files.push(HfsFile {
            fork,
            cursor: FileCursor::new(size),
        })
    }

    fn close(&mut self, fd: usize) {
        self.files.close(fd);
    }

    fn seek(&mut self, fd: usize, offset: isize, whence: Whence) -> Result<usize> {
        self.files.get_mut(fd)?.cursor.seek(offset, whence)
    }

    fn tell(&self, fd: usize) -> Result<usize> {
        Ok(self.files.get(fd)?.cursor.position())
    }

    fn read(&mut self, cache: &mut BlockCache, fd: usize, buf: &mut [u8]) -> Result<usize> {
        let file = self.files.get_mut(fd)?;
        let len = file.cursor.clamp(buf.len());
        self.geo.read_fork(
            cache,
            &file.fork,
            file.cursor.position(),
            &mut buf[..len],
            &mut self.sector_buf,
        )?;
        file.cursor.advance(len);
        Ok(len)
    }
}
