use alloc::vec;
use alloc::vec::Vec;

use block_dev::{BlockCache, SECTOR_SIZE, SectorId};
use byteorder::{ByteOrder, LittleEndian};
use vfs::{Error, FileCursor, FileSystem, FsKind, HandleStack, Result, Whence};

use crate::dir::DirEntries;
use crate::inode::{BlockTier, Inode, ROOT_INODE};
use crate::superblock::SuperBlock;

/// 块组描述符的大小
const GROUP_DESC_SIZE: usize = 32;

/// 挂载时读入、此后不变的几何信息
#[derive(Debug)]
struct Geometry {
    /// 分区起点
    start: SectorId,
    sb: SuperBlock,
    /// 每个块组的inode表起始块
    inode_tables: Vec<u32>,
}

#[derive(Debug)]
struct Ext2File {
    inode: Inode,
    cursor: FileCursor,
}

#[derive(Debug)]
pub struct Ext2FileSystem {
    geo: Geometry,
    /// 块内读取与目录扫描共用
    block_buf: Vec<u8>,
    files: HandleStack<Ext2File>,
}

impl Ext2FileSystem {
    pub fn mount(cache: &mut BlockCache, start: SectorId) -> Result<Self> {
        let mut raw = [0u8; 2 * SECTOR_SIZE];
        cache.read_cached(&mut raw, start + SuperBlock::SECTOR, 2)?;
        let sb = SuperBlock::parse(&raw)?;
        log::info!(
            "ext2 at sector {start}: {} byte blocks, {} groups",
            sb.block_size(),
            sb.group_count()
        );

        let mut geo = Geometry {
            start,
            sb,
            inode_tables: Vec::new(),
        };

        let table_bytes = geo.sb.group_count() * GROUP_DESC_SIZE;
        let sectors = table_bytes.div_ceil(SECTOR_SIZE);
        let mut table = vec![0u8; sectors * SECTOR_SIZE];
        cache.read_cached(&mut table, geo.block_sector(geo.sb.group_table_block()), sectors)?;
        // 只需要bg_inode_table
        geo.inode_tables = table[..table_bytes]
            .chunks_exact(GROUP_DESC_SIZE)
            .map(|desc| LittleEndian::read_u32(&desc[8..]))
            .collect();

        let block_size = geo.sb.block_size();
        Ok(Self {
            geo,
            block_buf: vec![0; block_size],
            files: HandleStack::new(),
        })
    }

    pub fn block_size(&self) -> usize {
        self.geo.sb.block_size()
    }
}

impl Geometry {
    fn block_sector(&self, block: u32) -> SectorId {
        self.start + block as usize * self.sb.block_sectors()
    }

    fn read_block(&self, cache: &mut BlockCache, block: u32, dst: &mut [u8]) -> Result<()> {
        cache.read_cached(dst, self.block_sector(block), self.sb.block_sectors())?;
        Ok(())
    }

    fn inode(&self, cache: &mut BlockCache, num: u32) -> Result<Inode> {
        let index = num.checked_sub(1).ok_or(Error::Corrupted("inode number 0"))?;
        let per_group = self.sb.inodes_per_group();
        let table = *self
            .inode_tables
            .get((index / per_group) as usize)
            .ok_or(Error::Corrupted("inode number beyond the last group"))?;

        let record = self.sb.inode_record_size();
        let offset = (index % per_group) as usize * record;
        let block_size = self.sb.block_size();
        let block = table + (offset / block_size) as u32;
        let offset = offset % block_size;

        // 只读inode所在的扇区
        let first = offset / SECTOR_SIZE;
        let last = (offset + record).div_ceil(SECTOR_SIZE);
        let mut raw = vec![0u8; (last - first) * SECTOR_SIZE];
        cache.read_cached(&mut raw, self.block_sector(block) + first, last - first)?;

        let skip = offset - first * SECTOR_SIZE;
        Ok(Inode::parse(&raw[skip..skip + record]))
    }

    /// 间接块`table`中第`index`个块号，只读取其所在的扇区
    fn indirect(&self, cache: &mut BlockCache, table: u32, index: usize) -> Result<u32> {
        if table == 0 {
            return Ok(0);
        }
        let offset = index * 4;
        let mut sector = [0u8; SECTOR_SIZE];
        cache.read_cached(&mut sector, self.block_sector(table) + offset / SECTOR_SIZE, 1)?;
        Ok(LittleEndian::read_u32(&sector[offset % SECTOR_SIZE..]))
    }

    /// 逻辑块号到物理块号，0表示空洞
    fn data_block(&self, cache: &mut BlockCache, inode: &Inode, num: usize) -> Result<u32> {
        let per_block = self.sb.block_size() / 4;
        match BlockTier::of(num, per_block)? {
            BlockTier::Direct(i) => Ok(inode.block(i)),
            BlockTier::Single(i) => self.indirect(cache, inode.block(12), i),
            BlockTier::Double(i, j) => {
                let table = self.indirect(cache, inode.block(13), i)?;
                self.indirect(cache, table, j)
            }
        }
    }

    fn read_data_block(
        &self,
        cache: &mut BlockCache,
        inode: &Inode,
        num: usize,
        dst: &mut [u8],
    ) -> Result<()> {
        match self.data_block(cache, inode, num)? {
            0 => {
                dst.fill(0);
                Ok(())
            }
            block => self.read_block(cache, block, dst),
        }
    }

    /// 读取`[offset, offset + dst.len())`，调用者保证不越过文件末尾
    fn read_data(
        &self,
        cache: &mut BlockCache,
        inode: &Inode,
        offset: usize,
        dst: &mut [u8],
        block_buf: &mut [u8],
    ) -> Result<()> {
        if dst.is_empty() {
            return Ok(());
        }

        let block_size = self.sb.block_size();
        let first = offset / block_size;
        let last = (offset + dst.len() - 1) / block_size;
        let mut in_block = offset % block_size;

        // 块内读取
        if first == last {
            self.read_data_block(cache, inode, first, block_buf)?;
            dst.copy_from_slice(&block_buf[in_block..in_block + dst.len()]);
            return Ok(());
        }

        // 跨块读取
        let mut read = 0;
        for num in first..=last {
            let take = (block_size - in_block).min(dst.len() - read);
            let out = &mut dst[read..read + take];
            if take == block_size {
                self.read_data_block(cache, inode, num, out)?;
            } else {
                self.read_data_block(cache, inode, num, block_buf)?;
                out.copy_from_slice(&block_buf[in_block..in_block + take]);
            }
            read += take;
            in_block = 0;
        }

        Ok(())
    }

    /// 在目录中按字节比较名称，返回inode号
    fn find_entry(
        &self,
        cache: &mut BlockCache,
        dir: &Inode,
        name: &[u8],
        block_buf: &mut [u8],
    ) -> Result<Option<u32>> {
        let block_size = self.sb.block_size();

        for num in 0..dir.size().div_ceil(block_size) {
            self.read_data_block(cache, dir, num, block_buf)?;
            let valid = block_size.min(dir.size() - num * block_size);

            let mut entries = DirEntries::new(&block_buf[..valid]);
            if let Some(entry) = entries.by_ref().find(|entry| entry.name == name) {
                return Ok(Some(entry.inode));
            }
            if entries.is_broken() {
                break;
            }
        }

        Ok(None)
    }

    fn resolve(&self, cache: &mut BlockCache, path: &str, block_buf: &mut [u8]) -> Result<Inode> {
        let mut inode = self.inode(cache, ROOT_INODE)?;

        for name in path.split('/').filter(|name| !name.is_empty()) {
            if !inode.kind().is_dir() {
                return Err(Error::NotADirectory);
            }
            let num = self
                .find_entry(cache, &inode, name.as_bytes(), block_buf)?
                .ok_or(Error::NotFound)?;
            log::trace!("{name} -> inode {num}");
            inode = self.inode(cache, num)?;
        }

        Ok(inode)
    }
}

impl FileSystem for Ext2FileSystem {
    fn kind(&self) -> FsKind {
        FsKind::Ext2
    }

    fn open(&mut self, cache: &mut BlockCache, path: &str) -> Result<usize> {
        let inode = self.geo.resolve(cache, path, &mut self.block_buf)?;
        if inode.kind().is_dir() {
            return Err(Error::IsADirectory);
        }

        let cursor = FileCursor::new(inode.size());
        self.files.push(Ext2File { inode, cursor })
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
        self.geo.read_data(
            cache,
            &file.inode,
            file.cursor.position(),
            &mut buf[..len],
            &mut self.block_buf,
        )?;
        file.cursor.advance(len);
        Ok(len)
    }
}
