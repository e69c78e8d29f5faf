use alloc::vec;
use alloc::vec::Vec;

use block_dev::{BlockCache, SECTOR_SIZE, SectorId};
use byteorder::{ByteOrder, LittleEndian};
use vfs::{DirEntryType, Error, FileCursor, FileSystem, FsKind, HandleStack, Result, Whence};

use crate::inode::Inode;
use crate::volume::data::DataArea;
use crate::volume::fat::FatArea;
use crate::volume::reserved::{Bpb, FatType};

/// 已挂载的卷
#[derive(Debug)]
pub(crate) struct Volume {
    pub(crate) bpb: Bpb,
    /// FAT区，自带单扇区缓存
    pub(crate) fat: FatArea,
    /// 数据区的起始扇区
    pub(crate) data: DataArea,
    /// 按簇读取时的中转区
    pub(crate) cluster_buf: Vec<u8>,
}

#[derive(Debug)]
struct FatFile {
    inode: Inode,
    cursor: FileCursor,
}

#[derive(Debug)]
pub struct FatFileSystem {
    vol: Volume,
    files: HandleStack<FatFile>,
}

impl FatFileSystem {
    /// 读取分区首扇区并解析BPB
    pub fn mount(cache: &mut BlockCache, start: SectorId) -> Result<Self> {
        let mut boot = [0u8; SECTOR_SIZE];
        cache.read_cached(&mut boot, start, 1)?;
        if LittleEndian::read_u16(&boot[510..]) != 0xAA55 {
            return Err(Error::BadSignature("FAT boot sector"));
        }

        let bpb = Bpb::parse(&boot)?;
        log::info!(
            "{:?} at sector {start}: {} bytes per cluster",
            bpb.fat_type(),
            bpb.cluster_bytes()
        );

        let vol = Volume {
            fat: FatArea::new(start, &bpb),
            data: DataArea::new(start, &bpb),
            cluster_buf: vec![0; bpb.cluster_bytes()],
            bpb,
        };

        Ok(Self {
            vol,
            files: HandleStack::new(),
        })
    }

    pub fn fat_type(&self) -> FatType {
        self.vol.bpb.fat_type()
    }
}

impl FileSystem for FatFileSystem {
    fn kind(&self) -> FsKind {
        FsKind::Fat
    }

    fn open(&mut self, cache: &mut BlockCache, path: &str) -> Result<usize> {
        let inode = Inode::root(&self.vol).find(path, &mut self.vol, cache)?;
        if inode.kind() == DirEntryType::Directory {
            return Err(Error::IsADirectory);
        }

        let cursor = FileCursor::new(inode.size());
        self.files.push(FatFile { inode, cursor })
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
        let read = file
            .inode
            .read_at(file.cursor.position(), &mut buf[..len], &mut self.vol, cache)?;
        file.cursor.advance(read);
        Ok(read)
    }
}
