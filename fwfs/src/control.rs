use alloc::vec::Vec;

use block_dev::{BlockCache, SECTOR_SIZE, SectorId};
use vfs::{Error, FileCursor, FileSystem, FsKind, HandleStack, Result, Whence};

use crate::config::MAX_IMAGES;
use crate::{FirmwareHeader, ImageRecord, Selector};

/// 二级镜像表在镜像首扇区内的偏移
const NESTED_TABLE: usize = 0x100;

#[derive(Debug)]
struct FwFile {
    /// 相对分区起点的字节偏移
    dev_offset: usize,
    checksum: u32,
    cursor: FileCursor,
}

/// 固件分区，所有读取都不经过块缓存
#[derive(Debug)]
pub struct FirmwareFileSystem {
    start: SectorId,
    header: FirmwareHeader,
    images: Vec<ImageRecord>,
    sector_buf: [u8; SECTOR_SIZE],
    files: HandleStack<FwFile>,
}

impl FirmwareFileSystem {
    pub fn mount(cache: &mut BlockCache, start: SectorId) -> Result<Self> {
        let mut sector = [0u8; SECTOR_SIZE];
        cache.read_uncached(&mut sector, start, 1)?;
        let header = FirmwareHeader::parse(&sector)?;

        cache.read_uncached(&mut sector, start + header.table_sector(), 1)?;
        let images: Vec<_> = sector
            .chunks_exact(ImageRecord::SIZE)
            .take(MAX_IMAGES)
            .filter_map(ImageRecord::parse)
            .collect();

        log::info!(
            "fwfs at sector {start}: version {}, {} images",
            header.version,
            images.len()
        );
        for image in &images {
            log::debug!(
                "image {}: {} bytes at {:#x}, entry {:#x}, checksum {:#010x}",
                image.tag,
                image.len,
                image.dev_offset,
                image.entry_offset,
                image.checksum
            );
        }

        Ok(Self {
            start,
            header,
            images,
            sector_buf: [0; SECTOR_SIZE],
            files: HandleStack::new(),
        })
    }

    pub const fn header(&self) -> &FirmwareHeader {
        &self.header
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    /// 镜像数据在磁盘上的字节地址
    fn data_addr(&self, dev_offset: usize) -> usize {
        self.start.get() * SECTOR_SIZE + self.header.data_bias() + dev_offset
    }

    /// 把`master`开头当作二级镜像表，取其中第`n`项
    fn nested(&mut self, cache: &mut BlockCache, master: &ImageRecord, n: u8) -> Result<ImageRecord> {
        let addr = self.data_addr(master.dev_offset as usize);
        let at = addr % SECTOR_SIZE + NESTED_TABLE + n as usize * ImageRecord::SIZE;
        if at + ImageRecord::SIZE > SECTOR_SIZE {
            log::error!("image {} is misaligned, can't load nested image {n}", master.tag);
            return Err(Error::MisalignedImageTable);
        }

        cache.read_uncached(&mut self.sector_buf, SectorId::new(addr / SECTOR_SIZE), 1)?;
        ImageRecord::parse(&self.sector_buf[at..at + ImageRecord::SIZE])
            .filter(|sub| sub.tag.is_letters())
            .ok_or(Error::NotFound)
    }
}

/// 从字节地址`addr`读满`dst`：首尾零散部分经过`sector_buf`
fn read_bytes(
    cache: &mut BlockCache,
    mut addr: usize,
    dst: &mut [u8],
    sector_buf: &mut [u8; SECTOR_SIZE],
) -> Result<()> {
    let mut read = 0;
    while read < dst.len() {
        let sector = SectorId::new(addr / SECTOR_SIZE);
        let in_sector = addr % SECTOR_SIZE;
        let left = dst.len() - read;

        let take = if in_sector != 0 || left < SECTOR_SIZE {
            let take = left.min(SECTOR_SIZE - in_sector);
            cache.read_uncached(sector_buf, sector, 1)?;
            dst[read..read + take].copy_from_slice(&sector_buf[in_sector..in_sector + take]);
            take
        } else {
            let count = left / SECTOR_SIZE;
            cache.read_uncached(&mut dst[read..read + count * SECTOR_SIZE], sector, count)?;
            count * SECTOR_SIZE
        };
        read += take;
        addr += take;
    }
    Ok(())
}

impl FileSystem for FirmwareFileSystem {
    fn kind(&self) -> FsKind {
        FsKind::Firmware
    }

    fn open(&mut self, cache: &mut BlockCache, path: &str) -> Result<usize> {
        let (tag, selector) = Selector::split(path).ok_or(Error::NotFound)?;
        let image = *self
            .images
            .iter()
            .find(|image| image.tag == tag)
            .ok_or(Error::NotFound)?;

        let (dev_offset, len) = match selector {
            Selector::Whole => (image.dev_offset as usize, image.len),
            Selector::Code => {
                let len = image
                    .len
                    .checked_sub(image.entry_offset)
                    .ok_or(Error::Corrupted("entry offset beyond the image"))?;
                (image.dev_offset as usize + image.entry_offset as usize, len)
            }
            Selector::Nested(n) => {
                let sub = self.nested(cache, &image, n)?;
                log::debug!("{tag}{n} -> {}", sub.tag);
                (sub.dev_offset as usize, sub.len)
            }
        };

        self.files.push(FwFile {
            dev_offset,
            checksum: image.checksum,
            cursor: FileCursor::new(len as usize),
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
        let file = self.files.get(fd)?;
        let len = file.cursor.clamp(buf.len());
        let addr = self.data_addr(file.dev_offset + file.cursor.position());

        read_bytes(cache, addr, &mut buf[..len], &mut self.sector_buf)?;
        self.files.get_mut(fd)?.cursor.advance(len);
        Ok(len)
    }

    fn get_info(&self, fd: usize) -> Result<Option<u32>> {
        Ok(Some(self.files.get(fd)?.checksum))
    }
}
