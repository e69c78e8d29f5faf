use alloc::boxed::Box;
use alloc::sync::Arc;
use core::array;

use block_dev::{BlockCache, BlockDevice, Disk};
use derive_more::Display;
use ext2::Ext2FileSystem;
use fat::FatFileSystem;
use fwfs::FirmwareFileSystem;
use hfsplus::HfsPlusFileSystem;
use vfs::{Error, FileSystem, FsKind, Result, Whence};

use crate::config::{MAX_FILES, MAX_VOLUMES};
use crate::partition::{self, PartitionDescriptor};
use crate::path::{self, Target};

/// 会话内的文件句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{}", _0)]
pub struct Fd(usize);

impl Fd {
    pub const fn get(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Volume {
    desc: PartitionDescriptor,
    fs: Box<dyn FileSystem>,
}

/// 会话句柄到解码器内部句柄的映射
#[derive(Debug, Clone, Copy)]
struct Handle {
    volume: usize,
    fd: usize,
}

/// 一次引导的存储会话：块缓存、已挂载的卷与打开的文件都归它所有
#[derive(Debug)]
pub struct Storage {
    cache: BlockCache,
    volumes: [Option<Volume>; MAX_VOLUMES],
    handles: [Option<Handle>; MAX_FILES],
}

fn mount_volume(cache: &mut BlockCache, desc: &PartitionDescriptor) -> Result<Box<dyn FileSystem>> {
    Ok(match desc.kind {
        FsKind::Fat => Box::new(FatFileSystem::mount(cache, desc.start)?),
        FsKind::Ext2 => Box::new(Ext2FileSystem::mount(cache, desc.start)?),
        FsKind::HfsPlus => Box::new(HfsPlusFileSystem::mount(cache, desc.start)?),
        FsKind::Firmware => Box::new(FirmwareFileSystem::mount(cache, desc.start)?),
    })
}

/// 致命错误在交给调用者之前记录下来
fn report<T>(result: Result<T>) -> Result<T> {
    result.inspect_err(|err| {
        if err.is_fatal() {
            log::error!("{err}");
        }
    })
}

impl Storage {
    pub fn mount(dev: Arc<dyn BlockDevice>) -> Result<Self> {
        Self::with_disk(Disk::new(dev))
    }

    /// 扫描分区表并挂载所有认得的分区。
    /// 签名不符的分区被跳过，致命错误中止挂载。
    pub fn with_disk(disk: Disk) -> Result<Self> {
        let mut cache = BlockCache::new(disk);
        let parts = report(partition::scan(&mut cache))?;

        let mut volumes: [Option<Volume>; MAX_VOLUMES] = array::from_fn(|_| None);
        for desc in parts {
            let Some(slot) = volumes.get_mut(desc.index) else {
                log::error!("partition {} is past the last volume slot", desc.index);
                return Err(Error::TooManyVolumes);
            };

            match mount_volume(&mut cache, &desc) {
                Ok(fs) => *slot = Some(Volume { desc, fs }),
                Err(err) if err.is_fatal() => {
                    log::error!("partition {}: {err}", desc.index);
                    return Err(err);
                }
                Err(err) => log::warn!("partition {}: no {} here: {err}", desc.index, desc.kind),
            }
        }

        Ok(Self {
            cache,
            volumes,
            handles: [None; MAX_FILES],
        })
    }

    pub const fn cache(&self) -> &BlockCache {
        &self.cache
    }

    /// 已挂载的卷，按分区索引排列
    pub fn volumes(&self) -> impl Iterator<Item = &PartitionDescriptor> {
        self.volumes.iter().flatten().map(|vol| &vol.desc)
    }

    fn find(&self, target: Target) -> Option<usize> {
        let mounted = |i: usize| self.volumes.get(i).is_some_and(Option::is_some);
        match target {
            Target::Kinds(kinds) => kinds.iter().find_map(|&kind| {
                self.volumes
                    .iter()
                    .position(|vol| vol.as_ref().is_some_and(|vol| vol.fs.kind() == kind))
            }),
            Target::Index(i) => mounted(i).then_some(i),
        }
    }

    pub fn open(&mut self, path: &str) -> Result<Fd> {
        let (target, rest) = path::split(path)?;
        let volume = self.find(target).ok_or(Error::NotFound)?;
        let slot = report(
            self.handles
                .iter()
                .position(Option::is_none)
                .ok_or(Error::TooManyOpenFiles),
        )?;

        let vol = self.volumes[volume].as_mut().ok_or(Error::NotFound)?;
        let fd = report(vol.fs.open(&mut self.cache, rest))?;
        log::debug!("{path}: handle {slot} on {} partition {volume}", vol.desc.kind);

        self.handles[slot] = Some(Handle { volume, fd });
        Ok(Fd(slot))
    }

    fn handle(&self, fd: Fd) -> Result<Handle> {
        self.handles.get(fd.0).copied().flatten().ok_or(Error::BadHandle)
    }

    fn fs(&self, fd: Fd) -> Result<(&dyn FileSystem, usize)> {
        let handle = self.handle(fd)?;
        let vol = self.volumes[handle.volume].as_ref().ok_or(Error::BadHandle)?;
        Ok((vol.fs.as_ref(), handle.fd))
    }

    fn fs_mut(&mut self, fd: Fd) -> Result<(&mut dyn FileSystem, &mut BlockCache, usize)> {
        let handle = self.handle(fd)?;
        let vol = self.volumes[handle.volume].as_mut().ok_or(Error::BadHandle)?;
        Ok((vol.fs.as_mut(), &mut self.cache, handle.fd))
    }

    /// 返回读到的字节数，文件末尾为0
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let (fs, cache, fd) = self.fs_mut(fd)?;
        report(fs.read(cache, fd, buf))
    }

    /// 读取`count`个`size`字节的项，返回完整读到的项数
    pub fn fread(&mut self, fd: Fd, buf: &mut [u8], size: usize, count: usize) -> Result<usize> {
        if size == 0 {
            return Ok(0);
        }
        let want = size.saturating_mul(count).min(buf.len());
        let read = self.read(fd, &mut buf[..want])?;
        Ok(read / size)
    }

    pub fn seek(&mut self, fd: Fd, offset: isize, whence: Whence) -> Result<usize> {
        let (fs, _, fd) = self.fs_mut(fd)?;
        fs.seek(fd, offset, whence)
    }

    pub fn tell(&self, fd: Fd) -> Result<usize> {
        let (fs, fd) = self.fs(fd)?;
        fs.tell(fd)
    }

    /// 固件镜像的校验和
    pub fn get_info(&self, fd: Fd) -> Result<Option<u32>> {
        let (fs, fd) = self.fs(fd)?;
        fs.get_info(fd)
    }

    /// 会话句柄总是释放；解码器只关闭其最近打开的句柄
    pub fn close(&mut self, fd: Fd) {
        let Some(handle) = self.handles.get_mut(fd.0).and_then(Option::take) else {
            log::debug!("close of unused handle {fd}");
            return;
        };
        if let Some(vol) = self.volumes[handle.volume].as_mut() {
            vol.fs.close(handle.fd);
        }
    }
}
