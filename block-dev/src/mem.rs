//! 以内存为后端的块设备

use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::{BlockDevice, DeviceError, SECTOR_SIZE};

#[derive(Debug)]
pub struct MemDisk {
    data: Vec<u8>,
    /// 模拟只能从偶数扇区起成对传输的设备
    paired: bool,
    fail_at: Option<usize>,
    reads: AtomicUsize,
}

impl MemDisk {
    /// 不足整扇区的尾部补零
    pub fn new(mut data: Vec<u8>) -> Self {
        let len = data.len().next_multiple_of(SECTOR_SIZE);
        data.resize(len, 0);

        Self {
            data,
            paired: false,
            fail_at: None,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn paired(mut self) -> Self {
        self.paired = true;
        self
    }

    /// 任何覆盖`sector`的读取都会失败
    pub fn failing_at(mut self, sector: usize) -> Self {
        self.fail_at = Some(sector);
        self
    }

    /// 成功完成的传输次数
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn sectors(&self) -> usize {
        self.data.len() / SECTOR_SIZE
    }
}

impl BlockDevice for MemDisk {
    fn read_sectors(&self, sector: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        let count = buf.len() / SECTOR_SIZE;
        let err = DeviceError { sector, count };

        if buf.len() % SECTOR_SIZE != 0 {
            return Err(err);
        }
        if self.paired && (sector % 2 != 0 || count % 2 != 0) {
            return Err(err);
        }
        if self
            .fail_at
            .is_some_and(|bad| (sector..sector + count).contains(&bad))
        {
            return Err(err);
        }

        let start = sector * SECTOR_SIZE;
        let src = self.data.get(start..start + buf.len()).ok_or(err)?;
        buf.copy_from_slice(src);
        self.reads.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }
}
