//! # 块设备接口层
//!
//! 引导程序的存储核心只向外界索取一个原语：从逻辑块地址起连续读取若干扇区。
//! 此 crate 在该原语之上提供传输模式探测与一个小型LRU块缓存。

#![no_std]

extern crate alloc;

mod cache;
pub mod config;
mod disk;
#[cfg(any(test, feature = "mem"))]
pub mod mem;

use core::any::Any;
use core::fmt::Debug;

use derive_more::{Add, Display, From, Into};

pub use self::{
    cache::{BlockCache, CacheStats},
    config::SECTOR_SIZE,
    disk::{Disk, TransferMode},
};

/// 块设备驱动特质
///
/// 一次传输的单位是 [`SECTOR_SIZE`] 字节的逻辑扇区，
/// `buf.len()` 必须是其整数倍。
pub trait BlockDevice: Send + Sync + Any + Debug {
    fn read_sectors(&self, sector: usize, buf: &mut [u8]) -> Result<(), DeviceError>;
}

/// 设备读取失败。引导流程中总是致命的，不做重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(fmt = "device read failed at sector {} ({} sectors)", sector, count)]
pub struct DeviceError {
    pub sector: usize,
    pub count: usize,
}

/// 以512字节为单位的逻辑扇区号
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Add, From, Into, Display)]
#[display(fmt = "{}", _0)]
#[repr(transparent)]
pub struct SectorId(usize);

impl core::ops::Add<usize> for SectorId {
    type Output = Self;

    fn add(self, rhs: usize) -> Self::Output {
        self + Self(rhs)
    }
}

impl SectorId {
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> usize {
        self.0
    }
}
