//! # 虚拟文件系统接口
//!
//! 各文件系统解码器共享的错误类型、操作特质与句柄管理。

#![no_std]

extern crate alloc;

mod cursor;
mod dirent;
mod error;
mod handle;

use core::fmt::Debug;

use block_dev::BlockCache;
use derive_more::Display;

pub use self::{
    cursor::{FileCursor, Whence},
    dirent::DirEntryType,
    error::{Error, Result},
    handle::{HandleStack, MAX_HANDLES},
};

/// 已注册文件系统的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FsKind {
    #[display(fmt = "fat")]
    Fat,
    #[display(fmt = "ext2")]
    Ext2,
    #[display(fmt = "hfs+")]
    HfsPlus,
    #[display(fmt = "fwfs")]
    Firmware,
}

/// 挂载在某个分区上的只读文件系统
///
/// `fd`是实例内部的句柄号，由[`FileSystem::open`]分配。
/// 所有读盘操作都经由调用者传入的块缓存。
pub trait FileSystem: Debug {
    fn kind(&self) -> FsKind;

    /// `path`已去掉卷前缀与开头的`/`
    fn open(&mut self, cache: &mut BlockCache, path: &str) -> Result<usize>;

    /// 只有最近打开的句柄才会真正关闭
    fn close(&mut self, fd: usize);

    fn seek(&mut self, fd: usize, offset: isize, whence: Whence) -> Result<usize>;

    fn tell(&self, fd: usize) -> Result<usize>;

    /// 返回实际读取的字节数，到达文件末尾时为0
    fn read(&mut self, cache: &mut BlockCache, fd: usize, buf: &mut [u8]) -> Result<usize>;

    /// 固件镜像返回其校验和，其它文件系统没有附加信息
    fn get_info(&self, fd: usize) -> Result<Option<u32>> {
        self.tell(fd).map(|_| None)
    }
}
