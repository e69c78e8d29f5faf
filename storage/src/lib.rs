//! # 引导程序的存储核心
//!
//! 挂载时扫描分区表，为每个认得的分区实例化对应的解码器；
//! 之后所有文件操作都经由 [`Storage`] 会话分派。
//!
//! 路径以卷前缀开头：
//!
//! - `[fat]/boot/kernel.bin`：按文件系统种类选卷
//! - `(hd0,1)/etc/loader.cfg`：按分区索引选卷
//! - `(hd0,0)/osos@`：固件分区的“路径”是镜像标签

#![no_std]

extern crate alloc;

pub mod config;
pub mod partition;
mod path;
mod session;

pub use self::{
    partition::{PartitionDescriptor, PartitionTag},
    session::{Fd, Storage},
};
pub use vfs::{Error, FsKind, Result, Whence};
