//! # 固件镜像容器
//!
//! 分区首扇区0x100处是`]ih[`头，之后的镜像表列出各个镜像的类型标签、位置与校验和。
//! 打开时的“路径”就是4字符的标签，可以再跟一个选择符：
//!
//! - 无：整个镜像
//! - `@`：跳过镜像自带的加载头，只要可执行代码
//! - `0`-`4`：镜像开头的二级镜像表中的第n项

#![no_std]

extern crate alloc;

pub mod config;
mod control;
mod header;
mod image;

pub use self::{
    control::FirmwareFileSystem,
    header::FirmwareHeader,
    image::{ImageRecord, Selector, Tag},
};
