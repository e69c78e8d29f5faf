//! # ext2只读解码器
//!
//! 支持直接块、一次间接块与二次间接块，三次间接块一律报错。

#![no_std]

extern crate alloc;

mod control;
mod dir;
mod inode;
mod superblock;

pub use self::{
    control::Ext2FileSystem,
    inode::{BlockTier, ROOT_INODE},
    superblock::SuperBlock,
};
