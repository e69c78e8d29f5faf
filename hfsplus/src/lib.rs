//! # HFS+只读解码器
//!
//! 只查目录文件（catalog）的B树，不支持extents overflow文件：
//! 超过8个extent的fork一律报错。

#![no_std]

extern crate alloc;

mod btree;
mod catalog;
mod control;
mod fork;
pub mod unicode;
mod volume;

pub use self::{
    btree::{BTreeHeader, CatalogKey, NodeKind},
    catalog::{CatalogRecord, ROOT_FOLDER_ID},
    control::HfsPlusFileSystem,
    fork::{Extent, Fork},
    volume::VolumeHeader,
};
