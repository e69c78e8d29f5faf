//! # FAT16/FAT32只读解码器

#![no_std]

extern crate alloc;

mod cluster;
mod control;
mod inode;
pub mod volume;

pub use self::{
    cluster::{ClusterError, ClusterId},
    control::FatFileSystem,
    volume::reserved::FatType,
};

#[cfg(test)]
mod tests;
