use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 用引导程序的存储核心读取磁盘镜像
#[derive(Parser)]
pub struct Cli {
    /// Disk image
    pub image: PathBuf,

    /// Emulate a drive that only transfers sector pairs
    #[arg(long)]
    pub paired: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List mounted volumes
    Parts,
    /// Copy a file to stdout, e.g. `[linux]/boot/vmlinux`
    Cat { path: String },
    /// Print the size of a file and its firmware checksum
    Stat { path: String },
}
