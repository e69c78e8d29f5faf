//! 目录项，每项32字节。
//!
//! 长文件名由若干个[`LongDirEntry`]倒序存放在其所属的[`ShortDirEntry`]之前，
//! 每项容纳13个UCS-2字符。

use alloc::string::String;

use byteorder::{ByteOrder, LittleEndian};
use enumflags2::{BitFlags, bitflags};
use vfs::DirEntryType;

use crate::ClusterId;
use crate::volume::reserved::FatType;

pub type RawDirEntry = [u8; 32];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[bitflags]
#[repr(u8)]
pub enum AttrFlag {
    ReadOnly = 0b0000_0001,
    Hidden = 0b0000_0010,
    /// The corresponding file is tagged as a component of the operating system
    System = 0b0000_0100,
    /// The corresponding entry contains the volume label
    VolumeID = 0b0000_1000,
    Directory = 0b0001_0000,
    /// Indicates that properties of the associated file have been modified
    Archive = 0b0010_0000,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DirEntryStatus {
    /// name[0] == 0xE5
    Free,
    /// name[0] == 0，此条目后的条目皆为空闲
    TailFree,
    /// 属性为0x0F的长目录项
    Long,
    /// 已被使用的短目录项
    Occupied,
}

impl DirEntryStatus {
    pub fn of(raw: &RawDirEntry) -> Self {
        match raw[0] {
            0x00 => Self::TailFree,
            _ if raw[11] == LongDirEntry::ATTR => Self::Long,
            0xE5 => Self::Free,
            _ => Self::Occupied,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShortDirEntry {
    name: [u8; 11],
    pub attr: BitFlags<AttrFlag>,
    /// First data cluster number
    /// for file/directory described by this entry
    cluster: ClusterId,
    /// Quantity containing size in bytes
    /// of file/directory described by this entry
    file_size: u32,
}

impl ShortDirEntry {
    /// FAT16的目录项没有高16位簇号
    pub fn parse(raw: &RawDirEntry, ty: FatType) -> Self {
        let mut name = [0; 11];
        name.copy_from_slice(&raw[..11]);

        let low = LittleEndian::read_u16(&raw[0x1A..]);
        let high = match ty {
            FatType::Fat32 => LittleEndian::read_u16(&raw[0x14..]),
            FatType::Fat16 => 0,
        };

        Self {
            name,
            attr: BitFlags::from_bits_truncate(raw[11]),
            cluster: (low, high).into(),
            file_size: LittleEndian::read_u32(&raw[0x1C..]),
        }
    }

    pub fn checksum(&self) -> u8 {
        Self::checksum_from(&self.name)
    }

    /// 作用于空格填充、不含`.`的11字节名称，如`"FAT32   C  "`
    pub fn checksum_from<'a>(bytes: impl IntoIterator<Item = &'a u8>) -> u8 {
        let checksum = bytes.into_iter().take(11).fold(0u8, |sum, &b| {
            // NOTE: The operation is an unsigned char rotate right
            (if sum & 1 != 0 { 0x80 } else { 0u8 })
                .wrapping_add(sum >> 1)
                .wrapping_add(b)
        });
        log::trace!("checksum={checksum:#04x}");
        checksum
    }

    pub const fn cluster_id(&self) -> ClusterId {
        self.cluster
    }

    pub const fn size(&self) -> usize {
        self.file_size as usize
    }

    pub fn is_volume_label(&self) -> bool {
        self.attr.contains(AttrFlag::VolumeID)
    }

    pub fn kind(&self) -> DirEntryType {
        if self.attr.contains(AttrFlag::Directory) {
            DirEntryType::Directory
        } else {
            DirEntryType::Regular
        }
    }

    /// 8.3名称：去掉填充空格，以`.`连接扩展名。卷标保留全部11个字符。
    pub fn name(&self) -> String {
        let decode = |b: &u8| char::from(*b);
        let mut name = self.name;
        // 0x05代表首字符实为0xE5
        if name[0] == 0x05 {
            name[0] = 0xE5;
        }

        if self.is_volume_label() {
            let s: String = name.iter().map(decode).collect();
            return String::from(s.trim_end_matches(' '));
        }

        let mut s: String = name[..8].iter().map(decode).collect();
        s.truncate(s.trim_end_matches(' ').len());
        let ext: String = name[8..].iter().map(decode).collect();
        let ext = ext.trim_end_matches(' ');
        if !ext.is_empty() {
            s.push('.');
            s.push_str(ext);
        }
        s
    }
}

/// 可容纳13个字符的长目录项
#[derive(Debug, Clone)]
pub struct LongDirEntry {
    /// 序号（1起），或上[`LongDirEntry::LAST_MASK`]表示最后一项
    pub ord: u8,
    /// 此项跟随的短名称目录项的校验和。
    /// 若不一致则说明发生了错误
    pub chksum: u8,
    chars: [u16; 13],
}

impl LongDirEntry {
    pub const ATTR: u8 = 0x0F;

    pub const LAST_MASK: u8 = 0b0100_0000;

    /// 已删除的长目录项
    pub const DELETED_MASK: u8 = 0b1000_0000;

    /// 每项可容纳的字符数
    pub const CAP: usize = 13;

    pub fn parse(raw: &RawDirEntry) -> Self {
        let mut chars = [0; 13];
        let name1 = raw[1..11].chunks_exact(2);
        let name2 = raw[14..26].chunks_exact(2);
        let name3 = raw[28..32].chunks_exact(2);
        for (c, bytes) in chars.iter_mut().zip(name1.chain(name2).chain(name3)) {
            *c = LittleEndian::read_u16(bytes);
        }

        Self {
            ord: raw[0],
            chksum: raw[13],
            chars,
        }
    }

    pub const fn seq(&self) -> usize {
        (self.ord & 0x3F) as usize
    }
}

/// 长文件名的拼装区
///
/// 只取每个UCS-2字符的低字节，Latin-1以外的字符不受支持。
#[derive(Debug, Clone)]
pub struct LongName {
    buf: [u8; Self::CAP],
    checksum: u8,
    /// 已收到最后一项，且途中没有出错
    complete: bool,
}

impl Default for LongName {
    fn default() -> Self {
        Self {
            buf: [0; Self::CAP],
            checksum: 0,
            complete: false,
        }
    }
}

impl LongName {
    const CAP: usize = 132;

    pub fn push(&mut self, slot: &LongDirEntry) {
        let end = LongDirEntry::CAP * slot.seq();
        if end < LongDirEntry::CAP
            || end >= Self::CAP
            || slot.ord & LongDirEntry::DELETED_MASK != 0
        {
            self.complete = false;
            return;
        }

        // 序号决定片段在名称中的位置
        let fragment = &mut self.buf[end - LongDirEntry::CAP..end];
        for (b, c) in fragment.iter_mut().zip(slot.chars) {
            *b = c as u8;
        }

        if slot.ord & LongDirEntry::LAST_MASK != 0 {
            self.buf[end] = 0;
            self.checksum = slot.chksum;
            self.complete = true;
        }
    }

    /// 交出属于`short`的长名称，校验和不符则为`None`。
    /// 无论结果如何，拼装区都被清空。
    pub fn take(&mut self, short: &ShortDirEntry) -> Option<String> {
        let owned = self.complete && self.checksum == short.checksum();
        self.complete = false;

        owned.then(|| {
            self.buf
                .iter()
                .take_while(|&&b| b != 0)
                .map(|&b| char::from(b))
                .collect()
        })
    }
}

/// 一个完整的目录项：短目录项及其长名称
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub short: ShortDirEntry,
    pub long_name: Option<String>,
}

impl DirEntry {
    /// 不区分ASCII大小写地比较长名称或8.3名称
    pub fn matches(&self, name: &str) -> bool {
        self.long_name
            .as_deref()
            .is_some_and(|long| long.eq_ignore_ascii_case(name))
            || self.short.name().eq_ignore_ascii_case(name)
    }
}
