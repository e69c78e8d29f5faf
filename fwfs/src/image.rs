use core::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::config::MAX_NESTED;

/// 4字符的镜像类型标签
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// 磁盘上的小端u32字节序与标签相反，挂载时翻转一次
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw.to_be_bytes())
    }

    /// 每个字节都在0x40..=0x7F，粗略地当作“都是字母”
    pub fn is_letters(&self) -> bool {
        self.0.iter().all(|&b| b & 0xC0 == 0x40)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() { b as char } else { '.' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

/// 镜像表中的一条记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRecord {
    pub dev: u32,
    pub tag: Tag,
    pub id: u32,
    /// 相对分区起点的字节偏移
    pub dev_offset: u32,
    pub len: u32,
    pub addr: u32,
    pub entry_offset: u32,
    pub checksum: u32,
    pub vers: u32,
    pub load_addr: u32,
}

impl ImageRecord {
    pub const SIZE: usize = 40;

    /// 类型为0或全1的是空槽
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let field = |i: usize| LittleEndian::read_u32(&raw[i * 4..]);

        let ty = field(1);
        if ty == 0 || ty == u32::MAX {
            return None;
        }

        Some(Self {
            dev: field(0),
            tag: Tag::from_raw(ty),
            id: field(2),
            dev_offset: field(3),
            len: field(4),
            addr: field(5),
            entry_offset: field(6),
            checksum: field(7),
            vers: field(8),
            load_addr: field(9),
        })
    }
}

/// 标签后的选择符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Whole,
    /// `@`
    Code,
    /// `0`-`4`
    Nested(u8),
}

impl Selector {
    /// 拆开`linx@`这样的名称
    pub fn split(name: &str) -> Option<(Tag, Self)> {
        let bytes = name.as_bytes();
        let tag = Tag(bytes.get(..4)?.try_into().ok()?);
        let selector = match bytes[4..] {
            [] => Self::Whole,
            [b'@'] => Self::Code,
            [d] if d.wrapping_sub(b'0') < MAX_NESTED => Self::Nested(d - b'0'),
            _ => return None,
        };
        Some((tag, selector))
    }
}
