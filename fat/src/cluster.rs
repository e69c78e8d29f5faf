use derive_more::Display;

use crate::volume::reserved::FatType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display(fmt = "{}", _0)]
#[repr(transparent)]
pub struct ClusterId(u32);

/// 簇链在此终止的原因
#[derive(Debug, PartialEq, Eq)]
pub enum ClusterError {
    Free,
    Reserved,
    Eof,
}

impl From<u32> for ClusterId {
    fn from(raw: u32) -> Self {
        Self::new(raw)
    }
}

/// 目录项中的（低16位，高16位）
impl From<(u16, u16)> for ClusterId {
    fn from((low, high): (u16, u16)) -> Self {
        Self::new(u32::from(low) | (u32::from(high) << 16))
    }
}

impl From<ClusterId> for u32 {
    fn from(id: ClusterId) -> Self {
        id.0
    }
}

impl ClusterId {
    pub const FREE: Self = Self(0);

    /// 最小的可用簇号
    pub const MIN: Self = Self(2);

    /// FAT32条目的高4位保留
    pub const fn new(raw: u32) -> Self {
        Self(raw & 0x0FFF_FFFF)
    }

    pub fn validate(self, ty: FatType) -> Result<Self, ClusterError> {
        match self {
            Self::FREE => Err(ClusterError::Free),
            id if id < Self::MIN => Err(ClusterError::Reserved),
            id if id.0 >= ty.chain_end() => Err(ClusterError::Eof),
            id => Ok(id),
        }
    }

    /// 数据区从2号簇开始
    pub const fn data_index(self) -> usize {
        (self.0 - Self::MIN.0) as usize
    }
}
