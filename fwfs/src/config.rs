//! Constants used by the firmware container

/// 镜像表中有效的记录数
pub const MAX_IMAGES: usize = 10;

/// 二级镜像表最多5项，对应选择符`0`-`4`
pub const MAX_NESTED: u8 = 5;
