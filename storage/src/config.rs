//! Constants used by the storage session

/// 同时打开的文件数
pub const MAX_FILES: usize = 10;

/// 可注册的卷数，分区索引须小于此值
pub const MAX_VOLUMES: usize = 4;
