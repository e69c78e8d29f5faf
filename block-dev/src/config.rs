//! Constants used by the block layer

/// 逻辑扇区大小
pub const SECTOR_SIZE: usize = 512;

/// 块缓存的槽位数
pub const CACHE_BLOCKS: usize = 8;

/// 每个缓存槽的字节数。
/// 配对传输的设备一次出两个逻辑扇区，故取1024而非16个512。
pub const CACHE_BLOCK_SIZE: usize = 1024;

/// 探测传输模式时读取的扇区，必须为奇数
pub const PROBE_SECTOR: usize = 1;
