use byteorder::{ByteOrder, LittleEndian};

/// 目录项头部：inode号、记录长度、名称长度、文件类型
const HEADER: usize = 8;

/// 变长目录项，名称借用自目录块
#[derive(Debug)]
pub struct DirEntry<'a> {
    pub inode: u32,
    pub name: &'a [u8],
}

/// 逐个解析一个目录块中的目录项
///
/// 目录项不会跨块。记录长度为0或越界时停止。
#[derive(Debug)]
pub struct DirEntries<'a> {
    block: &'a [u8],
    offset: usize,
    broken: bool,
}

impl<'a> DirEntries<'a> {
    pub fn new(block: &'a [u8]) -> Self {
        Self {
            block,
            offset: 0,
            broken: false,
        }
    }

    /// 因记录长度异常而提前结束，此后的目录块也不可信
    pub fn is_broken(&self) -> bool {
        self.broken
    }
}

impl<'a> Iterator for DirEntries<'a> {
    type Item = DirEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.block.get(self.offset..)?;
            if raw.len() < HEADER {
                return None;
            }

            let inode = LittleEndian::read_u32(raw);
            let rec_len = LittleEndian::read_u16(&raw[4..]) as usize;
            let name_len = raw[6] as usize;
            if rec_len < HEADER || rec_len > raw.len() || HEADER + name_len > rec_len {
                log::debug!("directory scan stops at bad record length {rec_len}");
                self.broken = true;
                return None;
            }
            self.offset += rec_len;

            // inode为0的是空洞
            if inode != 0 {
                return Some(DirEntry {
                    inode,
                    name: &raw[HEADER..HEADER + name_len],
                });
            }
        }
    }
}
