/// 路径解析得到的目录项类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DirEntryType {
    Directory,
    SymLink,
    /// 设备、管道等，引导程序一概不读
    Special,
    #[default]
    Regular,
}

impl DirEntryType {
    pub const fn is_dir(self) -> bool {
        matches!(self, Self::Directory)
    }
}
