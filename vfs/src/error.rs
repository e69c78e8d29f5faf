use block_dev::DeviceError;
use derive_more::Display;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Error {
    /// 设备读取失败
    #[display(fmt = "{}", _0)]
    Io(DeviceError),

    /*
     * 格式不符：探测时仅表示此处没有该格式
     */
    #[display(fmt = "bad {} signature", _0)]
    BadSignature(&'static str),
    #[display(fmt = "unsupported format: {}", _0)]
    UnsupportedFormat(&'static str),
    #[display(fmt = "corrupted on-disk structure: {}", _0)]
    Corrupted(&'static str),
    /// 0号扇区既非DOS分区表也非Apple分区图
    #[display(fmt = "unknown partition scheme")]
    UnknownPartitionScheme,

    /*
     * 资源耗尽或不支持的结构
     */
    #[display(fmt = "too many open files")]
    TooManyOpenFiles,
    /// B树节点缓冲区已被占用
    #[display(fmt = "node buffer already in use")]
    NodeInUse,
    /// 8个extent覆盖不了整个fork
    #[display(fmt = "fork needs the extents overflow file")]
    ExtentsOverflow,
    #[display(fmt = "triple-indirect blocks are not supported")]
    TripleIndirect,
    #[display(fmt = "image table crosses a sector boundary")]
    MisalignedImageTable,
    #[display(fmt = "too many volumes")]
    TooManyVolumes,

    /*
     * 查无此文件：调用者可以换个路径再试
     */
    #[display(fmt = "not found")]
    NotFound,
    #[display(fmt = "not a directory")]
    NotADirectory,
    #[display(fmt = "is a directory")]
    IsADirectory,
    #[display(fmt = "bad file handle")]
    BadHandle,
    #[display(fmt = "offset out of range")]
    OutOfRange,
}

impl From<DeviceError> for Error {
    fn from(err: DeviceError) -> Self {
        Self::Io(err)
    }
}

impl Error {
    /// 致命错误意味着本次引导无法继续
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Io(_)
            | Self::UnknownPartitionScheme
            | Self::TooManyOpenFiles
            | Self::NodeInUse
            | Self::ExtentsOverflow
            | Self::TripleIndirect
            | Self::MisalignedImageTable
            | Self::TooManyVolumes => true,

            Self::BadSignature(_)
            | Self::UnsupportedFormat(_)
            | Self::Corrupted(_)
            | Self::NotFound
            | Self::NotADirectory
            | Self::IsADirectory
            | Self::BadHandle
            | Self::OutOfRange => false,
        }
    }

    /// 挂载探测失败是正常情况，不应中止扫描
    pub const fn is_format(&self) -> bool {
        matches!(
            self,
            Self::BadSignature(_) | Self::UnsupportedFormat(_) | Self::Corrupted(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let io: Error = DeviceError { sector: 3, count: 1 }.into();
        assert!(io.is_fatal());
        assert!(Error::NodeInUse.is_fatal());
        assert!(Error::TripleIndirect.is_fatal());
        assert!(!Error::NotFound.is_fatal());
        assert!(!Error::BadSignature("FAT").is_fatal());
        assert!(Error::BadSignature("FAT").is_format());
        assert!(!Error::OutOfRange.is_format());
    }
}
