use vfs::{Error, FsKind, Result};

/// 卷前缀选中的卷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    /// 按种类选，依次尝试
    Kinds(&'static [FsKind]),
    /// 按分区索引选
    Index(usize),
}

const FAT: &[FsKind] = &[FsKind::Fat];
const EXT2: &[FsKind] = &[FsKind::Ext2];
const HFS: &[FsKind] = &[FsKind::HfsPlus];
/// 没有ext2时退而用HFS+
const LINUX: &[FsKind] = &[FsKind::Ext2, FsKind::HfsPlus];

/// 拆出卷前缀，余下部分去掉开头的一个`/`后交给解码器
pub(crate) fn split(path: &str) -> Result<(Target, &str)> {
    let (target, rest) = if let Some(rest) = path.strip_prefix('[') {
        let (name, rest) = rest.split_once(']').ok_or(Error::NotFound)?;
        let kinds = match name {
            "dos" | "fat" | "win" | "vfat" | "fat32" => FAT,
            "ext" | "ext2" => EXT2,
            "linux" => LINUX,
            "hfs" | "hfs+" => HFS,
            _ => {
                log::debug!("unknown volume kind [{name}]");
                return Err(Error::NotFound);
            }
        };
        (Target::Kinds(kinds), rest)
    } else if let Some(rest) = path.strip_prefix("(hd") {
        let (drive, rest) = rest.split_once(')').ok_or(Error::NotFound)?;
        // 只有一块盘
        let index = match drive.split_once(',') {
            Some(("0", index)) => index.parse().map_err(|_| Error::NotFound)?,
            _ => return Err(Error::NotFound),
        };
        (Target::Index(index), rest)
    } else {
        log::debug!("{path}: no volume prefix");
        return Err(Error::NotFound);
    };

    Ok((target, rest.strip_prefix('/').unwrap_or(rest)))
}
