use byteorder::{BigEndian, ByteOrder};
use vfs::{Error, Result};

use crate::Fork;

/// 根目录的CNID，路径解析从它开始
pub const ROOT_FOLDER_ID: u32 = 2;

/// 叶子记录中键之后的目录数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRecord {
    Folder { id: u32 },
    File { id: u32, data: Fork },
    /// 文件夹或文件的thread记录，按名称查找时不会出现
    Thread,
}

impl CatalogRecord {
    const FOLDER: i16 = 1;
    const FILE: i16 = 2;
    const FOLDER_THREAD: i16 = 3;
    const FILE_THREAD: i16 = 4;

    /// HFSPlusCatalogFile中数据fork的位置
    const DATA_FORK: usize = 88;

    pub fn parse(raw: &[u8]) -> Result<Self> {
        const SHORT: Error = Error::Corrupted("catalog record is too short");

        if raw.len() < 12 {
            return Err(SHORT);
        }
        match BigEndian::read_i16(raw) {
            Self::FOLDER => Ok(Self::Folder {
                id: BigEndian::read_u32(&raw[8..]),
            }),
            Self::FILE => {
                let fork = raw
                    .get(Self::DATA_FORK..Self::DATA_FORK + Fork::SIZE)
                    .ok_or(SHORT)?;
                Ok(Self::File {
                    id: BigEndian::read_u32(&raw[8..]),
                    data: Fork::parse(fork),
                })
            }
            Self::FOLDER_THREAD | Self::FILE_THREAD => Ok(Self::Thread),
            _ => Err(Error::Corrupted("unknown catalog record type")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_and_file() {
        let mut raw = [0u8; 248];
        raw[1] = 1;
        raw[8..12].copy_from_slice(&16u32.to_be_bytes());
        assert_eq!(Ok(CatalogRecord::Folder { id: 16 }), CatalogRecord::parse(&raw[..88]));

        raw[1] = 2;
        raw[88 + 7] = 14;
        match CatalogRecord::parse(&raw).unwrap() {
            CatalogRecord::File { id, data } => {
                assert_eq!(16, id);
                assert_eq!(14, data.logical_size);
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn truncated_file_record() {
        let mut raw = [0u8; 100];
        raw[1] = 2;
        assert_eq!(
            Err(Error::Corrupted("catalog record is too short")),
            CatalogRecord::parse(&raw)
        );
    }
}
