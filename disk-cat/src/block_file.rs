use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use block_dev::{BlockDevice, DeviceError, SECTOR_SIZE};
use send_wrapper::SendWrapper;

/// 把镜像文件当作块设备
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
    /// 只接受从偶数扇区起、成对的传输
    paired: bool,
}

impl BlockFile {
    pub fn new(fd: File, paired: bool) -> Self {
        Self {
            inner: SendWrapper::new(RefCell::new(fd)),
            paired,
        }
    }
}

impl BlockDevice for BlockFile {
    fn read_sectors(&self, sector: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        let count = buf.len() / SECTOR_SIZE;
        let err = DeviceError { sector, count };
        if self.paired && (sector % 2 != 0 || count % 2 != 0) {
            return Err(err);
        }

        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((sector * SECTOR_SIZE) as u64))
            .and_then(|_| file.read_exact(buf))
            .map_err(|io| {
                log::error!("{err}: {io}");
                err
            })
    }
}
