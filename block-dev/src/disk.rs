//! 设备胶水层：传输模式探测与扇区拆分

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;

use crate::config::{CACHE_BLOCK_SIZE, PROBE_SECTOR};
use crate::{BlockDevice, DeviceError, SECTOR_SIZE};

/// 设备的物理传输方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// 每次传输一个逻辑扇区
    Single,
    /// 奇数扇区无法单独寻址（2048字节物理扇区的机型），
    /// 每次从偶数扇区起传输两个逻辑扇区
    Paired,
}

impl TransferMode {
    /// 读一个奇数扇区，失败则认为设备只能配对传输。
    pub fn detect(dev: &dyn BlockDevice) -> Self {
        let mut probe = [0u8; SECTOR_SIZE];
        match dev.read_sectors(PROBE_SECTOR, &mut probe) {
            Ok(()) => Self::Single,
            Err(err) => {
                log::info!("{err}, falling back to paired transfers");
                Self::Paired
            }
        }
    }

    /// 一次物理传输的字节数
    pub const fn transfer_bytes(self) -> usize {
        match self {
            Self::Single => SECTOR_SIZE,
            Self::Paired => 2 * SECTOR_SIZE,
        }
    }

    /// 分区表中的扇区数需乘以此值才是逻辑扇区
    pub const fn sector_multiplier(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Paired => 4,
        }
    }

    /// 返回逻辑扇区所在的物理传输起点，以及它在该次传输中的字节偏移
    pub const fn locate(self, sector: usize) -> (usize, usize) {
        match self {
            Self::Single => (sector, 0),
            Self::Paired => (sector & !1, (sector & 1) * SECTOR_SIZE),
        }
    }
}

#[derive(Debug)]
pub struct Disk {
    dev: Arc<dyn BlockDevice>,
    mode: TransferMode,
    /// 配对模式下拆分半块用的中转区
    bounce: Box<[u8]>,
}

impl Disk {
    pub fn new(dev: Arc<dyn BlockDevice>) -> Self {
        let mode = TransferMode::detect(dev.as_ref());
        Self::with_mode(dev, mode)
    }

    pub fn with_mode(dev: Arc<dyn BlockDevice>, mode: TransferMode) -> Self {
        Self {
            dev,
            mode,
            bounce: vec![0; CACHE_BLOCK_SIZE].into_boxed_slice(),
        }
    }

    pub const fn mode(&self) -> TransferMode {
        self.mode
    }

    pub const fn sector_multiplier(&self) -> usize {
        self.mode.sector_multiplier()
    }

    /// 一次物理传输，`dst`长度恰为[`TransferMode::transfer_bytes`]
    pub(crate) fn read_transfer(&self, first: usize, dst: &mut [u8]) -> Result<(), DeviceError> {
        debug_assert_eq!(dst.len(), self.mode.transfer_bytes());
        self.dev.read_sectors(first, dst)
    }

    /// 不经缓存地读取`count`个逻辑扇区
    pub fn read(&mut self, dst: &mut [u8], sector: usize, count: usize) -> Result<(), DeviceError> {
        let Some(dst) = dst.get_mut(..count * SECTOR_SIZE) else {
            log::error!("{count} sectors do not fit in a {} byte buffer", dst.len());
            return Err(DeviceError { sector, count });
        };

        match self.mode {
            TransferMode::Single => self.dev.read_sectors(sector, dst),
            TransferMode::Paired => {
                let mut done = 0;
                while done < count {
                    let cur = sector + done;
                    let (phys, offset) = self.mode.locate(cur);
                    let out = &mut dst[done * SECTOR_SIZE..];

                    if offset == 0 && count - done >= 2 {
                        // 对齐的整对，直接落到目标缓冲区
                        self.dev.read_sectors(phys, &mut out[..2 * SECTOR_SIZE])?;
                        done += 2;
                    } else {
                        self.dev.read_sectors(phys, &mut self.bounce)?;
                        out[..SECTOR_SIZE].copy_from_slice(&self.bounce[offset..offset + SECTOR_SIZE]);
                        done += 1;
                    }
                }
                Ok(())
            }
        }
    }
}
