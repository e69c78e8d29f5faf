use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use block_dev::mem::MemDisk;
use block_dev::{BlockCache, Disk, SECTOR_SIZE, SectorId};
use vfs::{Error, FileSystem, Whence};

use crate::volume::data::ShortDirEntry;
use crate::{FatFileSystem, FatType};

const RSVD: usize = 4;
const FAT_SECTORS: usize = 2;
const SPC: usize = 2;
const CLUSTER: usize = SPC * SECTOR_SIZE;
const ROOT_ENTRIES: usize = 16;

/// 逐字节拼出一个小FAT卷
struct Image {
    bytes: Vec<u8>,
    ty: FatType,
    next: u32,
}

impl Image {
    fn new(ty: FatType) -> Self {
        let mut bytes = vec![0u8; 160 * SECTOR_SIZE];
        let boot = &mut bytes[..SECTOR_SIZE];
        boot[11..13].copy_from_slice(&512u16.to_le_bytes());
        boot[13] = SPC as u8;
        boot[14..16].copy_from_slice(&(RSVD as u16).to_le_bytes());
        boot[16] = 2;
        match ty {
            FatType::Fat16 => {
                boot[17..19].copy_from_slice(&(ROOT_ENTRIES as u16).to_le_bytes());
                boot[22..24].copy_from_slice(&(FAT_SECTORS as u16).to_le_bytes());
                boot[54..62].copy_from_slice(b"FAT16   ");
            }
            FatType::Fat32 => {
                boot[0x24..0x28].copy_from_slice(&(FAT_SECTORS as u32).to_le_bytes());
                boot[0x2C..0x30].copy_from_slice(&2u32.to_le_bytes());
                boot[82..90].copy_from_slice(b"FAT32   ");
            }
        }
        boot[510] = 0x55;
        boot[511] = 0xAA;

        Self {
            bytes,
            ty,
            next: 2,
        }
    }

    fn root_dir_sectors(&self) -> usize {
        match self.ty {
            FatType::Fat16 => ROOT_ENTRIES * 32 / SECTOR_SIZE,
            FatType::Fat32 => 0,
        }
    }

    fn cluster_offset(&self, c: u32) -> usize {
        (RSVD + 2 * FAT_SECTORS + self.root_dir_sectors() + (c as usize - 2) * SPC) * SECTOR_SIZE
    }

    fn link(&mut self, c: u32, value: u32) {
        for fat in 0..2 {
            let base = (RSVD + fat * FAT_SECTORS) * SECTOR_SIZE;
            match self.ty {
                FatType::Fat32 => {
                    let at = base + c as usize * 4;
                    self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
                }
                FatType::Fat16 => {
                    let at = base + c as usize * 2;
                    self.bytes[at..at + 2].copy_from_slice(&(value as u16).to_le_bytes());
                }
            }
        }
    }

    /// 每隔一个簇分配，保证读取必须沿着FAT走
    fn store(&mut self, data: &[u8], clusters: usize) -> u32 {
        let ids: Vec<u32> = (0..clusters as u32).map(|i| self.next + 2 * i).collect();
        self.next += 2 * clusters as u32;

        for (i, &id) in ids.iter().enumerate() {
            let next = ids.get(i + 1).copied().unwrap_or(0x0FFF_FFFF);
            self.link(id, next);
            let chunk = data.chunks(CLUSTER).nth(i).unwrap_or(&[]);
            let at = self.cluster_offset(id);
            self.bytes[at..at + chunk.len()].copy_from_slice(chunk);
        }
        ids[0]
    }

    fn write_root(&mut self, entries: &[[u8; 32]]) {
        match self.ty {
            FatType::Fat16 => {
                let at = (RSVD + 2 * FAT_SECTORS) * SECTOR_SIZE;
                for (i, e) in entries.iter().enumerate() {
                    self.bytes[at + i * 32..at + i * 32 + 32].copy_from_slice(e);
                }
            }
            FatType::Fat32 => {
                let root = self.store(&entries.concat(), 1);
                assert_eq!(2, root);
            }
        }
    }

    fn mount(self) -> (FatFileSystem, BlockCache) {
        let dev = Arc::new(MemDisk::new(self.bytes));
        let mut cache = BlockCache::new(Disk::new(dev));
        let fs = FatFileSystem::mount(&mut cache, SectorId::new(0)).unwrap();
        (fs, cache)
    }
}

fn short(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut raw = [0; 32];
    raw[..11].copy_from_slice(name);
    raw[11] = attr;
    raw[0x14..0x16].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    raw[0x1A..0x1C].copy_from_slice(&(cluster as u16).to_le_bytes());
    raw[0x1C..0x20].copy_from_slice(&size.to_le_bytes());
    raw
}

/// 按磁盘顺序（最后一片在前）生成长目录项
fn long(name: &str, alias: &[u8; 11]) -> Vec<[u8; 32]> {
    let sum = ShortDirEntry::checksum_from(alias);
    let mut chars: Vec<u16> = name.bytes().map(u16::from).collect();
    if chars.len() % 13 != 0 {
        chars.push(0);
    }
    while chars.len() % 13 != 0 {
        chars.push(0xFFFF);
    }

    let count = chars.len() / 13;
    (0..count)
        .rev()
        .map(|i| {
            let mut raw = [0u8; 32];
            raw[0] = (i as u8 + 1) | if i + 1 == count { 0x40 } else { 0 };
            raw[11] = 0x0F;
            raw[13] = sum;
            let offsets = (1..11).step_by(2).chain((14..26).step_by(2)).chain((28..32).step_by(2));
            for (at, c) in offsets.zip(&chars[i * 13..i * 13 + 13]) {
                raw[at..at + 2].copy_from_slice(&c.to_le_bytes());
            }
            raw
        })
        .collect()
}

fn kernel_bytes() -> Vec<u8> {
    (0..2500u32).map(|i| (i * 7 % 251) as u8).collect()
}

fn fat32_image() -> Image {
    let mut img = Image::new(FatType::Fat32);
    // 根目录占2号簇，先占位
    img.next = 4;

    let kernel = img.store(&kernel_bytes(), 3);
    let broken = img.store(&[0xAB; CLUSTER], 1);

    let mut boot = vec![
        short(b".          ", 0x10, 0, 0),
        short(b"..         ", 0x10, 0, 0),
    ];
    boot.extend(long("kernel-image.bin", b"KERNEL~1BIN"));
    boot.push(short(b"KERNEL~1BIN", 0x20, kernel, 2500));
    // 校验和对不上的长名称
    boot.extend(long("wrong.bin", b"SOMEELSEBIN"));
    boot.push(short(b"BROKEN  BIN", 0x20, broken, 3 * CLUSTER as u32));
    boot.push(short(b"\xE5ELETED BIN", 0x20, kernel, 2500));
    let boot = img.store(&boot.concat(), 1);

    let root_entries = [
        short(b"TESTVOL    ", 0x08, 0, 0),
        short(b"BOOT       ", 0x10, boot, 0),
        short(b"EMPTY   TXT", 0x20, 0, 0),
    ];
    img.next = 2;
    img.write_root(&root_entries);
    img
}

#[test]
fn reads_file_through_long_name() {
    let (mut fs, mut cache) = fat32_image().mount();
    let fd = fs.open(&mut cache, "boot/kernel-image.bin").unwrap();

    let mut buf = vec![0u8; 4096];
    assert_eq!(2500, fs.read(&mut cache, fd, &mut buf).unwrap());
    assert_eq!(kernel_bytes(), buf[..2500]);
    assert_eq!(0, fs.read(&mut cache, fd, &mut buf).unwrap());
    assert_eq!(2500, fs.tell(fd).unwrap());
}

#[test]
fn short_name_is_case_insensitive() {
    let (mut fs, mut cache) = fat32_image().mount();
    let fd = fs.open(&mut cache, "/BOOT//kernel~1.bin").unwrap();
    assert_eq!(Ok(2500), fs.seek(fd, 0, Whence::End));
}

#[test]
fn partial_reads_cross_cluster_boundaries() {
    let (mut fs, mut cache) = fat32_image().mount();
    let fd = fs.open(&mut cache, "boot/kernel-image.bin").unwrap();
    let expected = kernel_bytes();

    fs.seek(fd, 1000, Whence::Set).unwrap();
    let mut buf = [0u8; 100];
    assert_eq!(100, fs.read(&mut cache, fd, &mut buf).unwrap());
    assert_eq!(expected[1000..1100], buf);

    fs.seek(fd, -60, Whence::End).unwrap();
    assert_eq!(60, fs.read(&mut cache, fd, &mut buf).unwrap());
    assert_eq!(expected[2440..], buf[..60]);
}

#[test]
fn mismatched_long_name_is_ignored() {
    let (mut fs, mut cache) = fat32_image().mount();
    assert_eq!(Err(Error::NotFound), fs.open(&mut cache, "boot/wrong.bin"));
    assert!(fs.open(&mut cache, "boot/broken.bin").is_ok());
}

#[test]
fn lookup_errors() {
    let (mut fs, mut cache) = fat32_image().mount();
    assert_eq!(Err(Error::NotFound), fs.open(&mut cache, "boot/missing"));
    assert_eq!(Err(Error::NotFound), fs.open(&mut cache, "boot/deleted.bin"));
    assert_eq!(Err(Error::NotFound), fs.open(&mut cache, "testvol"));
    assert_eq!(Err(Error::IsADirectory), fs.open(&mut cache, "boot"));
    assert_eq!(
        Err(Error::NotADirectory),
        fs.open(&mut cache, "empty.txt/kernel-image.bin")
    );
}

#[test]
fn empty_file_reads_nothing() {
    let (mut fs, mut cache) = fat32_image().mount();
    let fd = fs.open(&mut cache, "empty.txt").unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(0, fs.read(&mut cache, fd, &mut buf).unwrap());
}

#[test]
fn short_chain_is_corruption() {
    let (mut fs, mut cache) = fat32_image().mount();
    let fd = fs.open(&mut cache, "boot/broken.bin").unwrap();
    let mut buf = vec![0u8; 3 * CLUSTER];
    assert!(matches!(
        fs.read(&mut cache, fd, &mut buf),
        Err(Error::Corrupted(_))
    ));
}

#[test]
fn handles_close_in_lifo_order() {
    let (mut fs, mut cache) = fat32_image().mount();
    let fds: Vec<usize> = (0..10)
        .map(|_| fs.open(&mut cache, "boot/kernel-image.bin").unwrap())
        .collect();
    assert_eq!(
        Err(Error::TooManyOpenFiles),
        fs.open(&mut cache, "boot/kernel-image.bin")
    );

    // 非栈顶的句柄关不掉
    fs.close(fds[0]);
    assert!(fs.open(&mut cache, "empty.txt").is_err());
    fs.close(fds[9]);
    assert_eq!(Ok(9), fs.open(&mut cache, "empty.txt"));
}

#[test]
fn fat16_root_directory() {
    let mut img = Image::new(FatType::Fat16);
    let data: Vec<u8> = (0..1500u32).map(|i| i as u8).collect();
    let readme = img.store(&data, 2);

    let mut root = long("Read Me.txt", b"README~1TXT");
    root.push(short(b"README~1TXT", 0x20, readme, 1500));
    img.write_root(&root);

    let (mut fs, mut cache) = img.mount();
    assert_eq!(FatType::Fat16, fs.fat_type());
    let fd = fs.open(&mut cache, "read me.txt").unwrap();
    let mut buf = vec![0u8; 2000];
    assert_eq!(1500, fs.read(&mut cache, fd, &mut buf).unwrap());
    assert_eq!(data, buf[..1500]);
}

#[test]
fn missing_boot_signature() {
    let mut img = Image::new(FatType::Fat32);
    img.bytes[510] = 0;
    let dev = Arc::new(MemDisk::new(img.bytes));
    let mut cache = BlockCache::new(Disk::new(dev));
    assert!(matches!(
        FatFileSystem::mount(&mut cache, SectorId::new(0)),
        Err(Error::BadSignature(_))
    ));
}
