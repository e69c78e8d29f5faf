//! 逐字节拼出各种分区与整盘镜像
#![allow(dead_code)]

use std::sync::Arc;

use block_dev::mem::MemDisk;
use storage::Storage;

pub const SECTOR: usize = 512;

/// 每个分区按64扇区对齐
const ALIGN: usize = 64;

pub fn pattern(len: usize, seed: usize) -> Vec<u8> {
    (0..len).map(|i| (i * seed % 251) as u8).collect()
}

pub fn storage(bytes: Vec<u8>) -> Storage {
    Storage::mount(Arc::new(MemDisk::new(bytes))).unwrap()
}

fn put(bytes: &mut [u8], at: usize, data: &[u8]) {
    bytes[at..at + data.len()].copy_from_slice(data);
}

/// 分区依次排在`ALIGN`扇区的边界上，返回起始扇区
fn lay_out(bytes: &mut Vec<u8>, parts: &[&[u8]]) -> Vec<usize> {
    let mut starts = Vec::new();
    for part in parts {
        let start = bytes.len().div_ceil(ALIGN * SECTOR).max(1) * ALIGN;
        bytes.resize(start * SECTOR, 0);
        bytes.extend_from_slice(part);
        starts.push(start);
    }
    bytes.resize(bytes.len().next_multiple_of(SECTOR), 0);
    starts
}

pub fn dos_disk(parts: &[(u8, &[u8])]) -> Vec<u8> {
    let mut bytes = vec![0u8; SECTOR];
    let data: Vec<&[u8]> = parts.iter().map(|&(_, data)| data).collect();
    let starts = lay_out(&mut bytes, &data);

    for (i, (&(ty, _), start)) in parts.iter().zip(starts).enumerate() {
        let entry = 0x1BE + i * 16;
        bytes[entry + 4] = ty;
        put(&mut bytes, entry + 8, &(start as u32).to_le_bytes());
    }
    put(&mut bytes, 510, &[0x55, 0xAA]);
    bytes
}

pub fn apple_disk(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut bytes = vec![0u8; (parts.len() + 2) * SECTOR];
    let data: Vec<&[u8]> = parts.iter().map(|&(_, data)| data).collect();
    let starts = lay_out(&mut bytes, &data);

    put(&mut bytes, 0, b"ER");
    put(&mut bytes, 2, &512u16.to_be_bytes());
    let map_len = (parts.len() + 1) as u32;
    let entries = [("Apple_partition_map", 1)]
        .into_iter()
        .chain(parts.iter().map(|&(ty, _)| ty).zip(starts));
    for (n, (ty, start)) in entries.enumerate() {
        let at = (n + 1) * SECTOR;
        put(&mut bytes, at, b"PM");
        put(&mut bytes, at + 4, &map_len.to_be_bytes());
        put(&mut bytes, at + 8, &(start as u32).to_be_bytes());
        put(&mut bytes, at + 48, ty.as_bytes());
    }
    bytes
}

/* FAT32：每簇8个扇区；`boot/kernel.bin`占4、6、7号簇 */

const FAT_RSVD: usize = 32;
const FAT_SPC: usize = 8;

pub fn kernel() -> Vec<u8> {
    pattern(10_000, 13)
}

fn fat_short(name: &[u8; 11], attr: u8, cluster: u32, size: u32) -> [u8; 32] {
    let mut raw = [0u8; 32];
    raw[..11].copy_from_slice(name);
    raw[11] = attr;
    raw[0x14..0x16].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
    raw[0x1A..0x1C].copy_from_slice(&(cluster as u16).to_le_bytes());
    raw[0x1C..0x20].copy_from_slice(&size.to_le_bytes());
    raw
}

pub fn fat32() -> Vec<u8> {
    let cluster_bytes = FAT_SPC * SECTOR;
    let cluster = |c: u32| (FAT_RSVD + 2 + (c as usize - 2) * FAT_SPC) * SECTOR;
    let mut bytes = vec![0u8; cluster(8)];

    put(&mut bytes, 11, &512u16.to_le_bytes());
    bytes[13] = FAT_SPC as u8;
    put(&mut bytes, 14, &(FAT_RSVD as u16).to_le_bytes());
    bytes[16] = 2;
    put(&mut bytes, 0x24, &1u32.to_le_bytes());
    put(&mut bytes, 0x2C, &2u32.to_le_bytes());
    put(&mut bytes, 82, b"FAT32   ");
    put(&mut bytes, 510, &[0x55, 0xAA]);

    for fat in [FAT_RSVD, FAT_RSVD + 1] {
        let chain: [(u32, u32); 5] = [(2, 0x0FFF_FFFF), (3, 0x0FFF_FFFF), (4, 6), (6, 7), (7, 0x0FFF_FFF8)];
        for (c, next) in chain {
            put(&mut bytes, fat * SECTOR + c as usize * 4, &next.to_le_bytes());
        }
    }

    put(&mut bytes, cluster(2), &fat_short(b"BOOT       ", 0x10, 3, 0));
    let boot = [
        fat_short(b".          ", 0x10, 3, 0),
        fat_short(b"..         ", 0x10, 0, 0),
        fat_short(b"KERNEL  BIN", 0x20, 4, 10_000),
    ]
    .concat();
    put(&mut bytes, cluster(3), &boot);

    let kernel = kernel();
    for (chunk, c) in kernel.chunks(cluster_bytes).zip([4, 6, 7]) {
        put(&mut bytes, cluster(c), chunk);
    }
    bytes
}

/* ext2：1 KiB块，16个inode */

const EXT2_BS: usize = 1024;

pub fn ext2_big() -> Vec<u8> {
    pattern(14 * EXT2_BS + 100, 7)
}

pub fn ext2() -> Vec<u8> {
    let mut bytes = vec![0u8; 64 * EXT2_BS];
    let sb = EXT2_BS;
    put(&mut bytes, sb, &16u32.to_le_bytes());
    put(&mut bytes, sb + 20, &1u32.to_le_bytes());
    put(&mut bytes, sb + 40, &16u32.to_le_bytes());
    put(&mut bytes, sb + 56, &0xEF53u16.to_le_bytes());
    put(&mut bytes, 2 * EXT2_BS + 8, &3u32.to_le_bytes());

    let mut next = 5u32;
    let mut alloc = || {
        let block = next;
        next += 1;
        block
    };

    let inode = |bytes: &mut Vec<u8>, num: usize, mode: u16, size: usize, blocks: &[(usize, u32)]| {
        let at = 3 * EXT2_BS + (num - 1) * 128;
        put(bytes, at, &mode.to_le_bytes());
        put(bytes, at + 4, &(size as u32).to_le_bytes());
        for &(i, block) in blocks {
            put(bytes, at + 40 + i * 4, &block.to_le_bytes());
        }
    };

    let dir = |bytes: &mut Vec<u8>, block: u32, entries: &[(&str, u32)]| {
        let mut offset = 0;
        for (i, &(name, ino)) in entries.iter().enumerate() {
            let len = if i + 1 == entries.len() {
                EXT2_BS - offset
            } else {
                (8 + name.len()).next_multiple_of(4)
            };
            let at = block as usize * EXT2_BS + offset;
            put(bytes, at, &ino.to_le_bytes());
            put(bytes, at + 4, &(len as u16).to_le_bytes());
            bytes[at + 6] = name.len() as u8;
            put(bytes, at + 8, name.as_bytes());
            offset += len;
        }
    };

    let root = alloc();
    dir(&mut bytes, root, &[(".", 2), ("..", 2), ("etc", 11), ("big.bin", 13)]);
    inode(&mut bytes, 2, 0x41ED, EXT2_BS, &[(0, root)]);

    let etc = alloc();
    dir(&mut bytes, etc, &[(".", 11), ("..", 2), ("loader.cfg", 12)]);
    inode(&mut bytes, 11, 0x41ED, EXT2_BS, &[(0, etc)]);

    let cfg = alloc();
    put(&mut bytes, cfg as usize * EXT2_BS, b"kernel=/boot/vmlinux\n");
    inode(&mut bytes, 12, 0x81A4, 21, &[(0, cfg)]);

    // 12个直接块加一个一次间接块
    let big = ext2_big();
    let mut blocks = Vec::new();
    let table = alloc();
    for (i, chunk) in big.chunks(EXT2_BS).enumerate() {
        let block = alloc();
        put(&mut bytes, block as usize * EXT2_BS, chunk);
        if i < 12 {
            blocks.push((i, block));
        } else {
            put(&mut bytes, table as usize * EXT2_BS + (i - 12) * 4, &block.to_le_bytes());
        }
    }
    blocks.push((12, table));
    inode(&mut bytes, 13, 0x81A4, big.len(), &blocks);
    bytes
}

/* HFS+：4 KiB块与节点，目录文件只有头节点和一个叶子 */

const HFS_BS: usize = 4096;

pub const LOADER_CFG: &[u8] = b"default=osos\ntimeout=5\n";

pub fn vmlinux() -> Vec<u8> {
    pattern(5000, 11)
}

fn hfs_key(parent: u32, name: &str) -> Vec<u8> {
    let units: Vec<u16> = name.encode_utf16().collect();
    let mut raw = Vec::new();
    raw.extend_from_slice(&(6 + 2 * units.len() as u16).to_be_bytes());
    raw.extend_from_slice(&parent.to_be_bytes());
    raw.extend_from_slice(&(units.len() as u16).to_be_bytes());
    units.iter().for_each(|u| raw.extend_from_slice(&u.to_be_bytes()));
    raw
}

fn hfs_fork(size: u64, extents: &[(u32, u32)]) -> [u8; 80] {
    let mut raw = [0u8; 80];
    raw[0..8].copy_from_slice(&size.to_be_bytes());
    let total: u32 = extents.iter().map(|e| e.1).sum();
    raw[12..16].copy_from_slice(&total.to_be_bytes());
    for (i, &(start, count)) in extents.iter().enumerate() {
        raw[16 + i * 8..20 + i * 8].copy_from_slice(&start.to_be_bytes());
        raw[20 + i * 8..24 + i * 8].copy_from_slice(&count.to_be_bytes());
    }
    raw
}

fn hfs_node(kind: u8, records: &[Vec<u8>]) -> Vec<u8> {
    let mut raw = vec![0u8; HFS_BS];
    raw[8] = kind;
    raw[10..12].copy_from_slice(&(records.len() as u16).to_be_bytes());
    let mut offset = 14;
    for (i, record) in records.iter().enumerate() {
        raw[offset..offset + record.len()].copy_from_slice(record);
        raw[HFS_BS - 2 * (i + 1)..HFS_BS - 2 * i].copy_from_slice(&(offset as u16).to_be_bytes());
        offset += record.len();
    }
    let free = HFS_BS - 2 * (records.len() + 1);
    raw[free..free + 2].copy_from_slice(&(offset as u16).to_be_bytes());
    raw
}

pub fn hfsplus() -> Vec<u8> {
    let mut bytes = vec![0u8; 8 * HFS_BS];
    put(&mut bytes, 1024, b"H+");
    put(&mut bytes, 1024 + 40, &(HFS_BS as u32).to_be_bytes());
    put(&mut bytes, 1024 + 272, &hfs_fork(2 * HFS_BS as u64, &[(1, 2)]));

    let mut header = vec![0u8; 106];
    header[0..2].copy_from_slice(&1u16.to_be_bytes());
    header[2..6].copy_from_slice(&1u32.to_be_bytes());
    header[18..20].copy_from_slice(&(HFS_BS as u16).to_be_bytes());
    put(&mut bytes, HFS_BS, &hfs_node(0x01, &[header]));

    let folder = |parent: u32, name: &str, id: u32| {
        let mut record = hfs_key(parent, name);
        let mut data = [0u8; 88];
        data[1] = 1;
        data[8..12].copy_from_slice(&id.to_be_bytes());
        record.extend_from_slice(&data);
        record
    };
    let file = |parent: u32, name: &str, fork: [u8; 80]| {
        let mut record = hfs_key(parent, name);
        let mut data = [0u8; 248];
        data[1] = 2;
        data[88..168].copy_from_slice(&fork);
        record.extend_from_slice(&data);
        record
    };
    let leaf = hfs_node(
        0xFF,
        &[
            folder(2, "Notes", 16),
            file(2, "vmlinux", hfs_fork(5000, &[(5, 1), (7, 1)])),
            file(16, "loader.cfg", hfs_fork(LOADER_CFG.len() as u64, &[(3, 1)])),
        ],
    );
    put(&mut bytes, 2 * HFS_BS, &leaf);

    put(&mut bytes, 3 * HFS_BS, LOADER_CFG);
    let vmlinux = vmlinux();
    put(&mut bytes, 5 * HFS_BS, &vmlinux[..HFS_BS]);
    put(&mut bytes, 7 * HFS_BS, &vmlinux[HFS_BS..]);
    bytes
}

/* 固件分区：第2版，镜像表在2号扇区 */

pub const LINX_CHECKSUM: u32 = 0x0BAD_F00D;

pub fn linx() -> Vec<u8> {
    pattern(3000, 5)
}

fn fw_record(tag: &[u8; 4], dev_offset: u32, len: u32, entry: u32, checksum: u32) -> [u8; 40] {
    let mut raw = [0u8; 40];
    let mut swapped = *tag;
    swapped.reverse();
    raw[4..8].copy_from_slice(&swapped);
    raw[12..16].copy_from_slice(&dev_offset.to_le_bytes());
    raw[16..20].copy_from_slice(&len.to_le_bytes());
    raw[24..28].copy_from_slice(&entry.to_le_bytes());
    raw[28..32].copy_from_slice(&checksum.to_le_bytes());
    raw
}

pub fn fwfs() -> Vec<u8> {
    let mut bytes = vec![0u8; 0x3000];
    put(&mut bytes, 0x100, b"]ih[");
    put(&mut bytes, 0x104, &0x200u32.to_le_bytes());
    put(&mut bytes, 0x10A, &2u16.to_le_bytes());

    put(&mut bytes, 2 * SECTOR, &fw_record(b"linx", 0x1000, 3000, 0x200, LINX_CHECKSUM));
    put(&mut bytes, 2 * SECTOR + 40, &fw_record(b"osos", 0x2000, 1024, 0, 0x55));
    put(&mut bytes, 0x1000, &linx());
    put(&mut bytes, 0x2000, &pattern(1024, 3));
    bytes
}
