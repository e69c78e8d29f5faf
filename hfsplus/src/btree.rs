//! 目录文件的B树
//!
//! 每个卷只有一个节点缓冲区，取用前必须确认上一个节点已经归还。

use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

use block_dev::{BlockCache, SECTOR_SIZE};
use byteorder::{BigEndian, ByteOrder};
use vfs::{Error, Result};

use crate::control::Geometry;
use crate::{Fork, unicode};

/// 节点描述符
const DESCRIPTOR_SIZE: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Index,
    Header,
    Map,
    Leaf,
}

impl NodeKind {
    const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(Self::Index),
            0x01 => Some(Self::Header),
            0x02 => Some(Self::Map),
            0xFF => Some(Self::Leaf),
            _ => None,
        }
    }
}

/// 0号节点中的头记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeHeader {
    pub depth: u16,
    pub root: u32,
    pub node_size: usize,
}

impl BTreeHeader {
    /// `node`是0号节点的第一个扇区
    pub fn parse(node: &[u8]) -> Result<Self> {
        if NodeKind::from_raw(node[8]) != Some(NodeKind::Header) {
            return Err(Error::Corrupted("catalog node 0 is not a header node"));
        }

        let record = &node[DESCRIPTOR_SIZE..];
        let node_size = BigEndian::read_u16(&record[18..]) as usize;
        if !node_size.is_power_of_two() || node_size < SECTOR_SIZE {
            return Err(Error::UnsupportedFormat("catalog node size"));
        }

        Ok(Self {
            depth: BigEndian::read_u16(record),
            root: BigEndian::read_u32(&record[2..]),
            node_size,
        })
    }
}

/// 查找用的键：父目录ID与UTF-16名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogKey {
    pub parent: u32,
    pub name: Vec<u16>,
}

impl CatalogKey {
    pub fn new(parent: u32, name: &str) -> Self {
        Self {
            parent,
            name: name.encode_utf16().collect(),
        }
    }

    /// 节点中的键相对于`self`的大小
    fn order_of(&self, raw: &RawKey) -> Ordering {
        raw.parent
            .cmp(&self.parent)
            .then_with(|| unicode::compare(raw.units(), self.name.iter().copied()))
    }
}

/// 节点记录开头的键，名称仍是大端字节
struct RawKey<'a> {
    parent: u32,
    name: &'a [u8],
}

impl<'a> RawKey<'a> {
    /// 返回键与紧随其后的数据
    fn parse(record: &'a [u8]) -> Result<(Self, &'a [u8])> {
        const OVERRUN: Error = Error::Corrupted("catalog key overruns its record");

        if record.len() < 8 {
            return Err(OVERRUN);
        }
        let key_len = 2 + BigEndian::read_u16(record) as usize;
        let units = BigEndian::read_u16(&record[6..]) as usize;
        if key_len > record.len() || 8 + 2 * units > key_len {
            return Err(OVERRUN);
        }

        let key = Self {
            parent: BigEndian::read_u32(&record[2..]),
            name: &record[8..8 + 2 * units],
        };
        Ok((key, &record[key_len..]))
    }

    fn units(&self) -> impl Iterator<Item = u16> + 'a {
        self.name.chunks_exact(2).map(BigEndian::read_u16)
    }
}

/// 搜索一个节点的结果
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Child(u32),
    /// 叶子记录中键之后的数据，已拷出节点缓冲区
    Found(Vec<u8>),
    Missing,
}

/// 节点缓冲区中的一个节点
#[derive(Debug)]
pub(crate) struct Node<'a> {
    data: &'a [u8],
}

impl<'a> Node<'a> {
    fn new(data: &'a [u8]) -> Result<Self> {
        let node = Self { data };
        if DESCRIPTOR_SIZE + 2 * (node.num_records() + 1) > data.len() {
            return Err(Error::Corrupted("too many records for the node size"));
        }
        Ok(node)
    }

    pub fn kind(&self) -> Option<NodeKind> {
        NodeKind::from_raw(self.data[8])
    }

    pub fn num_records(&self) -> usize {
        BigEndian::read_u16(&self.data[10..]) as usize
    }

    /// 记录偏移从节点末尾倒序排列，第`num_records`项是空闲区的起点
    fn offset(&self, i: usize) -> usize {
        BigEndian::read_u16(&self.data[self.data.len() - 2 * (i + 1)..]) as usize
    }

    pub fn record(&self, i: usize) -> Result<&'a [u8]> {
        let (start, end) = (self.offset(i), self.offset(i + 1));
        let table = self.data.len() - 2 * (self.num_records() + 1);
        if start < DESCRIPTOR_SIZE || start > end || end > table {
            return Err(Error::Corrupted("catalog record offsets out of order"));
        }
        Ok(&self.data[start..end])
    }

    pub fn search(&self, key: &CatalogKey) -> Result<Step> {
        match self.kind() {
            Some(NodeKind::Index) => self.search_index(key),
            Some(NodeKind::Leaf) => self.search_leaf(key),
            _ => Err(Error::Corrupted("catalog search reached a non-tree node")),
        }
    }

    /// 最后一个不大于`key`的记录；第一个记录就更大时仍走第一个
    fn search_index(&self, key: &CatalogKey) -> Result<Step> {
        let mut child = None;
        for i in 0..self.num_records() {
            let (raw, rest) = RawKey::parse(self.record(i)?)?;
            if rest.len() < 4 {
                return Err(Error::Corrupted("index record without a child pointer"));
            }
            let ptr = BigEndian::read_u32(rest);

            if key.order_of(&raw) == Ordering::Greater {
                child.get_or_insert(ptr);
                break;
            }
            child = Some(ptr);
        }
        Ok(child.map_or(Step::Missing, Step::Child))
    }

    fn search_leaf(&self, key: &CatalogKey) -> Result<Step> {
        for i in 0..self.num_records() {
            let (raw, rest) = RawKey::parse(self.record(i)?)?;
            match key.order_of(&raw) {
                Ordering::Less => continue,
                Ordering::Equal => return Ok(Step::Found(rest.to_vec())),
                Ordering::Greater => break,
            }
        }
        Ok(Step::Missing)
    }
}

/// 每卷唯一的节点缓冲区
#[derive(Debug)]
pub(crate) struct NodeBuffer {
    data: Vec<u8>,
    /// 缓冲区中现有节点的ID，同一节点不重读
    held: Option<u32>,
    in_use: bool,
    /// 累计取用次数
    pub acquired: usize,
}

impl NodeBuffer {
    pub fn new(node_size: usize) -> Self {
        Self {
            data: vec![0; node_size],
            held: None,
            in_use: false,
            acquired: 0,
        }
    }

    pub fn acquire(
        &mut self,
        cache: &mut BlockCache,
        geo: &Geometry,
        tree: &CatalogTree,
        id: u32,
    ) -> Result<Node<'_>> {
        if self.in_use {
            log::error!("catalog node {id} requested while the node buffer is held");
            return Err(Error::NodeInUse);
        }

        if self.held != Some(id) {
            self.held = None;
            tree.read_node(cache, geo, id, &mut self.data)?;
            self.held = Some(id);
        }

        let node = Node::new(&self.data)?;
        self.in_use = true;
        self.acquired += 1;
        Ok(node)
    }

    pub fn release(&mut self) {
        self.in_use = false;
    }
}

/// 挂载时确定的B树几何
#[derive(Debug, Clone)]
pub(crate) struct CatalogTree {
    pub fork: Fork,
    pub header: BTreeHeader,
}

impl CatalogTree {
    /// 节点按`id * node_size`在fork中定位，可能跨越extent
    pub fn read_node(
        &self,
        cache: &mut BlockCache,
        geo: &Geometry,
        id: u32,
        dst: &mut [u8],
    ) -> Result<()> {
        let base = u64::from(id) * dst.len() as u64;
        let mut read = 0;
        while read < dst.len() {
            let (addr, left) = self
                .fork
                .map(base + read as u64, geo.block_size)
                .ok_or(Error::ExtentsOverflow)?;
            let take = (dst.len() - read).min(left as usize);
            cache.read_cached(
                &mut dst[read..read + take],
                geo.start + (addr / SECTOR_SIZE as u64) as usize,
                take / SECTOR_SIZE,
            )?;
            read += take;
        }
        Ok(())
    }

    /// 从根节点下降到叶子，最多经过`depth`个节点
    pub fn lookup(
        &self,
        cache: &mut BlockCache,
        geo: &Geometry,
        nodes: &mut NodeBuffer,
        key: &CatalogKey,
    ) -> Result<Option<Vec<u8>>> {
        if self.header.root == 0 {
            return Ok(None);
        }

        let mut id = self.header.root;
        for _ in 0..self.header.depth {
            let step = nodes.acquire(cache, geo, self, id)?.search(key);
            nodes.release();

            match step? {
                Step::Child(child) => {
                    log::trace!("catalog: node {id} -> {child}");
                    id = child;
                }
                Step::Found(record) => return Ok(Some(record)),
                Step::Missing => return Ok(None),
            }
        }

        Err(Error::Corrupted("catalog B-tree deeper than its header says"))
    }
}
