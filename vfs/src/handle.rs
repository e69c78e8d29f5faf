use alloc::vec::Vec;

use crate::{Error, Result};

/// 每个文件系统实例可同时打开的文件数
pub const MAX_HANDLES: usize = 10;

/// 定长的句柄栈
///
/// 句柄号即栈中下标。关闭只对栈顶生效，关闭其它句柄什么也不做；
/// 调用者应按打开的逆序关闭。
#[derive(Debug)]
pub struct HandleStack<T, const N: usize = MAX_HANDLES> {
    slots: Vec<T>,
}

impl<T, const N: usize> Default for HandleStack<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> HandleStack<T, N> {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(N),
        }
    }

    pub fn push(&mut self, state: T) -> Result<usize> {
        if self.slots.len() == N {
            log::error!("all {N} file handles are in use");
            return Err(Error::TooManyOpenFiles);
        }
        self.slots.push(state);
        Ok(self.slots.len() - 1)
    }

    pub fn get(&self, fd: usize) -> Result<&T> {
        self.slots.get(fd).ok_or(Error::BadHandle)
    }

    pub fn get_mut(&mut self, fd: usize) -> Result<&mut T> {
        self.slots.get_mut(fd).ok_or(Error::BadHandle)
    }

    /// 返回句柄是否真的被释放
    pub fn close(&mut self, fd: usize) -> bool {
        if fd + 1 == self.slots.len() {
            self.slots.pop();
            true
        } else {
            log::debug!("close({fd}) ignored, top handle is {:?}", self.slots.len().checked_sub(1));
            false
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
