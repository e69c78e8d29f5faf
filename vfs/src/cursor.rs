use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// 相对文件开头
    Set,
    /// 相对当前位置
    Cur,
    /// 相对文件末尾
    End,
}

/// 打开文件的读写位置，恒有`position <= length`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileCursor {
    position: usize,
    length: usize,
}

impl FileCursor {
    pub const fn new(length: usize) -> Self {
        Self {
            position: 0,
            length,
        }
    }

    pub const fn position(&self) -> usize {
        self.position
    }

    pub const fn len(&self) -> usize {
        self.length
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub const fn remaining(&self) -> usize {
        self.length - self.position
    }

    /// 越界是错误，不做截断
    pub fn seek(&mut self, offset: isize, whence: Whence) -> Result<usize> {
        let base = match whence {
            Whence::Set => 0,
            Whence::Cur => self.position,
            Whence::End => self.length,
        };

        let target = base
            .checked_add_signed(offset)
            .filter(|&pos| pos <= self.length)
            .ok_or(Error::OutOfRange)?;
        self.position = target;

        Ok(target)
    }

    /// 本次最多能读多少字节
    pub fn clamp(&self, want: usize) -> usize {
        want.min(self.remaining())
    }

    pub fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.remaining());
        self.position += n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_within_bounds() {
        let mut cursor = FileCursor::new(100);
        assert_eq!(Ok(40), cursor.seek(40, Whence::Set));
        assert_eq!(Ok(50), cursor.seek(10, Whence::Cur));
        assert_eq!(Ok(90), cursor.seek(-10, Whence::End));
        assert_eq!(Ok(100), cursor.seek(0, Whence::End));
        assert_eq!(0, cursor.remaining());
    }

    #[test]
    fn seek_out_of_range_keeps_position() {
        let mut cursor = FileCursor::new(100);
        cursor.seek(30, Whence::Set).unwrap();
        assert_eq!(Err(Error::OutOfRange), cursor.seek(1, Whence::End));
        assert_eq!(Err(Error::OutOfRange), cursor.seek(-31, Whence::Cur));
        assert_eq!(30, cursor.position());
    }

    #[test]
    fn clamp_to_remaining() {
        let mut cursor = FileCursor::new(10);
        cursor.seek(7, Whence::Set).unwrap();
        assert_eq!(3, cursor.clamp(100));
        assert_eq!(2, cursor.clamp(2));
    }
}
