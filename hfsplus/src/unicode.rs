//! 目录键的名称排序
//!
//! 规则同Apple的FastUnicodeCompare：逐个UTF-16码元查两级小写表后比较，
//! 表中为0的码元（可忽略的格式字符）不参与比较，U+0000排在一切字符之后。
//! 小写表是固定的：带附加符号的预组合字母不折叠，表外的码元原样比较。
//! 不做规范化。

use core::cmp::Ordering;

/// `[first, last]`内每隔`step`的码元依次映射到`to`起的码元，`to`为0表示忽略
#[derive(Clone, Copy)]
struct Fold {
    first: u16,
    last: u16,
    step: u16,
    to: u16,
}

const fn one(from: u16, to: u16) -> Fold {
    Fold { first: from, last: from, step: 1, to }
}

const fn run(first: u16, last: u16, to: u16) -> Fold {
    Fold { first, last, step: 1, to }
}

const fn pairs(first: u16, last: u16) -> Fold {
    Fold { first, last, step: 2, to: first + 1 }
}

const FOLDS: &[Fold] = &[
    // 0x00
    one(0x0000, 0xFFFF),
    run(0x0041, 0x005A, 0x0061),
    one(0x00C6, 0x00E6),
    one(0x00D0, 0x00F0),
    one(0x00D8, 0x00F8),
    one(0x00DE, 0x00FE),
    // 0x01
    one(0x0110, 0x0111),
    one(0x0126, 0x0127),
    one(0x0132, 0x0133),
    one(0x013F, 0x0140),
    one(0x0141, 0x0142),
    one(0x014A, 0x014B),
    one(0x0152, 0x0153),
    one(0x0166, 0x0167),
    one(0x0181, 0x0253),
    pairs(0x0182, 0x0184),
    one(0x0186, 0x0254),
    one(0x0187, 0x0188),
    run(0x0189, 0x018A, 0x0256),
    one(0x018B, 0x018C),
    one(0x018E, 0x01DD),
    one(0x018F, 0x0259),
    one(0x0190, 0x025B),
    one(0x0191, 0x0192),
    one(0x0193, 0x0260),
    one(0x0194, 0x0263),
    one(0x0196, 0x0269),
    one(0x0197, 0x0268),
    one(0x0198, 0x0199),
    one(0x019C, 0x026F),
    one(0x019D, 0x0272),
    one(0x019F, 0x0275),
    pairs(0x01A2, 0x01A4),
    one(0x01A7, 0x01A8),
    one(0x01A9, 0x0283),
    one(0x01AC, 0x01AD),
    one(0x01AE, 0x0288),
    run(0x01B1, 0x01B2, 0x028A),
    pairs(0x01B3, 0x01B5),
    one(0x01B7, 0x0292),
    one(0x01B8, 0x01B9),
    one(0x01BC, 0x01BD),
    one(0x01C4, 0x01C6),
    one(0x01C5, 0x01C6),
    one(0x01C7, 0x01C9),
    one(0x01C8, 0x01C9),
    one(0x01CA, 0x01CC),
    one(0x01CB, 0x01CC),
    one(0x01E4, 0x01E5),
    one(0x01F1, 0x01F3),
    one(0x01F2, 0x01F3),
    // 0x03 希腊与科普特
    run(0x0391, 0x03A1, 0x03B1),
    run(0x03A3, 0x03A9, 0x03C3),
    pairs(0x03E2, 0x03EE),
    // 0x04 西里尔，Й不折叠
    one(0x0402, 0x0452),
    run(0x0404, 0x0406, 0x0454),
    run(0x0408, 0x040B, 0x0458),
    one(0x040F, 0x045F),
    run(0x0410, 0x0418, 0x0430),
    run(0x041A, 0x042F, 0x043A),
    pairs(0x0460, 0x0474),
    pairs(0x0478, 0x0480),
    pairs(0x0490, 0x04BE),
    one(0x04C3, 0x04C4),
    one(0x04C7, 0x04C8),
    one(0x04CB, 0x04CC),
    // 0x05 亚美尼亚
    run(0x0531, 0x0556, 0x0561),
    // 0x10 格鲁吉亚
    run(0x10A0, 0x10C5, 0x10D0),
    // 0x20 可忽略
    run(0x200C, 0x200F, 0),
    run(0x202A, 0x202E, 0),
    run(0x206A, 0x206F, 0),
    // 0x21 罗马数字
    run(0x2160, 0x216F, 0x2170),
    // 0xFE
    one(0xFEFF, 0),
    // 0xFF 全角拉丁字母
    run(0xFF21, 0xFF3A, 0xFF41),
];

/// 有小写页的高字节
const PAGE_OF: [u8; 10] = [0x00, 0x01, 0x03, 0x04, 0x05, 0x10, 0x20, 0x21, 0xFE, 0xFF];

/// 第一级：高字节到页号加1，0表示整页原样
const INDEX: [u8; 256] = {
    let mut index = [0u8; 256];
    let mut i = 0;
    while i < PAGE_OF.len() {
        index[PAGE_OF[i] as usize] = i as u8 + 1;
        i += 1;
    }
    index
};

/// 第二级：每页256个码元的折叠结果
static LOWER: [[u16; 256]; PAGE_OF.len()] = {
    let mut pages = [[0u16; 256]; PAGE_OF.len()];
    let mut p = 0;
    while p < PAGE_OF.len() {
        let mut low = 0;
        while low < 256 {
            pages[p][low] = ((PAGE_OF[p] as u16) << 8) | low as u16;
            low += 1;
        }
        p += 1;
    }

    let mut f = 0;
    while f < FOLDS.len() {
        let fold = FOLDS[f];
        let page = INDEX[(fold.first >> 8) as usize] as usize - 1;
        let mut unit = fold.first;
        while unit <= fold.last {
            let to = if fold.to == 0 { 0 } else { fold.to + (unit - fold.first) };
            pages[page][(unit & 0xFF) as usize] = to;
            unit += fold.step;
        }
        f += 1;
    }
    pages
};

/// 折叠后的码元，`None`表示比较时跳过
pub fn fold(unit: u16) -> Option<u16> {
    let page = INDEX[(unit >> 8) as usize];
    if page == 0 {
        return Some(unit);
    }
    match LOWER[page as usize - 1][(unit & 0xFF) as usize] {
        0 => None,
        low => Some(low),
    }
}

/// 字典序比较，较短的前缀排在前面
pub fn compare<A, B>(a: A, b: B) -> Ordering
where
    A: IntoIterator<Item = u16>,
    B: IntoIterator<Item = u16>,
{
    a.into_iter()
        .filter_map(fold)
        .cmp(b.into_iter().filter_map(fold))
}
