// Tue Jan 20 2026 - Alex

use crate::structure::LayoutId;
use std::fmt;

const STRING_FLAG: u64 = 0x1;
const LENGTH_SHIFT: u32 = 8;

/// What occupies a segment of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentTag {
    /// Plain fixed-width field.
    Raw,
    /// Filler collapsed into a single blob. Always rendered as a byte array.
    Opaque,
    /// Pointer-width slot holding a `length` byte string.
    StringPointer { length: usize },
    /// Pointer to another layout (record or array).
    Nested(LayoutId),
}

impl SegmentTag {
    /// Integer form of the tag: bit 0 clear for raw fields, bit 0 set for
    /// string pointers with the length stored from bit 8 upwards.
    /// Nested layouts have no integer form.
    pub fn pack(&self) -> Option<u64> {
        match self {
            Self::Raw | Self::Opaque => Some(0),
            Self::StringPointer { length } => Some(((*length as u64) << LENGTH_SHIFT) | STRING_FLAG),
            Self::Nested(_) => None,
        }
    }

    pub fn unpack(value: u64) -> Self {
        if value & STRING_FLAG == 0 {
            Self::Raw
        } else {
            Self::StringPointer { length: (value >> LENGTH_SHIFT) as usize }
        }
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Nested(_))
    }

    pub fn nested(&self) -> Option<LayoutId> {
        match self {
            Self::Nested(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for SegmentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Opaque => write!(f, "opaque"),
            Self::StringPointer { length } => write!(f, "char[{}]*", length),
            Self::Nested(id) => write!(f, "{}*", id),
        }
    }
}

/// One tile of a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub tag: SegmentTag,
    pub width: usize,
}

impl Segment {
    pub fn new(tag: SegmentTag, width: usize) -> Self {
        Self { tag, width }
    }

    pub fn raw(width: usize) -> Self {
        Self::new(SegmentTag::Raw, width)
    }

    pub fn byte() -> Self {
        Self::raw(1)
    }

    pub fn opaque(width: usize) -> Self {
        Self::new(SegmentTag::Opaque, width)
    }

    pub fn string(length: usize, pointer_width: usize) -> Self {
        Self::new(SegmentTag::StringPointer { length }, pointer_width)
    }

    pub fn nested(id: LayoutId, pointer_width: usize) -> Self {
        Self::new(SegmentTag::Nested(id), pointer_width)
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.tag, SegmentTag::Raw | SegmentTag::Opaque)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tag, self.width)
    }
}
