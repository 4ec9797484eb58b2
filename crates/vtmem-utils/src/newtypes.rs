use std::fmt::{self, Display, Formatter};
use std::ops::{Add, AddAssign, Sub};

/// Byte offset relative to the start of a container object, header included.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ByteOffset(pub usize);

impl Display for ByteOffset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for ByteOffset {
    fn from(offset: usize) -> Self {
        ByteOffset(offset)
    }
}

impl From<ByteOffset> for usize {
    fn from(offset: ByteOffset) -> Self {
        offset.0
    }
}

impl ByteOffset {
    pub const ZERO: Self = ByteOffset(0);

    pub fn new(offset: usize) -> Self {
        ByteOffset(offset)
    }

    pub fn checked_add(self, other: impl Into<usize>) -> Option<Self> {
        self.0.checked_add(other.into()).map(ByteOffset)
    }

    pub fn checked_sub(self, other: impl Into<usize>) -> Option<Self> {
        self.0.checked_sub(other.into()).map(ByteOffset)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl Add<usize> for ByteOffset {
    type Output = Self;
    fn add(self, rhs: usize) -> Self {
        ByteOffset(self.0 + rhs)
    }
}

impl Add<ByteOffset> for ByteOffset {
    type Output = Self;
    fn add(self, rhs: ByteOffset) -> Self {
        ByteOffset(self.0 + rhs.0)
    }
}

impl Sub<ByteOffset> for ByteOffset {
    type Output = usize;
    fn sub(self, rhs: ByteOffset) -> usize {
        self.0 - rhs.0
    }
}

impl AddAssign<usize> for ByteOffset {
    fn add_assign(&mut self, rhs: usize) {
        self.0 += rhs;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldIndex(pub usize);

impl Display for FieldIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for FieldIndex {
    fn from(index: usize) -> Self {
        FieldIndex(index)
    }
}

/// Identifier of a registered type. Also the value written into the class
/// slot of every object header, so `0` is never handed out.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

impl Display for TypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a heap object. Reference slots store this value; `0` is null.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u32);

impl HandleId {
    pub const NULL: u64 = 0;

    pub fn from_slot(raw: u64) -> Option<Self> {
        match raw {
            0 => None,
            // Slots are never wider than the id space, truncation cannot lose bits.
            v => Some(HandleId(v as u32)),
        }
    }

    pub fn to_slot(this: Option<Self>) -> u64 {
        this.map(|h| h.0 as u64).unwrap_or(Self::NULL)
    }
}

impl Display for HandleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
