//! # vtmem-heap
//!
//! Live objects laid out by a [`LayoutEngine`](vtmem_layout::LayoutEngine)
//! and the offset-based [`UnsafeAccess`] API over them.
//!
//! Objects are handles into a non-collecting [`Heap`]. Reference slots hold
//! handle ids; flattened fields hold the payload bytes of a value type inline.
pub mod access;
pub mod error;
pub mod heap;
mod location;
pub mod object;
pub mod unsafe_ops;

pub use access::RawMemoryAccess;
pub use error::AccessError;
pub use heap::Heap;
pub use object::{FieldValue, HeapObject, ObjectRef, PrimitiveValue};
pub use unsafe_ops::{CasOutcome, CasShape, UnsafeAccess};
