//! Basic synchronization primitives.
//!
//! Low-level crates depend on this module instead of naming `parking_lot` and
//! `std::sync` directly, so the lock implementation can be swapped in one place.
pub use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use std::sync::{
    atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
    Arc,
};
