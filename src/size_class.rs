//! Size-class table for the thread-cache fast path (§4.3).
//!
//! Seven power-of-two classes, 32 through 2048 bytes. Class `k` has
//! canonical size `2^(5+k)`. A request whose header-inclusive size exceeds
//! 2048 bypasses the thread cache entirely and is served by the
//! large-object path (§4.6).

use crate::HEADER_SIZE;

pub const NUM_SIZE_CLASSES: usize = 7;
pub const MAX_CLASS_SIZE: usize = 2048;

/// Canonical cell size for a class index.
#[inline]
pub const fn class_to_size(class: usize) -> usize {
    1usize << (5 + class)
}

/// Smallest class whose canonical size is `>= total_size`, or `None` if
/// `total_size` exceeds the largest class (the large-object path applies).
#[inline]
pub fn best_class(total_size: usize) -> Option<usize> {
    if total_size > MAX_CLASS_SIZE {
        return None;
    }
    (0..NUM_SIZE_CLASSES).find(|&class| class_to_size(class) >= total_size)
}

/// Map a requested payload size to its size class, accounting for the header
/// that will precede the returned pointer. `None` means the large-object
/// path applies.
#[inline]
pub fn class_for_payload(payload: usize) -> Option<usize> {
    best_class(payload.saturating_add(HEADER_SIZE))
}

/// Recover a size class from a cell's canonical size, as recorded in its
/// header at allocation time. Class sizes are exact powers of two, so this
/// is a single `trailing_zeros` computation (§3: "the block header size
/// field never falsifies the fast-path classification").
#[inline]
pub fn class_of_size(size: usize) -> usize {
    (size.trailing_zeros() as usize) - 5
}
