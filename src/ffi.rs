//! C-ABI exports matching the bit-exact malloc-compatible contract of §6:
//! `allocate(n)`, `free(ptr)`, `reallocate(ptr, new_size)` — no caller-
//! supplied size or alignment on the free/realloc path, unlike `GlobalAlloc`.
//!
//! Gated behind `features = ["ffi"]`. One export per design, since both
//! coexist in the crate (§2).

#[unsafe(export_name = "duoalloc_pool_allocate")]
pub unsafe extern "C" fn duoalloc_pool_allocate(n: usize) -> *mut u8 {
    unsafe { crate::pool_alloc::allocate(n) }
}

#[unsafe(export_name = "duoalloc_pool_free")]
pub unsafe extern "C" fn duoalloc_pool_free(ptr: *mut u8) {
    unsafe { crate::pool_alloc::free(ptr) }
}

#[unsafe(export_name = "duoalloc_pool_reallocate")]
pub unsafe extern "C" fn duoalloc_pool_reallocate(ptr: *mut u8, new_size: usize) -> *mut u8 {
    unsafe { crate::pool_alloc::reallocate(ptr, new_size) }
}

#[unsafe(export_name = "duoalloc_list_allocate")]
pub unsafe extern "C" fn duoalloc_list_allocate(n: usize) -> *mut u8 {
    unsafe { crate::coalesce::allocate(n) }
}

#[unsafe(export_name = "duoalloc_list_free")]
pub unsafe extern "C" fn duoalloc_list_free(ptr: *mut u8) {
    unsafe { crate::coalesce::free(ptr) }
}

#[unsafe(export_name = "duoalloc_list_reallocate")]
pub unsafe extern "C" fn duoalloc_list_reallocate(ptr: *mut u8, new_size: usize) -> *mut u8 {
    unsafe { crate::coalesce::reallocate(ptr, new_size) }
}
