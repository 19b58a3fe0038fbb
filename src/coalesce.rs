//! Design A (§2, §4.7): the single-tier coalescing allocator. One
//! process-wide address-sorted free list of variable-size blocks, protected
//! by one mutex that also guards the statistics counters — mirroring the
//! original source's single `pthread_mutex_t` covering both.

use crate::{platform, Header, HEADER_SIZE, PAGE_SIZE};
use core::ptr;
use std::sync::Mutex;

/// A free block, written into the first bytes of its own extent. `size` is
/// the block's total extent (matching the live-allocation header layout so
/// a block can flip between free and allocated by rewriting one word).
#[repr(C)]
struct FreeBlock {
    size: usize,
    next: *mut FreeBlock,
}

/// Minimum size of a free block: it must be able to hold its own header
/// (§3: "the minimum free block size equals the free-block header size").
const MIN_FREE_BLOCK: usize = core::mem::size_of::<FreeBlock>();

/// Allocation/free/free-list-length counters (§4.9), updated only while the
/// list mutex is held.
#[derive(Default, Clone, Copy)]
pub struct Stats {
    pub pages_mapped: u64,
    pub pages_unmapped: u64,
    pub chunks_allocated: u64,
    pub chunks_freed: u64,
    pub free_length: u64,
}

struct State {
    head: *mut FreeBlock,
    stats: Stats,
}

unsafe impl Send for State {}

static FREE_LIST: Mutex<State> = Mutex::new(State {
    head: ptr::null_mut(),
    stats: Stats {
        pages_mapped: 0,
        pages_unmapped: 0,
        chunks_allocated: 0,
        chunks_freed: 0,
        free_length: 0,
    },
});

/// Insert `block` into the address-sorted list rooted at `state.head`, then
/// merge any newly-adjacent neighbors (§4.7 free: "insert at address-sorted
/// position, then run a coalescing pass").
fn insert_and_coalesce(state: &mut State, block: *mut FreeBlock) {
    unsafe {
        let mut prev: *mut FreeBlock = ptr::null_mut();
        let mut cur = state.head;
        while !cur.is_null() && (cur as usize) < (block as usize) {
            prev = cur;
            cur = (*cur).next;
        }
        (*block).next = cur;
        if prev.is_null() {
            state.head = block;
        } else {
            (*prev).next = block;
        }

        let mut node = state.head;
        while !node.is_null() {
            let next = (*node).next;
            if !next.is_null() {
                let node_end = (node as usize) + (*node).size;
                if node_end == next as usize {
                    (*node).size += (*next).size;
                    (*node).next = (*next).next;
                    continue;
                }
            }
            node = (*node).next;
        }
    }
}

/// First-fit search (§4.7 allocate): unlink the first block whose size is
/// `>= total`, carving off and reinserting a remainder block when the
/// leftover is large enough to host its own header.
fn take_free_block(state: &mut State, total: usize) -> *mut FreeBlock {
    unsafe {
        let mut prev: *mut FreeBlock = ptr::null_mut();
        let mut cur = state.head;
        while !cur.is_null() {
            if (*cur).size >= total {
                let next = (*cur).next;
                if prev.is_null() {
                    state.head = next;
                } else {
                    (*prev).next = next;
                }

                let remainder = (*cur).size - total;
                if remainder >= MIN_FREE_BLOCK {
                    let tail = (cur as *mut u8).add(total) as *mut FreeBlock;
                    (*tail).size = remainder;
                    (*tail).next = ptr::null_mut();
                    insert_and_coalesce(state, tail);
                    (*cur).size = total;
                }
                return cur;
            }
            prev = cur;
            cur = (*cur).next;
        }
        ptr::null_mut()
    }
}

fn free_list_len(state: &State) -> u64 {
    let mut count = 0u64;
    let mut node = state.head;
    unsafe {
        while !node.is_null() {
            count += 1;
            node = (*node).next;
        }
    }
    count
}

/// Allocate `n` bytes (§6). Requests whose header-inclusive size is `>=`
/// one page are mapped directly, bypassing the free list entirely.
pub unsafe fn allocate(n: usize) -> *mut u8 {
    let total = n + HEADER_SIZE;
    if total >= PAGE_SIZE {
        let pages = total.div_ceil(PAGE_SIZE);
        let base = unsafe { platform::map_pages(pages) };
        if base.is_null() {
            return ptr::null_mut();
        }
        let header = base as *mut Header;
        unsafe { (*header).size = pages * PAGE_SIZE };
        let mut state = FREE_LIST.lock().unwrap();
        state.stats.pages_mapped += pages as u64;
        state.stats.chunks_allocated += 1;
        return unsafe { header.add(1) as *mut u8 };
    }

    let mut state = FREE_LIST.lock().unwrap();
    let mut block = take_free_block(&mut state, total);
    if block.is_null() {
        let base = unsafe { platform::map_pages(1) };
        if base.is_null() {
            return ptr::null_mut();
        }
        state.stats.pages_mapped += 1;
        let fresh = base as *mut FreeBlock;
        unsafe {
            (*fresh).size = PAGE_SIZE;
            (*fresh).next = ptr::null_mut();
        }
        insert_and_coalesce(&mut state, fresh);
        block = take_free_block(&mut state, total);
        if block.is_null() {
            return ptr::null_mut();
        }
    }

    state.stats.chunks_allocated += 1;
    state.stats.free_length = free_list_len(&state);

    let header = block as *mut Header;
    unsafe { header.add(1) as *mut u8 }
}

/// Free a pointer previously returned by [`allocate`], or null (§6).
pub unsafe fn free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    let header = unsafe { (ptr as *mut Header).offset(-1) };
    let size = unsafe { (*header).size };

    if size >= PAGE_SIZE && size % PAGE_SIZE == 0 {
        let pages = size / PAGE_SIZE;
        unsafe { platform::unmap_pages(header as *mut u8, pages) };
        let mut state = FREE_LIST.lock().unwrap();
        state.stats.pages_unmapped += pages as u64;
        state.stats.chunks_freed += 1;
        return;
    }

    let mut state = FREE_LIST.lock().unwrap();
    let block = header as *mut FreeBlock;
    unsafe {
        (*block).size = size;
        (*block).next = ptr::null_mut();
    }
    insert_and_coalesce(&mut state, block);
    state.stats.chunks_freed += 1;
    state.stats.free_length = free_list_len(&state);
}

/// Reallocate to `new_size` bytes (§4.7): the same pointer if it already
/// fits, otherwise allocate fresh, copy the overlap, and free the old block.
pub unsafe fn reallocate(ptr: *mut u8, new_size: usize) -> *mut u8 {
    if ptr.is_null() {
        return unsafe { allocate(new_size) };
    }

    let header = unsafe { (ptr as *mut Header).offset(-1) };
    let old_size = unsafe { (*header).size };
    let old_payload = old_size - HEADER_SIZE;

    if new_size <= old_payload {
        return ptr;
    }

    let new_ptr = unsafe { allocate(new_size) };
    if !new_ptr.is_null() {
        let copy_len = old_payload.min(new_size);
        unsafe { ptr::copy_nonoverlapping(ptr, new_ptr, copy_len) };
        unsafe { free(ptr) };
    }
    new_ptr
}

/// Snapshot the current counters (§6 stats surface, Design A only).
pub fn stats() -> Stats {
    let state = FREE_LIST.lock().unwrap();
    Stats {
        free_length: free_list_len(&state),
        ..state.stats
    }
}

/// Emit a labeled block of the current counters to the diagnostic stream
/// (§6: "printable via a helper that emits a labeled block").
pub fn print_stats() {
    let s = stats();
    log::info!(
        "coalesce stats: pages_mapped={} pages_unmapped={} chunks_allocated={} chunks_freed={} free_length={}",
        s.pages_mapped,
        s.pages_unmapped,
        s.chunks_allocated,
        s.chunks_freed,
        s.free_length,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_zero_returns_freeable_pointer() {
        unsafe {
            let p = allocate(0);
            assert!(!p.is_null());
            free(p);
        }
    }

    #[test]
    fn test_reuse_after_free() {
        unsafe {
            let p1 = allocate(100);
            assert!(!p1.is_null());
            core::ptr::write_bytes(p1, 0xAB, 100);
            free(p1);
            let p2 = allocate(100);
            assert!(!p2.is_null());
            free(p2);
        }
    }

    #[test]
    fn test_three_adjacent_blocks_coalesce_after_frees() {
        unsafe {
            let a = allocate(64);
            let b = allocate(64);
            let c = allocate(64);
            assert!(!a.is_null() && !b.is_null() && !c.is_null());

            free(b);
            free(a);

            let state = FREE_LIST.lock().unwrap();
            let a_header = (a as *mut Header).offset(-1) as *mut FreeBlock;
            let merged_span = (*a_header).size;
            assert!(merged_span >= 2 * (64 + HEADER_SIZE));
            drop(state);

            free(c);
        }
    }

    #[test]
    fn test_large_allocation_bypasses_free_list() {
        unsafe {
            let before = stats().free_length;
            let p = allocate(PAGE_SIZE * 2);
            assert!(!p.is_null());
            assert_eq!(stats().free_length, before);
            free(p);
        }
    }

    #[test]
    fn test_reallocate_preserves_prefix_and_grows() {
        unsafe {
            let p = allocate(16);
            assert!(!p.is_null());
            core::ptr::write_bytes(p, 0xCD, 16);
            let q = reallocate(p, 4000);
            assert!(!q.is_null());
            let slice = core::slice::from_raw_parts(q, 16);
            assert!(slice.iter().all(|&b| b == 0xCD));
            free(q);
        }
    }

    #[test]
    fn test_reallocate_shrink_returns_same_pointer() {
        unsafe {
            let p = allocate(100);
            assert!(!p.is_null());
            let q = reallocate(p, 10);
            assert_eq!(p, q);
            free(q);
        }
    }

    #[test]
    fn test_stats_track_allocations_and_frees() {
        unsafe {
            let before = stats();
            let p = allocate(32);
            let after_alloc = stats();
            assert!(after_alloc.chunks_allocated > before.chunks_allocated);
            free(p);
            let after_free = stats();
            assert!(after_free.chunks_freed > before.chunks_freed);
        }
    }
}
