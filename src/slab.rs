//! Slab slicer (§4.4): partitions one raw page into a chain of equally
//! sized free cells, linked head-to-tail through each cell's first machine
//! word. Does not touch the page pool lock.

use crate::PAGE_SIZE;
use core::ptr;

/// A free cell's only state while it sits in a bin: the link to the next
/// free cell. Carries no size field — its class is implied by the bin that
/// holds it (§3).
#[repr(C)]
pub struct FreeCell {
    pub next: *mut FreeCell,
}

/// Slice `page` into `cell_size`-byte cells. Returns the chain's head, tail,
/// and cell count. Any remainder at the page's tail is left unused.
pub unsafe fn slice_page(page: *mut u8, cell_size: usize) -> (*mut FreeCell, *mut FreeCell, usize) {
    let count = PAGE_SIZE / cell_size;
    if count == 0 {
        return (ptr::null_mut(), ptr::null_mut(), 0);
    }
    let head = page as *mut FreeCell;
    let mut current = head;
    for i in 1..count {
        let next = unsafe { page.add(i * cell_size) } as *mut FreeCell;
        unsafe { (*current).next = next };
        current = next;
    }
    unsafe { (*current).next = ptr::null_mut() };
    (head, current, count)
}
