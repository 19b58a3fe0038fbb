//! Thread cache (§4.5): per-thread bins of free cells, one per size class.
//! The fast path pops/pushes a thread's own bin with no synchronization;
//! only a bin refill touches the page pool lock.

use crate::page_pool::PagePool;
use crate::size_class::{self, NUM_SIZE_CLASSES};
use crate::slab::{self, FreeCell};
use crate::Header;
use core::ptr;

/// Pages claimed per bin refill (§4.5 implementation guidance: R = 4).
const REFILL_PAGES: usize = 4;

#[derive(Clone, Copy)]
struct Bin {
    head: *mut FreeCell,
}

impl Bin {
    const fn empty() -> Self {
        Self {
            head: ptr::null_mut(),
        }
    }
}

/// A thread's own array of bins. Lives inside the page it claims from the
/// pool at first allocation (§4.5), and is never touched by any other
/// thread.
pub struct ThreadCache {
    bins: [Bin; NUM_SIZE_CLASSES],
}

impl ThreadCache {
    /// Claim the page that will house this thread's cache, construct it in
    /// place, then stock all seven bins from seven freshly sliced pages
    /// (§4.5 initialization). Returns null on OOM.
    pub fn create(pool: &PagePool) -> *mut ThreadCache {
        let housing = pool.take_one();
        if housing.is_null() {
            return ptr::null_mut();
        }
        let tc = housing as *mut ThreadCache;
        unsafe {
            ptr::write(
                tc,
                ThreadCache {
                    bins: [Bin::empty(); NUM_SIZE_CLASSES],
                },
            );
        }
        for class in 0..NUM_SIZE_CLASSES {
            let stock_page = pool.take_one();
            if stock_page.is_null() {
                // Degrade gracefully: this bin simply refills lazily on its
                // first miss instead of being pre-stocked.
                continue;
            }
            let cell_size = size_class::class_to_size(class);
            let (head, _tail, _count) = unsafe { slab::slice_page(stock_page, cell_size) };
            unsafe { (*tc).bins[class].head = head };
        }
        tc
    }

    #[inline]
    fn pop(&mut self, class: usize) -> *mut FreeCell {
        let bin = &mut self.bins[class];
        let cell = bin.head;
        if !cell.is_null() {
            bin.head = unsafe { (*cell).next };
        }
        cell
    }

    #[inline]
    fn push(&mut self, class: usize, cell: *mut FreeCell) {
        let bin = &mut self.bins[class];
        unsafe { (*cell).next = bin.head };
        bin.head = cell;
    }

    #[cold]
    fn refill(&mut self, class: usize, pool: &PagePool) {
        let cell_size = size_class::class_to_size(class);
        for _ in 0..REFILL_PAGES {
            let page = pool.take_one();
            if page.is_null() {
                break;
            }
            let (head, tail, count) = unsafe { slab::slice_page(page, cell_size) };
            if count == 0 {
                continue;
            }
            let bin = &mut self.bins[class];
            unsafe { (*tail).next = bin.head };
            bin.head = head;
        }
    }

    /// Fast allocation path (§4.5): pop the bin head, refilling from the
    /// page pool on a miss. Writes the class's canonical size into the
    /// returned cell's header.
    pub fn allocate(&mut self, class: usize, pool: &PagePool) -> *mut u8 {
        let mut cell = self.pop(class);
        if cell.is_null() {
            self.refill(class, pool);
            cell = self.pop(class);
        }
        if cell.is_null() {
            return ptr::null_mut();
        }
        let header = cell as *mut Header;
        unsafe { (*header).size = size_class::class_to_size(class) };
        unsafe { header.add(1) as *mut u8 }
    }

    /// Fast free path (§4.5): push onto the local bin head. No cross-thread
    /// coordination — a cell freed on a thread other than its allocator
    /// simply joins that thread's bin (§9's accepted simplification).
    pub fn deallocate(&mut self, class: usize, ptr: *mut u8) {
        let cell = unsafe { (ptr as *mut Header).offset(-1) } as *mut FreeCell;
        self.push(class, cell);
    }
}
