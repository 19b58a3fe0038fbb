//! Page pool (§4.2): a process-global stack of free 4 KiB pages, refilled
//! in bulk from the OS and protected by one lock. The lock is held across
//! the entire take — coarse granularity is fine because the pool is cold
//! relative to the thread caches it feeds.

use crate::sync::SpinMutex;
use crate::{platform, PAGE_SIZE};
use core::ptr;

/// Pages mapped per bulk refill. The spec's implementation guidance is
/// `[1024, 2048]`; the low end keeps startup `mmap` sizes modest under test.
const REFILL_BATCH_PAGES: usize = 1024;

#[repr(C)]
struct PageNode {
    next: *mut PageNode,
}

struct PagePoolInner {
    head: *mut PageNode,
}

pub struct PagePool {
    inner: SpinMutex<PagePoolInner>,
}

impl PagePool {
    pub const fn new() -> Self {
        Self {
            inner: SpinMutex::new(PagePoolInner {
                head: ptr::null_mut(),
            }),
        }
    }

    /// Map one fresh batch and thread it onto the stack. Caller holds the
    /// lock. Returns `false` on kernel exhaustion.
    fn refill_locked(inner: &mut PagePoolInner) -> bool {
        let base = unsafe { platform::map_pages(REFILL_BATCH_PAGES) };
        if base.is_null() {
            return false;
        }
        let mut current = base as *mut PageNode;
        for i in 1..REFILL_BATCH_PAGES {
            let next = unsafe { base.add(i * PAGE_SIZE) } as *mut PageNode;
            unsafe { (*current).next = next };
            current = next;
        }
        unsafe { (*current).next = inner.head };
        inner.head = base as *mut PageNode;
        true
    }

    /// Eagerly map the first batch so the pool isn't empty at first use.
    /// Idempotent once the pool already holds pages. Used by the per-process
    /// init gate (§4.8).
    pub fn prime(&self) -> bool {
        let mut inner = self.inner.lock();
        if !inner.head.is_null() {
            return true;
        }
        Self::refill_locked(&mut inner)
    }

    /// Claim a chain of `n` raw pages, refilling one batch at a time as
    /// needed until `n` are available. Returns null on OOM, with any pages
    /// already claimed during this call returned to the pool first.
    pub fn take_many(&self, n: usize) -> *mut u8 {
        if n == 0 {
            return ptr::null_mut();
        }
        let mut inner = self.inner.lock();
        let mut head: *mut PageNode = ptr::null_mut();
        let mut tail: *mut PageNode = ptr::null_mut();
        let mut claimed = 0;
        while claimed < n {
            if inner.head.is_null() && !Self::refill_locked(&mut inner) {
                if !tail.is_null() {
                    unsafe { (*tail).next = inner.head };
                    inner.head = head;
                }
                return ptr::null_mut();
            }
            let node = inner.head;
            inner.head = unsafe { (*node).next };
            unsafe { (*node).next = ptr::null_mut() };
            if tail.is_null() {
                head = node;
            } else {
                unsafe { (*tail).next = node };
            }
            tail = node;
            claimed += 1;
        }
        head as *mut u8
    }

    pub fn take_one(&self) -> *mut u8 {
        self.take_many(1)
    }
}
