//! Design B (§2): the two-tier allocator. Ties the page pool and thread
//! caches together behind `GlobalAlloc` and the malloc-compatible surface
//! from §6. Static state lives here, matching the teacher's convention of
//! keeping all mutable state in module-level statics rather than on the
//! zero-sized allocator type.

use crate::page_pool::PagePool;
use crate::size_class;
use crate::thread_cache::ThreadCache;
use crate::{platform, Header, HEADER_SIZE, PAGE_SIZE};
use core::alloc::{GlobalAlloc, Layout};
use core::cell::Cell;
use core::ptr;
use core::sync::atomic::{AtomicU8, Ordering};

const UNTOUCHED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

/// Three-state idempotent init gate (§4.8). The first thread to observe
/// `UNTOUCHED` runs process-global init exactly once; concurrent threads
/// spin until it reports `READY`.
struct InitGate {
    state: AtomicU8,
}

impl InitGate {
    const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNTOUCHED),
        }
    }

    fn ensure(&self, init: impl FnOnce()) {
        match self
            .state
            .compare_exchange(UNTOUCHED, INITIALIZING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                init();
                self.state.store(READY, Ordering::Release);
            }
            Err(INITIALIZING) | Err(_) => {
                while self.state.load(Ordering::Acquire) != READY {
                    core::hint::spin_loop();
                }
            }
        }
    }
}

static PAGE_POOL: PagePool = PagePool::new();
static INIT: InitGate = InitGate::new();

thread_local! {
    static TC_SLOT: Cell<*mut ThreadCache> = const { Cell::new(ptr::null_mut()) };
}

fn ensure_init() {
    INIT.ensure(|| {
        let ok = PAGE_POOL.prime();
        debug_assert!(ok, "initial page pool refill failed");
    });
}

/// Access this thread's cache, lazily creating it on first use (§3
/// lifecycle: "created on a thread's first allocation and persists until
/// thread exit"). Returns `None` only if TLS is unreachable (thread
/// teardown) or the cache's own page couldn't be claimed.
#[inline]
fn with_thread_cache<R>(f: impl FnOnce(&mut ThreadCache) -> R) -> Option<R> {
    TC_SLOT
        .try_with(|slot| {
            let mut tc = slot.get();
            if tc.is_null() {
                tc = ThreadCache::create(&PAGE_POOL);
                if tc.is_null() {
                    return None;
                }
                slot.set(tc);
            }
            Some(unsafe { f(&mut *tc) })
        })
        .ok()
        .flatten()
}

const LARGE_THRESHOLD: usize = size_class::MAX_CLASS_SIZE;

/// Large-object path (§4.6): map pages directly, bypassing both tiers.
unsafe fn allocate_large(total_size: usize) -> *mut u8 {
    let pages = total_size.div_ceil(PAGE_SIZE);
    let base = unsafe { platform::map_pages(pages) };
    if base.is_null() {
        return ptr::null_mut();
    }
    let header = base as *mut Header;
    unsafe { (*header).size = pages * PAGE_SIZE };
    unsafe { header.add(1) as *mut u8 }
}

unsafe fn free_large(header: *mut Header, mapped_bytes: usize) {
    let pages = mapped_bytes / PAGE_SIZE;
    unsafe { platform::unmap_pages(header as *mut u8, pages) };
}

/// Allocate `n` bytes (§6). Returns a pointer to at least `n` writable
/// bytes, aligned to at least a machine word, or null on OOM. `n == 0`
/// still returns a freeable pointer (§9 open question, resolved per spec).
pub unsafe fn allocate(n: usize) -> *mut u8 {
    ensure_init();
    match size_class::class_for_payload(n) {
        Some(class) => {
            with_thread_cache(|tc| tc.allocate(class, &PAGE_POOL)).unwrap_or(ptr::null_mut())
        }
        None => unsafe { allocate_large(n + HEADER_SIZE) },
    }
}

/// Free a pointer previously returned by [`allocate`], or null (§6).
/// Double-freeing or freeing a foreign pointer is undefined behavior (§7).
pub unsafe fn free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    let header = unsafe { (ptr as *mut Header).offset(-1) };
    let size = unsafe { (*header).size };
    if size <= LARGE_THRESHOLD {
        let class = size_class::class_of_size(size);
        let _ = with_thread_cache(|tc| tc.deallocate(class, ptr));
    } else {
        unsafe { free_large(header, size) };
    }
}

/// Reallocate to `new_size` bytes, copying `min(old_payload, new_size)`
/// bytes and freeing the old pointer on success (§6). A pointer that
/// already has enough room is returned unchanged — this is a same-class
/// fit check, not the in-place *shrinking* the spec excludes as a
/// non-goal.
pub unsafe fn reallocate(ptr: *mut u8, new_size: usize) -> *mut u8 {
    if ptr.is_null() {
        return unsafe { allocate(new_size) };
    }
    if new_size == 0 {
        unsafe { free(ptr) };
        return unsafe { allocate(0) };
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

/// Two-tier thread-caching allocator (§2 Design B).
///
/// ```ignore
/// #[global_allocator]
/// static GLOBAL: duoalloc::PoolAlloc = duoalloc::PoolAlloc;
/// ```
pub struct PoolAlloc;

unsafe impl GlobalAlloc for PoolAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        unsafe { allocate(layout.size()) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        unsafe { free(ptr) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { self.alloc(layout) };
        if !ptr.is_null() && layout.size() > 0 {
            unsafe { ptr::write_bytes(ptr, 0, layout.size()) };
        }
        ptr
    }

    unsafe fn realloc(&self, ptr: *mut u8, _layout: Layout, new_size: usize) -> *mut u8 {
        unsafe { reallocate(ptr, new_size) }
    }
}
