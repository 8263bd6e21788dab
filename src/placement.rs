//! Best-fit search, the reuse/tail-extend decision, and the one-shot heap
//! preallocation trigger.

use std::ptr;

use crate::align::align_up;
use crate::allocator::Allocator;
use crate::block::{footprint, Header, Status, HEADER_SIZE, MIN_SPLIT_REMAINDER, MMAP_THRESHOLD, PREALLOC_SIZE};
use crate::os;

impl Allocator {
  /// Scans the whole list for the best-fitting FREE block: an exact match
  /// wins immediately, otherwise the smallest candidate that still fits
  /// (first one wins ties).
  pub(crate) fn find_best_fit(&self, requested: usize) -> *mut Header {
    unsafe {
      let mut best: *mut Header = ptr::null_mut();
      let mut current = self.head;

      while !current.is_null() {
        if (*current).status == Status::Free && align_up((*current).size) >= align_up(requested) {
          if (*current).size == requested {
            return current;
          }
          if best.is_null() || align_up((*current).size) < align_up((*best).size) {
            best = current;
          }
        }
        current = (*current).next;
      }

      best
    }
  }

  /// Services `requested` bytes from the existing heap without ever
  /// calling `grow_heap` for a brand-new tail block: either a best-fit
  /// reuse (with splitting where it pays off) or an extension of a FREE
  /// tail. Returns null if neither applies, or if the request is too large
  /// to be a heap candidate at all.
  ///
  /// # Safety
  /// Must only be called while no other operation is concurrently mutating
  /// the list.
  pub(crate) unsafe fn reuse_or_extend(&mut self, requested: usize) -> *mut Header {
    unsafe {
      if HEADER_SIZE + align_up(requested) > MMAP_THRESHOLD {
        return ptr::null_mut();
      }

      let best = self.find_best_fit(requested);
      let tail = self.last_heap();
      let tail_is_free = !tail.is_null() && (*tail).status == Status::Free;

      if best.is_null() && !tail_is_free {
        return ptr::null_mut();
      }

      if best.is_null() {
        let grow_by = align_up(requested) - align_up((*tail).size);
        os::grow_heap(grow_by).unwrap_or_else(|e| os::abort_on_os_failure(e));
        (*tail).size = requested;
        (*tail).status = Status::HeapAlloc;
        log::debug!("extended free heap tail by {grow_by} bytes for a {requested}-byte request");
        return tail;
      }

      let residual = footprint(best) - (HEADER_SIZE + align_up(requested));
      if (*best).size == requested || residual < MIN_SPLIT_REMAINDER {
        (*best).status = Status::HeapAlloc;
      } else {
        self.split(best, requested);
      }
      best
    }
  }

  /// Performs the one-shot initial heap reservation and immediately
  /// services `requested` out of it, splitting off the remainder if it is
  /// worth keeping as a separate FREE block.
  ///
  /// # Safety
  /// Must only be called once per `Allocator` and only when
  /// `!self.prealloc_done`.
  pub(crate) unsafe fn preallocate(&mut self, requested: usize) -> *mut Header {
    unsafe {
      let base = os::grow_heap(PREALLOC_SIZE).unwrap_or_else(|e| os::abort_on_os_failure(e));
      log::debug!("preallocated {PREALLOC_SIZE} bytes of heap at {:p}", base);

      let block = base as *mut Header;
      (*block).size = PREALLOC_SIZE - HEADER_SIZE;
      (*block).status = Status::Free;
      (*block).prev = ptr::null_mut();
      (*block).next = ptr::null_mut();
      self.insert_heap(block);
      self.prealloc_done = true;

      let residual = footprint(block) - (HEADER_SIZE + align_up(requested));
      if residual >= MIN_SPLIT_REMAINDER {
        self.split(block, requested);
      } else {
        (*block).status = Status::HeapAlloc;
      }
      block
    }
  }
}
