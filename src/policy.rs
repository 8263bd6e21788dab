//! The four-operation allocation policy: `allocate`, `free` and
//! `zeroed_allocate`. `reallocate` lives in [`crate::realloc`] since its
//! state machine is large enough to deserve its own module.

use std::ptr;

use crate::align::align_up;
use crate::allocator::Allocator;
use crate::block::{footprint, header_of, payload_of, Header, Status, HEADER_SIZE, MMAP_THRESHOLD};
use crate::os;

impl Allocator {
  /// Returns an 8-aligned pointer to at least `size` usable bytes, or null
  /// if `size == 0`.
  ///
  /// Requests whose footprint exceeds [`MMAP_THRESHOLD`] are served by a
  /// fresh anonymous mapping; everything else is served on the heap,
  /// triggering the one-shot preallocation on the very first call.
  ///
  /// # Safety
  /// No other call into this `Allocator` may be in progress concurrently.
  pub unsafe fn allocate(&mut self, size: usize) -> *mut u8 {
    unsafe {
      if size == 0 {
        return ptr::null_mut();
      }

      if HEADER_SIZE + align_up(size) <= MMAP_THRESHOLD {
        self.allocate_on_heap(size)
      } else {
        self.allocate_mapped(size)
      }
    }
  }

  /// Shared by [`Allocator::allocate`] and [`Allocator::zeroed_allocate`]:
  /// services `size` from the heap, preallocating on the first call.
  pub(crate) unsafe fn allocate_on_heap(&mut self, size: usize) -> *mut u8 {
    unsafe {
      if !self.prealloc_done {
        return payload_of(self.preallocate(size));
      }

      let reused = self.reuse_or_extend(size);
      if !reused.is_null() {
        return payload_of(reused);
      }

      let footprint_needed = HEADER_SIZE + align_up(size);
      let base = os::grow_heap(footprint_needed).unwrap_or_else(|e| os::abort_on_os_failure(e));

      let block = base as *mut Header;
      (*block).size = size;
      (*block).status = Status::HeapAlloc;
      (*block).prev = ptr::null_mut();
      (*block).next = ptr::null_mut();
      self.insert_heap(block);
      log::debug!("grew heap by a fresh {footprint_needed}-byte block");

      payload_of(block)
    }
  }

  /// Shared by [`Allocator::allocate`] and [`Allocator::zeroed_allocate`]:
  /// services `size` with a fresh anonymous mapping.
  pub(crate) unsafe fn allocate_mapped(&mut self, size: usize) -> *mut u8 {
    unsafe {
      let footprint_needed = HEADER_SIZE + align_up(size);
      let base = os::map_pages(footprint_needed).unwrap_or_else(|e| os::abort_on_os_failure(e));

      let block = base as *mut Header;
      (*block).size = size;
      (*block).status = Status::Mapped;
      (*block).prev = ptr::null_mut();
      (*block).next = ptr::null_mut();
      self.insert_mapped(block);
      log::debug!("mapped a fresh {footprint_needed}-byte block");

      payload_of(block)
    }
  }

  /// Releases a payload pointer previously returned by `allocate`,
  /// `zeroed_allocate` or `reallocate`. Null is a no-op; freeing an
  /// already-FREE block is a no-op (double-free is not an error here).
  ///
  /// # Safety
  /// `ptr` must either be null or have been returned by this `Allocator`
  /// and not already passed to `free`/`reallocate` in a way that retired
  /// it.
  pub unsafe fn free(&mut self, ptr: *mut u8) {
    unsafe {
      if ptr.is_null() {
        return;
      }

      let block = header_of(ptr);
      match (*block).status {
        Status::Mapped => {
          let len = footprint(block);
          self.extract(block);
          os::unmap(block as *mut u8, len).unwrap_or_else(|e| os::abort_on_os_failure(e));
          log::debug!("unmapped a {len}-byte block");
        }
        Status::HeapAlloc => {
          (*block).status = Status::Free;
          self.coalesce_forward(block);
          self.coalesce_backward(block);
        }
        Status::Free => {
          log::trace!("ignoring double free at {:p}", ptr);
        }
      }
    }
  }

  /// Allocates storage for `count` elements of `element_size` bytes each,
  /// zero-initialized. Returns null if either factor is zero, or if
  /// `count * element_size` overflows `usize`.
  ///
  /// Uses the OS page size rather than [`MMAP_THRESHOLD`] as the brk/mmap
  /// split for this entry point specifically — an intentional asymmetry,
  /// not a bug.
  ///
  /// # Safety
  /// Same conditions as [`Allocator::allocate`].
  pub unsafe fn zeroed_allocate(&mut self, count: usize, element_size: usize) -> *mut u8 {
    unsafe {
      if count == 0 || element_size == 0 {
        return ptr::null_mut();
      }

      let size = match count.checked_mul(element_size) {
        Some(size) => size,
        None => {
          log::warn!("zeroed_allocate overflow: {count} * {element_size}");
          return ptr::null_mut();
        }
      };

      let footprint_needed = HEADER_SIZE + align_up(size);
      let page_size = os::page_size();

      let payload = if footprint_needed <= page_size {
        self.allocate_on_heap(size)
      } else {
        self.allocate_mapped(size)
      };

      if !payload.is_null() {
        ptr::write_bytes(payload, 0u8, size);
      }
      payload
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::TEST_LOCK;

  #[test]
  fn allocate_zero_returns_null() {
    let _guard = TEST_LOCK.lock().unwrap();
    let mut allocator = Allocator::new();
    unsafe {
      assert!(allocator.allocate(0).is_null());
    }
  }

  #[test]
  fn free_null_is_a_noop() {
    let _guard = TEST_LOCK.lock().unwrap();
    let mut allocator = Allocator::new();
    unsafe {
      allocator.free(ptr::null_mut());
    }
  }

  #[test]
  fn zeroed_allocate_rejects_zero_factors() {
    let _guard = TEST_LOCK.lock().unwrap();
    let mut allocator = Allocator::new();
    unsafe {
      assert!(allocator.zeroed_allocate(0, 8).is_null());
      assert!(allocator.zeroed_allocate(8, 0).is_null());
    }
  }

  #[test]
  fn zeroed_allocate_rejects_overflowing_product() {
    let _guard = TEST_LOCK.lock().unwrap();
    let mut allocator = Allocator::new();
    unsafe {
      assert!(allocator.zeroed_allocate(usize::MAX, 2).is_null());
    }
  }

  #[test]
  fn allocate_returns_aligned_writable_memory() {
    let _guard = TEST_LOCK.lock().unwrap();
    let mut allocator = Allocator::new();
    unsafe {
      let p = allocator.allocate(37);
      assert!(!p.is_null());
      assert_eq!((p as usize) % 8, 0);
      ptr::write_bytes(p, 0xAB, 37);
      for i in 0..37 {
        assert_eq!(*p.add(i), 0xAB);
      }
      allocator.free(p);
    }
  }

  #[test]
  fn zeroed_allocate_returns_zeroed_memory() {
    let _guard = TEST_LOCK.lock().unwrap();
    let mut allocator = Allocator::new();
    unsafe {
      let p = allocator.zeroed_allocate(16, 4);
      assert!(!p.is_null());
      for i in 0..64 {
        assert_eq!(*p.add(i), 0);
      }
      allocator.free(p);
    }
  }

  #[test]
  fn double_free_is_a_noop() {
    let _guard = TEST_LOCK.lock().unwrap();
    let mut allocator = Allocator::new();
    unsafe {
      let p = allocator.allocate(16);
      allocator.free(p);
      allocator.free(p);
    }
  }

  #[test]
  fn best_fit_reuses_freed_block_over_growing_the_heap() {
    let _guard = TEST_LOCK.lock().unwrap();
    let mut allocator = Allocator::new();
    unsafe {
      let a = allocator.allocate(100);
      let _b = allocator.allocate(200);
      allocator.free(a);
      let c = allocator.allocate(80);
      assert_eq!(c, a);
    }
  }

  #[test]
  fn large_request_is_served_by_mapping() {
    let _guard = TEST_LOCK.lock().unwrap();
    let mut allocator = Allocator::new();
    unsafe {
      let big = allocator.allocate(200_000);
      assert!(!big.is_null());
      let block = header_of(big);
      assert_eq!((*block).status, Status::Mapped);
      allocator.free(big);
    }
  }
}
