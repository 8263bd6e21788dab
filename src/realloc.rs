//! The reallocation state machine: seven cases dispatched over the target
//! block's status, its new footprint relative to the mmap threshold, and
//! how much physical room is already sitting behind it.

use std::ptr;

use crate::align::align_up;
use crate::allocator::Allocator;
use crate::block::{header_of, payload_of, Header, Status, HEADER_SIZE, MMAP_THRESHOLD};
use crate::os;

impl Allocator {
  /// Resizes the allocation at `ptr` to `new_size` bytes, preserving the
  /// leading `min(old, new)` bytes of content. `ptr == null` behaves as
  /// `allocate`; `new_size == 0` behaves as `free`. Reallocating a block
  /// that is already FREE is illegal input and returns null without
  /// touching any state.
  ///
  /// # Safety
  /// `ptr` must be null or a live payload pointer previously returned by
  /// this `Allocator`, and no other call into it may be in progress
  /// concurrently.
  pub unsafe fn reallocate(&mut self, ptr: *mut u8, new_size: usize) -> *mut u8 {
    unsafe {
      if ptr.is_null() && new_size == 0 {
        return ptr::null_mut();
      }
      if ptr.is_null() {
        return self.allocate(new_size);
      }
      if new_size == 0 {
        self.free(ptr);
        return ptr::null_mut();
      }

      let block = header_of(ptr);
      if (*block).status == Status::Free {
        log::warn!("reallocate called on an already-free block at {:p}", ptr);
        return ptr::null_mut();
      }

      if (*block).status == Status::Mapped {
        return self.realloc_mapped(block, ptr, new_size);
      }

      // From here, `block.status == HeapAlloc`.
      if HEADER_SIZE + align_up(new_size) > MMAP_THRESHOLD {
        return self.realloc_migrate_to_mapped(block, ptr, new_size);
      }

      let capacity = self.recovered_capacity(block);

      if align_up(new_size) <= capacity {
        return self.realloc_shrink_in_place(block, ptr, new_size, capacity);
      }

      if (*block).next.is_null() {
        return self.realloc_grow_tail(block, ptr, new_size, capacity);
      }

      if self.realloc_coalesce_forward_until_fits(block, new_size) {
        return ptr;
      }

      if let Some(new_ptr) = self.realloc_relocate(block, ptr, new_size) {
        return new_ptr;
      }

      self.realloc_fallback(block, ptr, new_size)
    }
  }

  /// Case 1: the block is MAPPED. Always migrates — a mapped region has no
  /// in-place resize primitive in this design — possibly back onto the
  /// heap if `new_size` now fits under the threshold.
  unsafe fn realloc_mapped(&mut self, block: *mut Header, ptr: *mut u8, new_size: usize) -> *mut u8 {
    unsafe {
      let new_ptr = self.allocate(new_size);
      if !new_ptr.is_null() {
        let copy_len = (*block).size.min(new_size);
        ptr::copy_nonoverlapping(ptr, new_ptr, copy_len);
      }
      self.free(ptr);
      new_ptr
    }
  }

  /// Case 2: a heap block has grown past the mmap threshold. Migrates to a
  /// fresh mapping.
  unsafe fn realloc_migrate_to_mapped(&mut self, block: *mut Header, ptr: *mut u8, new_size: usize) -> *mut u8 {
    unsafe {
      let footprint_needed = HEADER_SIZE + align_up(new_size);
      let base = os::map_pages(footprint_needed).unwrap_or_else(|e| os::abort_on_os_failure(e));

      let new_block = base as *mut Header;
      (*new_block).size = new_size;
      (*new_block).status = Status::Mapped;
      (*new_block).prev = ptr::null_mut();
      (*new_block).next = ptr::null_mut();
      self.insert_mapped(new_block);

      let new_ptr = payload_of(new_block);
      let copy_len = (*block).size.min(new_size);
      ptr::copy_nonoverlapping(ptr, new_ptr, copy_len);
      self.free(ptr);
      log::debug!("realloc migrated a heap block to a {footprint_needed}-byte mapping");
      new_ptr
    }
  }

  /// Case 3: `new_size` fits within the block's already-recovered physical
  /// capacity. Splits off the unused tail if it is worth keeping, else
  /// just truncates the logical size in place.
  unsafe fn realloc_shrink_in_place(
    &mut self,
    block: *mut Header,
    ptr: *mut u8,
    new_size: usize,
    capacity: usize,
  ) -> *mut u8 {
    use crate::block::MIN_SPLIT_REMAINDER;
    unsafe {
      // `block.size` is restored to `capacity - HEADER_SIZE` below, one
      // header narrower than `capacity` itself. The guard needs that same
      // extra `HEADER_SIZE` of headroom on top of `MIN_SPLIT_REMAINDER`.
      if capacity - align_up(new_size) >= MIN_SPLIT_REMAINDER + HEADER_SIZE {
        (*block).size = capacity - HEADER_SIZE;
        (*block).status = Status::Free;
        self.split(block, new_size);
      } else {
        (*block).size = new_size;
      }
      ptr
    }
  }

  /// Case 4: `block` is the last heap block and has no room behind it.
  /// Extends the break just enough to cover the gap.
  unsafe fn realloc_grow_tail(
    &mut self,
    block: *mut Header,
    ptr: *mut u8,
    new_size: usize,
    capacity: usize,
  ) -> *mut u8 {
    unsafe {
      let grow_by = align_up(new_size) - capacity;
      os::grow_heap(grow_by).unwrap_or_else(|e| os::abort_on_os_failure(e));
      (*block).size = new_size;
      ptr
    }
  }

  /// Case 5: walks `block.next` forward while it is FREE, merging each one
  /// in, until either the block is big enough or a non-FREE neighbour
  /// stops the walk. Accepted slack from a successful merge is retained
  /// rather than split off — an extra list mutation on this path isn't
  /// worth it.
  unsafe fn realloc_coalesce_forward_until_fits(&mut self, block: *mut Header, new_size: usize) -> bool {
    unsafe {
      loop {
        if align_up((*block).size) >= align_up(new_size) {
          return true;
        }
        let next = (*block).next;
        if next.is_null() || (*next).status != Status::Free {
          return false;
        }
        self.coalesce_forward(block);
      }
    }
  }

  /// Case 6: no in-place option worked; try to reuse or extend a heap
  /// block elsewhere. Copies `min(capacity, new_size)` bytes — the
  /// recovered *capacity*, not the logical size — so that bytes exposed by
  /// a prior shrink-then-regrow on the same block are carried forward.
  unsafe fn realloc_relocate(&mut self, block: *mut Header, ptr: *mut u8, new_size: usize) -> Option<*mut u8> {
    unsafe {
      let capacity = self.recovered_capacity(block);
      let replacement = self.reuse_or_extend(new_size);
      if replacement.is_null() {
        return None;
      }

      let new_ptr = payload_of(replacement);
      let copy_len = capacity.min(new_size);
      ptr::copy_nonoverlapping(ptr, new_ptr, copy_len);
      self.free(ptr);
      Some(new_ptr)
    }
  }

  /// Case 7: nothing else worked. Grows a brand-new heap block via
  /// `grow_heap`, copies `min(capacity, new_size)` bytes (same rule as
  /// Case 6), frees the old block, and returns the new payload.
  unsafe fn realloc_fallback(&mut self, block: *mut Header, ptr: *mut u8, new_size: usize) -> *mut u8 {
    unsafe {
      let capacity = self.recovered_capacity(block);
      let footprint_needed = HEADER_SIZE + align_up(new_size);
      let base = os::grow_heap(footprint_needed).unwrap_or_else(|e| os::abort_on_os_failure(e));

      let new_block = base as *mut Header;
      (*new_block).size = new_size;
      (*new_block).status = Status::HeapAlloc;
      (*new_block).prev = ptr::null_mut();
      (*new_block).next = ptr::null_mut();
      self.insert_heap(new_block);

      let new_ptr = payload_of(new_block);
      let copy_len = capacity.min(new_size);
      ptr::copy_nonoverlapping(ptr, new_ptr, copy_len);
      self.free(ptr);
      log::debug!("realloc fell back to a fresh {footprint_needed}-byte heap block");
      new_ptr
    }
  }

  /// The physical distance from `block`'s payload start to its successor,
  /// or to the current program break if `block` is the last heap block.
  /// Authoritative during reallocation because a prior shrink may have
  /// truncated `block.size` below the block's true physical footprint.
  pub(crate) unsafe fn recovered_capacity(&self, block: *mut Header) -> usize {
    unsafe {
      let next = (*block).next;
      let physical_end = if !next.is_null() { next as usize } else { os::current_break() as usize };
      physical_end - (payload_of(block) as usize)
    }
  }
}
