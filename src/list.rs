//! The intrusive, doubly linked list that threads every live block —
//! mapped and heap alike — through `Header::prev`/`Header::next`.
//!
//! Ordering invariant: every MAPPED block precedes every heap block, and
//! heap blocks are in ascending address order because the break only
//! grows.

use std::ptr;

use crate::align::align_up;
use crate::allocator::Allocator;
use crate::block::{footprint, Header, Status};

impl Allocator {
  /// Appends `block` at the tail of the list. Heap blocks always go last,
  /// which is what keeps the heap portion of the list in ascending address
  /// order: `grow_heap` only ever extends past the current break.
  ///
  /// # Safety
  /// `block` must not already be linked into the list.
  pub(crate) unsafe fn insert_heap(&mut self, block: *mut Header) {
    unsafe {
      (*block).next = ptr::null_mut();

      if self.head.is_null() {
        (*block).prev = ptr::null_mut();
        self.head = block;
        return;
      }

      let tail = self.last();
      (*tail).next = block;
      (*block).prev = tail;
    }
  }

  /// Inserts `block` at the front of the mapped prefix (or at the very
  /// head of the list if there is no mapped prefix yet), preserving
  /// invariant 3. Mapped blocks have no meaningful order relative to each
  /// other, so inserting at the front is always correct.
  ///
  /// # Safety
  /// `block` must not already be linked into the list.
  pub(crate) unsafe fn insert_mapped(&mut self, block: *mut Header) {
    unsafe {
      (*block).prev = ptr::null_mut();

      let old_head = self.head;
      (*block).next = old_head;
      if !old_head.is_null() {
        (*old_head).prev = block;
      }
      self.head = block;
    }
  }

  /// Unlinks `block` from the list, fixing up the head pointer and the
  /// neighbours' `prev`/`next` fields. `block`'s own links are cleared.
  ///
  /// # Safety
  /// `block` must currently be linked into this list.
  pub(crate) unsafe fn extract(&mut self, block: *mut Header) {
    unsafe {
      let prev = (*block).prev;
      let next = (*block).next;

      if prev.is_null() {
        self.head = next;
      } else {
        (*prev).next = next;
      }

      if !next.is_null() {
        (*next).prev = prev;
      }

      (*block).prev = ptr::null_mut();
      (*block).next = ptr::null_mut();
    }
  }

  /// The last block in the list, mapped or heap, or null if the list is
  /// empty.
  pub(crate) fn last(&self) -> *mut Header {
    unsafe {
      let mut current = self.head;
      if current.is_null() {
        return ptr::null_mut();
      }
      while !(*current).next.is_null() {
        current = (*current).next;
      }
      current
    }
  }

  /// The last heap block (the tail of the heap portion of the list), or
  /// null if there are no heap blocks yet.
  pub(crate) fn last_heap(&self) -> *mut Header {
    unsafe {
      let mut current = self.head;
      let mut result = ptr::null_mut();
      while !current.is_null() {
        if (*current).status != Status::Mapped {
          result = current;
        }
        current = (*current).next;
      }
      result
    }
  }

  /// The first heap block (the first entry past the mapped prefix), or
  /// null if there are no heap blocks yet.
  #[cfg_attr(not(test), allow(dead_code))]
  pub(crate) fn first_heap(&self) -> *mut Header {
    unsafe {
      let mut current = self.head;
      while !current.is_null() {
        if (*current).status != Status::Mapped {
          return current;
        }
        current = (*current).next;
      }
      ptr::null_mut()
    }
  }

  /// A snapshot of every block currently in the list, head to tail, as
  /// `(status, payload size)` pairs. Mirrors the teacher's `print_alloc`
  /// debug helper, structured instead of printed, so callers and tests can
  /// assert on it directly.
  pub fn snapshot(&self) -> Vec<(Status, usize)> {
    unsafe {
      let mut result = Vec::new();
      let mut current = self.head;
      while !current.is_null() {
        result.push(((*current).status, (*current).size));
        current = (*current).next;
      }
      result
    }
  }

  /// The last block of the mapped prefix, or null if there is none.
  #[cfg_attr(not(test), allow(dead_code))]
  pub(crate) fn last_mapped(&self) -> *mut Header {
    unsafe {
      let mut current = self.head;
      let mut result = ptr::null_mut();
      while !current.is_null() && (*current).status == Status::Mapped {
        result = current;
        current = (*current).next;
      }
      result
    }
  }

  /// Merges `block.next` into `block` if `next` exists and is FREE.
  /// Does not require `block` itself to be FREE — `realloc` uses this to
  /// grow a live block in place.
  ///
  /// # Safety
  /// `block` must point to a valid, currently linked `Header`.
  pub(crate) unsafe fn coalesce_forward(&mut self, block: *mut Header) {
    unsafe {
      let next = (*block).next;
      if next.is_null() || (*next).status != Status::Free {
        return;
      }

      let merged_size = align_up((*block).size) + footprint(next);
      self.extract(next);
      (*block).size = merged_size;
    }
  }

  /// Merges `block` into `block.prev` if `prev` exists and is FREE.
  /// `block` must itself be FREE (this is only ever called from `free`,
  /// right after the block being freed was marked FREE).
  ///
  /// # Safety
  /// `block` must point to a valid, currently linked `Header`.
  pub(crate) unsafe fn coalesce_backward(&mut self, block: *mut Header) {
    unsafe {
      let prev = (*block).prev;
      if prev.is_null() || (*prev).status != Status::Free {
        return;
      }

      let merged_size = align_up((*prev).size) + footprint(block);
      self.extract(block);
      (*prev).size = merged_size;
    }
  }

  /// Splits `block` so that it holds exactly `new_payload` bytes, inserting
  /// a new trailing FREE block for whatever remains.
  ///
  /// # Safety
  /// `block.status` must be `Free` and
  /// `align_up(block.size) >= align_up(new_payload) + MIN_SPLIT_REMAINDER`
  /// — callers must check `MIN_SPLIT_REMAINDER` themselves before calling.
  pub(crate) unsafe fn split(&mut self, block: *mut Header, new_payload: usize) {
    use crate::block::HEADER_SIZE;

    unsafe {
      debug_assert_eq!((*block).status, Status::Free);

      let old_footprint = HEADER_SIZE + align_up((*block).size);
      let new_chunk_footprint = HEADER_SIZE + align_up(new_payload);
      debug_assert!(old_footprint >= new_chunk_footprint);

      let free_block = (block as *mut u8).add(new_chunk_footprint) as *mut Header;
      (*free_block).size = old_footprint - new_chunk_footprint - HEADER_SIZE;
      (*free_block).status = Status::Free;

      let next = (*block).next;
      (*free_block).next = next;
      (*free_block).prev = block;
      if !next.is_null() {
        (*next).prev = free_block;
      }
      (*block).next = free_block;

      (*block).size = new_payload;
      (*block).status = Status::HeapAlloc;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::HEADER_SIZE;
  use std::alloc::{alloc, dealloc, Layout};

  unsafe fn make_block(size: usize, status: Status) -> *mut Header {
    unsafe {
      let layout = Layout::from_size_align(HEADER_SIZE + size, 8).unwrap();
      let raw = alloc(layout) as *mut Header;
      (*raw).size = size;
      (*raw).status = status;
      (*raw).prev = ptr::null_mut();
      (*raw).next = ptr::null_mut();
      raw
    }
  }

  unsafe fn free_block(block: *mut Header, size: usize) {
    unsafe {
      let layout = Layout::from_size_align(HEADER_SIZE + size, 8).unwrap();
      dealloc(block as *mut u8, layout);
    }
  }

  #[test]
  fn insert_heap_appends_in_order() {
    unsafe {
      let mut allocator = Allocator::new();
      let a = make_block(16, Status::HeapAlloc);
      let b = make_block(32, Status::HeapAlloc);

      allocator.insert_heap(a);
      allocator.insert_heap(b);

      assert_eq!(allocator.head, a);
      assert_eq!((*a).next, b);
      assert_eq!((*b).prev, a);
      assert_eq!(allocator.last(), b);

      free_block(a, 16);
      free_block(b, 32);
    }
  }

  #[test]
  fn insert_mapped_goes_before_heap_blocks() {
    unsafe {
      let mut allocator = Allocator::new();
      let heap_block = make_block(16, Status::HeapAlloc);
      allocator.insert_heap(heap_block);

      let mapped = make_block(4096, Status::Mapped);
      allocator.insert_mapped(mapped);

      assert_eq!(allocator.head, mapped);
      assert_eq!((*mapped).next, heap_block);
      assert_eq!((*heap_block).prev, mapped);
      assert_eq!(allocator.first_heap(), heap_block);
      assert_eq!(allocator.last_mapped(), mapped);

      free_block(heap_block, 16);
      free_block(mapped, 4096);
    }
  }

  #[test]
  fn extract_middle_block_relinks_neighbours() {
    unsafe {
      let mut allocator = Allocator::new();
      let a = make_block(16, Status::HeapAlloc);
      let b = make_block(16, Status::Free);
      let c = make_block(16, Status::HeapAlloc);
      allocator.insert_heap(a);
      allocator.insert_heap(b);
      allocator.insert_heap(c);

      allocator.extract(b);

      assert_eq!((*a).next, c);
      assert_eq!((*c).prev, a);
      assert!((*b).prev.is_null());
      assert!((*b).next.is_null());

      free_block(a, 16);
      free_block(b, 16);
      free_block(c, 16);
    }
  }

  #[test]
  fn extract_only_block_empties_head() {
    unsafe {
      let mut allocator = Allocator::new();
      let a = make_block(16, Status::HeapAlloc);
      allocator.insert_heap(a);

      allocator.extract(a);

      assert!(allocator.head.is_null());
      free_block(a, 16);
    }
  }

  #[test]
  fn coalesce_forward_merges_free_neighbour() {
    unsafe {
      let mut allocator = Allocator::new();
      let a = make_block(16, Status::Free);
      let b = make_block(16, Status::Free);
      allocator.insert_heap(a);
      allocator.insert_heap(b);

      allocator.coalesce_forward(a);

      assert_eq!((*a).size, align_up(16) + footprint(b));
      assert!((*a).next.is_null());

      free_block(a, 16);
      free_block(b, 16);
    }
  }

  #[test]
  fn split_creates_correctly_sized_remainder() {
    unsafe {
      let mut allocator = Allocator::new();
      let block = make_block(256, Status::Free);
      allocator.insert_heap(block);

      allocator.split(block, 32);

      assert_eq!((*block).size, 32);
      assert_eq!((*block).status, Status::HeapAlloc);

      let remainder = (*block).next;
      assert!(!remainder.is_null());
      assert_eq!((*remainder).status, Status::Free);
      let old_footprint = HEADER_SIZE + align_up(256);
      let new_chunk_footprint = HEADER_SIZE + align_up(32);
      assert_eq!((*remainder).size, old_footprint - new_chunk_footprint - HEADER_SIZE);
      assert_eq!((*remainder).size, 192);

      free_block(block, 256);
    }
  }
}
