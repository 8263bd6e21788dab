//! Uniform wrapper over the two OS memory primitives the allocator builds on:
//! program-break extension (`sbrk`) and anonymous page mapping (`mmap`).
//!
//! Every failure a primitive can report is normalized into an [`OsError`] and
//! handed back as a `Result`; nothing here aborts on its own. The decision to
//! treat a given failure as fatal belongs to the call site
//! ([`abort_on_os_failure`]), because only the call site knows whether the
//! list is already in a state that would make recovery unsafe.

use std::ptr;
use std::sync::OnceLock;

use libc::{c_void, intptr_t};

use crate::error::{Addr, OsError};

/// Extends the program break by `n` bytes and returns the address of the
/// *previous* break — i.e. the base of the freshly extended region.
///
/// # Safety
/// Must not be called concurrently with another extension of the same
/// process break — this allocator assumes a single logical mutator.
pub unsafe fn grow_heap(n: usize) -> Result<*mut u8, OsError> {
  unsafe {
    let prev = libc::sbrk(n as intptr_t);
    if prev as usize == usize::MAX {
      log::error!("sbrk failed while growing the heap by {n} bytes");
      return Err(OsError::GrowHeap { requested: n });
    }
    log::trace!("grew heap by {n} bytes at {:p}", prev);
    Ok(prev as *mut u8)
  }
}

/// Returns the current program break without moving it.
pub fn current_break() -> *mut u8 {
  unsafe { libc::sbrk(0) as *mut u8 }
}

/// Maps a fresh anonymous, private region of `n` bytes.
///
/// # Safety
/// `n` must already be rounded up the way the rest of the crate rounds
/// footprints; this function performs no rounding of its own.
pub unsafe fn map_pages(n: usize) -> Result<*mut u8, OsError> {
  unsafe {
    let p = libc::mmap(
      ptr::null_mut(),
      n,
      libc::PROT_READ | libc::PROT_WRITE,
      libc::MAP_ANONYMOUS | libc::MAP_PRIVATE,
      -1,
      0,
    );
    if p == libc::MAP_FAILED {
      log::error!("mmap failed for {n} bytes");
      return Err(OsError::MapPages { requested: n });
    }
    log::trace!("mapped {n} bytes at {:p}", p);
    Ok(p as *mut u8)
  }
}

/// Unmaps a region previously returned by [`map_pages`].
///
/// # Safety
/// `addr`/`len` must exactly describe a live mapping created by
/// [`map_pages`]; partial unmaps are not supported by this allocator.
pub unsafe fn unmap(addr: *mut u8, len: usize) -> Result<(), OsError> {
  unsafe {
    if libc::munmap(addr as *mut c_void, len) != 0 {
      log::error!("munmap failed for {len} bytes at {addr:p}");
      return Err(OsError::Unmap { addr: Addr(addr as usize), len });
    }
    log::trace!("unmapped {len} bytes at {:p}", addr);
    Ok(())
  }
}

static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

/// The OS page size, queried once via `sysconf` and cached for the life of
/// the process.
pub fn page_size() -> usize {
  *PAGE_SIZE.get_or_init(|| unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize })
}

/// Logs `err` and terminates the process.
///
/// OS primitive failure is always fatal here: the block list may already be
/// partway through a mutation that assumed the primitive would succeed, so
/// there is no safe way to unwind and return an error to the caller instead.
pub fn abort_on_os_failure(err: OsError) -> ! {
  log::error!("fatal allocator error, aborting process: {err}");
  eprintln!("rallocator: fatal: {err}");
  std::process::abort()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_size_is_a_sane_power_of_two() {
    let size = page_size();
    assert!(size >= 4096);
    assert_eq!(size & (size - 1), 0);
  }

  #[test]
  fn page_size_is_cached() {
    assert_eq!(page_size(), page_size());
  }
}
