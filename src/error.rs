//! Typed internal errors for the two OS memory primitives.
//!
//! Nothing in this enum ever reaches a public entry point: callers can only
//! ever observe `null` (degenerate/illegal input) or process termination
//! (resource exhaustion). This type exists so the abort path has something
//! structured to log before it calls [`std::process::abort`].

use std::fmt;

/// A primitive failed. Always fatal — see [`crate::os::abort_on_os_failure`].
#[derive(Debug, thiserror::Error)]
pub enum OsError {
  /// `sbrk`/`brk` returned its failure sentinel while growing the heap.
  #[error("failed to extend the heap by {requested} bytes")]
  GrowHeap { requested: usize },

  /// `mmap` returned `MAP_FAILED`.
  #[error("failed to map {requested} bytes")]
  MapPages { requested: usize },

  /// `munmap` returned non-zero.
  #[error("failed to unmap {len} bytes at {addr}")]
  Unmap { addr: Addr, len: usize },
}

/// A bare pointer value, wrapped only so it can appear in an error without
/// pulling `*mut u8` (not `Send`/`Sync`, and not very informative in a
/// `Display` impl on its own) into the public error surface.
#[derive(Debug, Clone, Copy)]
pub struct Addr(pub usize);

impl fmt::Display for Addr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:#x}", self.0)
  }
}
