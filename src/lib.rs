//! # rallocator - A Custom Memory Allocator Library
//!
//! This crate provides a general-purpose heap allocator implementation in
//! Rust that manages memory with a mix of `sbrk` and `mmap`, the same two
//! primitives a libc allocator is built on.
//!
//! ## Overview
//!
//! Small and medium requests are served from a single growable heap region;
//! large requests get their own anonymous mapping instead:
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY (sbrk)                           │
//!   │                                                                      │
//!   │   ┌─────┬──────┬─────┬───────────┬───────────────────────────────┐   │
//!   │   │ A1  │ free │ A3  │   free    │         unreserved            │   │
//!   │   └─────┴──────┴─────┴───────────┴───────────────────────────────┘   │
//!   │                                                               ▲      │
//!   │                                                          Program    │
//!   │                                                            Break    │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!          ┌──────────────┐   ┌──────────────┐
//!          │  mmap region │   │  mmap region │   large requests, one mapping
//!          └──────────────┘   └──────────────┘   per block, unmapped on free
//! ```
//!
//! Freed heap blocks are kept in an intrusive list and reused by a best-fit
//! search before the program break is ever extended; freed mapped blocks are
//! handed straight back to the kernel.
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── align       - Alignment arithmetic
//!   ├── block       - Block header layout and constants (internal)
//!   ├── allocator   - Allocator struct and constructor
//!   ├── list        - Intrusive doubly linked block list (internal)
//!   ├── placement   - Best-fit search and heap preallocation (internal)
//!   ├── policy      - allocate / free / zeroed_allocate
//!   ├── realloc     - reallocate's seven-case state machine
//!   ├── os          - sbrk / mmap / munmap / page size (internal)
//!   └── error       - OsError, for internal diagnostics only
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rallocator::Allocator;
//!
//! fn main() {
//!     let mut allocator = Allocator::new();
//!
//!     unsafe {
//!         let ptr = allocator.allocate(64) as *mut u64;
//!         *ptr = 42;
//!         println!("Value: {}", *ptr);
//!
//!         let ptr = allocator.reallocate(ptr as *mut u8, 128);
//!         allocator.free(ptr);
//!     }
//! }
//! ```
//!
//! ## Features
//!
//! - **Best-fit reuse**: freed heap blocks are tried before the break moves.
//! - **Coalescing**: adjacent free heap blocks merge on every `free`.
//! - **Large-block mmap path**: requests above 128 KiB bypass the heap
//!   entirely and get their own mapping, unmapped on free.
//! - **Direct OS interaction**: uses `sbrk`/`mmap`/`munmap` via `libc`.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: `Allocator` is neither `Send` nor `Sync`; no
//!   synchronization primitives are provided.
//! - **Unix-only**: requires `libc`'s `sbrk`, `mmap` and `sysconf`.
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! All four entry points require `unsafe` blocks and rely on the caller
//! upholding the single-mutator, valid-pointer contracts documented on each
//! method.

mod align;
mod allocator;
mod block;
mod error;
mod list;
mod os;
mod placement;
mod policy;
mod realloc;

#[cfg(test)]
mod test_support;

pub use allocator::Allocator;
pub use block::{Status, HEADER_SIZE, PREALLOC_SIZE};
pub use error::OsError;
