//! Test-only helpers shared across unit test modules.
//!
//! All allocator tests touch the real process break via `sbrk`, so they
//! cannot run concurrently with each other — the standard library's test
//! harness runs tests in parallel by default, and two tests interleaving
//! `sbrk` calls would corrupt each other's view of the heap. Every test
//! that builds an `Allocator` and drives it through `allocate`/`free`/
//! `reallocate` takes this lock for its duration.

use std::sync::Mutex;

pub static TEST_LOCK: Mutex<()> = Mutex::new(());
