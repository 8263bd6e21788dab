use std::io::Read;

use libc::sbrk;
use rallocator::Allocator;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how allocations change the program
/// break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via brk/sbrk.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() {
  env_logger::init();

  let mut allocator = Allocator::new();

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) A small request triggers the one-shot heap preallocation.
    // --------------------------------------------------------------------
    println!("\n[1] Allocate 32 bytes");
    let a = allocator.allocate(32);
    println!("[1] a = {:?}, preallocated = {}", a, allocator.has_preallocated());
    print_program_break("after first allocate");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Freeing and re-allocating the same size reuses the block.
    // --------------------------------------------------------------------
    println!("\n[2] Free a, then allocate 32 bytes again");
    allocator.free(a);
    let b = allocator.allocate(32);
    println!("[2] b = {:?} (expect == a = {:?})", b, a);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Zeroed allocation.
    // --------------------------------------------------------------------
    println!("\n[3] zeroed_allocate(8, 8) — 64 zeroed bytes");
    let z = allocator.zeroed_allocate(8, 8);
    println!("[3] z = {:?}", z);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Growing an allocation past its current capacity relocates it.
    // --------------------------------------------------------------------
    println!("\n[4] Grow b from 32 to 4096 bytes");
    let grown = allocator.reallocate(b, 4096);
    println!("[4] grown = {:?}", grown);
    print_program_break("after grow");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) A request above the mmap threshold bypasses the heap entirely.
    // --------------------------------------------------------------------
    println!("\n[5] Allocate 256 KiB (above the mmap threshold)");
    let big = allocator.allocate(256 * 1024);
    println!("[5] big = {:?}", big);
    print_program_break("after large allocate (unchanged: mapped separately)");
    block_until_enter_pressed();

    println!("\n[6] Cleaning up");
    allocator.free(z);
    allocator.free(grown);
    allocator.free(big);
    print_program_break("end");
  }
}
