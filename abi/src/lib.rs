//! Shared types for the hestfix firmware patcher.
//!
//! This crate provides the canonical definitions used across the workspace:
//! physical address newtypes, memory classes for page allocations and the
//! allocation error type handed back by firmware allocators. Nothing here
//! touches memory, so the crate stays free of `unsafe`.

#![no_std]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod addr;
pub mod memory;

/// UEFI page granularity (`EFI_PAGE_SIZE`).
pub const PAGE_SIZE: u64 = 0x1000;

pub use addr::*;
pub use memory::{AllocError, MemoryClass};
