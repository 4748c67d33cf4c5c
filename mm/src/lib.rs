//! Physical memory seams for firmware-time table patching.
//!
//! Two capabilities cross this crate boundary:
//!
//! - [`phys::PhysMemory`]: reads and writes at physical addresses. This is
//!   the trust boundary for every pointer found inside ACPI tables. Under
//!   UEFI boot services memory is identity mapped, so
//!   [`phys::IdentityMapped`] turns addresses straight into pointers.
//! - [`frame_alloc::FrameAllocator`]: page-granular allocations tagged with a
//!   [`MemoryClass`](hestfix_abi::MemoryClass).
//!
//! The `testing` feature adds synthetic implementations of both so table
//! logic can run against in-memory buffers on the host.

#![no_std]

#[cfg(any(test, feature = "testing"))]
extern crate alloc;

pub mod frame_alloc;
pub mod phys;
#[cfg(any(test, feature = "testing"))]
pub mod test_fixtures;

pub use frame_alloc::{FrameAllocator, size_to_pages};
pub use phys::{IdentityMapped, PhysMemory};
