//! Page allocation seam.
//!
//! Firmware owns the physical memory map while boot services run; this crate
//! never carves memory itself. Callers hand in a [`FrameAllocator`] backed by
//! `AllocatePages` (or a scripted fake under test) and the allocator returns
//! page-aligned physical addresses whose lifetime is the platform's concern:
//! nothing here frees them.

use hestfix_abi::addr::PhysAddr;
use hestfix_abi::{AllocError, MemoryClass, PAGE_SIZE};
use hestfix_lib::align_up_u64;

/// Convert a byte count to a page count, rounding up (`EFI_SIZE_TO_PAGES`).
#[inline]
pub const fn size_to_pages(bytes: u64) -> usize {
    (align_up_u64(bytes, PAGE_SIZE) / PAGE_SIZE) as usize
}

/// Allocates whole pages anywhere in the physical address space.
pub trait FrameAllocator {
    /// Allocate `pages` contiguous pages of memory tagged `class`.
    ///
    /// Each call is attempted exactly once; callers decide what a failure
    /// means for them.
    fn allocate_pages(&mut self, pages: usize, class: MemoryClass) -> Result<PhysAddr, AllocError>;
}

impl<A: FrameAllocator + ?Sized> FrameAllocator for &mut A {
    #[inline]
    fn allocate_pages(&mut self, pages: usize, class: MemoryClass) -> Result<PhysAddr, AllocError> {
        (**self).allocate_pages(pages, class)
    }
}
