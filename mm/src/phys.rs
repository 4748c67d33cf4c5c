//! Physical memory access capability.
//!
//! Every dereference of a physical address found in a firmware table goes
//! through [`PhysMemory`]. Nothing behind this trait validates addresses
//! against a memory map: RSDT entries and GAS addresses are trusted because
//! firmware built them. Making the capability explicit keeps that trust in
//! one place (constructing [`IdentityMapped`] is `unsafe`) and lets the table
//! walkers run against synthetic memory in tests.
//!
//! Accessors take `&self`: the capability behaves like a bus, not like an
//! owned buffer, and the patcher writes through the same handle the finder
//! reads through.

use core::mem::{MaybeUninit, size_of};
use core::ptr;

use hestfix_abi::addr::PhysAddr;

/// Byte-addressed access to physical memory.
///
/// Multi-byte accessors are little-endian and tolerate any alignment, which
/// matches the packed layout of ACPI tables.
pub trait PhysMemory {
    /// Fill `buf` with the bytes starting at `addr`.
    fn read_bytes(&self, addr: PhysAddr, buf: &mut [u8]);

    /// Store `data` starting at `addr`.
    fn write_bytes(&self, addr: PhysAddr, data: &[u8]);

    #[inline]
    fn read_u8(&self, addr: PhysAddr) -> u8 {
        let mut buf = [0u8; 1];
        self.read_bytes(addr, &mut buf);
        buf[0]
    }

    #[inline]
    fn read_u16(&self, addr: PhysAddr) -> u16 {
        let mut buf = [0u8; 2];
        self.read_bytes(addr, &mut buf);
        u16::from_le_bytes(buf)
    }

    #[inline]
    fn read_u32(&self, addr: PhysAddr) -> u32 {
        let mut buf = [0u8; 4];
        self.read_bytes(addr, &mut buf);
        u32::from_le_bytes(buf)
    }

    #[inline]
    fn read_u64(&self, addr: PhysAddr) -> u64 {
        let mut buf = [0u8; 8];
        self.read_bytes(addr, &mut buf);
        u64::from_le_bytes(buf)
    }

    #[inline]
    fn write_u64(&self, addr: PhysAddr, value: u64) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    /// Copy a packed on-disk structure out of physical memory.
    ///
    /// # Safety
    ///
    /// `T` must be plain old data: `#[repr(C, packed)]` (or otherwise
    /// padding-free) with every bit pattern valid for every field.
    #[inline]
    unsafe fn read_struct<T: Copy>(&self, addr: PhysAddr) -> T {
        let mut value = MaybeUninit::<T>::zeroed();
        // SAFETY: the zeroed storage is initialised as bytes and spans
        // exactly `size_of::<T>()` of them.
        let bytes = unsafe {
            core::slice::from_raw_parts_mut(value.as_mut_ptr() as *mut u8, size_of::<T>())
        };
        self.read_bytes(addr, bytes);
        // SAFETY: caller guarantees any bit pattern is a valid `T`.
        unsafe { value.assume_init() }
    }
}

impl<M: PhysMemory + ?Sized> PhysMemory for &M {
    #[inline]
    fn read_bytes(&self, addr: PhysAddr, buf: &mut [u8]) {
        (**self).read_bytes(addr, buf)
    }

    #[inline]
    fn write_bytes(&self, addr: PhysAddr, data: &[u8]) {
        (**self).write_bytes(addr, data)
    }
}

/// Physical memory reached through the firmware's identity mapping.
///
/// UEFI runs boot-services code with physical == virtual for all of system
/// memory, so a physical address is usable as a pointer as-is.
#[derive(Debug)]
pub struct IdentityMapped {
    _private: (),
}

impl IdentityMapped {
    /// # Safety
    ///
    /// The caller must guarantee that physical memory is identity mapped
    /// for the lifetime of the handle (UEFI boot services are active) and
    /// that every address later passed to it refers to memory that may be
    /// read or written. No bounds checking is performed.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PhysMemory for IdentityMapped {
    #[inline]
    fn read_bytes(&self, addr: PhysAddr, buf: &mut [u8]) {
        let src = addr.as_u64() as usize as *const u8;
        // SAFETY: `IdentityMapped::new` made the caller vouch for every
        // address handed to this capability.
        unsafe { ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), buf.len()) };
    }

    #[inline]
    fn write_bytes(&self, addr: PhysAddr, data: &[u8]) {
        let dst = addr.as_u64() as usize as *mut u8;
        // SAFETY: as above; firmware tables live in writable memory while
        // boot services are running.
        unsafe { ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len()) };
    }
}
