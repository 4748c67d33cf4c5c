//! Physical address type for firmware table walking.
//!
//! ACPI tables store physical addresses in a mix of widths: the RSDP and RSDT
//! carry 32-bit pointers while Generic Address Structures and UEFI page
//! allocations use 64-bit ones. [`PhysAddr`] normalises all of them to one
//! zero-cost newtype (`#[repr(transparent)]` over `u64`) so that a table
//! offset can never be confused with an address.
//!
//! # Example
//!
//! ```ignore
//! use hestfix_abi::addr::PhysAddr;
//!
//! let rsdt = PhysAddr::from_u32(0x7FE1_4000);
//! let first_entry = rsdt.offset(36);
//! ```

/// A physical memory address.
///
/// Physical addresses cannot be dereferenced directly; every access goes
/// through a physical memory capability that decides how the address is
/// reached (identity mapping under UEFI, a synthetic buffer in tests).
///
/// On x86_64 and aarch64, physical addresses are up to 52 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Maximum valid physical address (52-bit physical address space).
    pub const MAX: Self = Self((1 << 52) - 1);

    /// Create a new physical address from a raw u64 value.
    ///
    /// # Panics
    ///
    /// Panics if the address exceeds the 52-bit physical address limit.
    #[inline]
    pub fn new(addr: u64) -> Self {
        assert!(addr <= Self::MAX.0, "PhysAddr out of range: 0x{:x}", addr);
        Self(addr)
    }

    /// Create a new physical address if it is in range.
    #[inline]
    pub const fn try_new(addr: u64) -> Option<Self> {
        if addr <= Self::MAX.0 {
            Some(Self(addr))
        } else {
            None
        }
    }

    /// Widen a 32-bit table pointer (RSDP `RsdtAddress`, RSDT entries).
    ///
    /// Always in range, so this never fails.
    #[inline]
    pub const fn from_u32(addr: u32) -> Self {
        Self(addr as u64)
    }

    /// Returns the raw u64 value of this address.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Add an offset to this address (wrapping on overflow).
    #[inline]
    pub const fn offset(self, off: u64) -> Self {
        Self(self.0.wrapping_add(off))
    }
}

impl core::fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    #[test]
    fn test_from_u32_widens() {
        let addr = PhysAddr::from_u32(0xFFFF_F000);
        assert_eq!(addr.as_u64(), 0xFFFF_F000);
        assert_eq!(PhysAddr::from_u32(u32::MAX).offset(1).as_u64(), 1 << 32);
    }

    #[test]
    fn test_try_new_rejects_out_of_range() {
        assert_eq!(PhysAddr::try_new(0x1000), Some(PhysAddr(0x1000)));
        assert_eq!(PhysAddr::try_new(PhysAddr::MAX.as_u64()), Some(PhysAddr::MAX));
        assert_eq!(PhysAddr::try_new(1 << 52), None);
    }

    #[test]
    fn test_offset_and_display() {
        let base = PhysAddr::new(0x7FE5_0000);
        assert_eq!(base.offset(36), PhysAddr(0x7FE5_0024));
        assert_eq!(format!("{}", base.offset(40)), "0x7fe50028");
    }
}
