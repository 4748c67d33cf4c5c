//! Memory classes and allocation errors shared by the allocator seam.

use core::fmt;

/// Firmware memory type attached to a page allocation.
///
/// Mirrors the subset of `EFI_MEMORY_TYPE` that table fixups hand to the
/// platform. The OS must never reclaim [`MemoryClass::AcpiNvs`] pages, which
/// makes it the right class for buffers that firmware error handlers keep
/// writing to after boot.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryClass {
    /// `EfiACPIMemoryNVS`: reserved for firmware, preserved across sleep states.
    AcpiNvs,
    /// `EfiACPIReclaimMemory`: may be reclaimed once the OS has parsed ACPI.
    AcpiReclaimable,
    /// `EfiReservedMemoryType`: never usable by the OS.
    Reserved,
}

impl MemoryClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryClass::AcpiNvs => "acpi-nvs",
            MemoryClass::AcpiReclaimable => "acpi-reclaim",
            MemoryClass::Reserved => "reserved",
        }
    }
}

impl fmt::Display for MemoryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a page allocation can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// `EFI_OUT_OF_RESOURCES`: no free range of the requested size.
    OutOfResources,
    /// `EFI_INVALID_PARAMETER`: bad allocation type, memory type or size.
    InvalidParameter,
    /// `EFI_NOT_FOUND`: the requested range could not be found.
    NotFound,
    /// The firmware returned an address outside the physical address space.
    AddressOutOfRange,
    /// Any other firmware status, kept raw for the log.
    Firmware(usize),
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::OutOfResources => f.write_str("out of resources"),
            AllocError::InvalidParameter => f.write_str("invalid parameter"),
            AllocError::NotFound => f.write_str("not found"),
            AllocError::AddressOutOfRange => f.write_str("address out of range"),
            AllocError::Firmware(status) => write!(f, "firmware status {:#x}", status),
        }
    }
}
