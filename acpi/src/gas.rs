//! ACPI Generic Address Structure (GAS).
//!
//! Describes a register or buffer location in one of several address spaces
//! (ACPI 6.x §5.2.3.2). HEST uses it for the Error Status Address of every
//! generic hardware error source.

use core::mem::{self, offset_of};

use hestfix_abi::addr::PhysAddr;
use hestfix_mm::PhysMemory;

/// Raw GAS layout, 12 bytes.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct AcpiGas {
    pub address_space_id: u8,
    pub register_bit_width: u8,
    pub register_bit_offset: u8,
    pub access_size: u8,
    pub address: u64,
}

const _: () = assert!(mem::size_of::<AcpiGas>() == 12);

/// Byte offset of the 64-bit `address` field inside a GAS.
pub const GAS_ADDRESS_OFFSET: u64 = offset_of!(AcpiGas, address) as u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressSpace {
    SystemMemory,
    SystemIo,
    PciConfig,
    EmbeddedController,
    SmBus,
    SystemCmos,
    PciBarTarget,
    Ipmi,
    GeneralPurposeIo,
    GenericSerialBus,
    PlatformCommChannel,
    FunctionalFixedHardware,
    /// Reserved (0x0B..=0x7E) or OEM defined (0x80..=0xFF).
    Other(u8),
}

impl AddressSpace {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x00 => AddressSpace::SystemMemory,
            0x01 => AddressSpace::SystemIo,
            0x02 => AddressSpace::PciConfig,
            0x03 => AddressSpace::EmbeddedController,
            0x04 => AddressSpace::SmBus,
            0x05 => AddressSpace::SystemCmos,
            0x06 => AddressSpace::PciBarTarget,
            0x07 => AddressSpace::Ipmi,
            0x08 => AddressSpace::GeneralPurposeIo,
            0x09 => AddressSpace::GenericSerialBus,
            0x0A => AddressSpace::PlatformCommChannel,
            0x7F => AddressSpace::FunctionalFixedHardware,
            other => AddressSpace::Other(other),
        }
    }
}

impl AcpiGas {
    pub fn read<M: PhysMemory + ?Sized>(mem: &M, addr: PhysAddr) -> Self {
        // SAFETY: `AcpiGas` is packed and made only of integers.
        unsafe { mem.read_struct(addr) }
    }

    #[inline]
    pub fn space(&self) -> AddressSpace {
        AddressSpace::from_raw(self.address_space_id)
    }

    /// System-memory descriptor whose address was left at the zero sentinel.
    #[inline]
    pub fn is_unassigned_memory(&self) -> bool {
        let address = self.address;
        self.space() == AddressSpace::SystemMemory && address == 0
    }
}
