//! Boot services seen through the capability traits of the core crates.
//!
//! [`UefiServices`] wraps the system table the image was entered with and
//! hands out two views: [`ConfigTables`] implements [`ConfigRegistry`] with a
//! configuration table scan, [`PageAllocator`] implements [`FrameAllocator`]
//! with `AllocatePages`. Nothing here is used after `ExitBootServices`; the
//! application never calls it.

use core::ptr::NonNull;
use core::slice;

use r_efi::efi;

use hestfix_abi::addr::PhysAddr;
use hestfix_abi::{AllocError, MemoryClass};
use hestfix_acpi::tables::{ConfigRegistry, RootPointerKind};
use hestfix_lib::klog_trace;
use hestfix_mm::FrameAllocator;

/// `EFI_ACPI_20_TABLE_GUID`
pub const ACPI_20_TABLE_GUID: efi::Guid = efi::Guid::from_fields(
    0x8868e871,
    0xe4f1,
    0x11d3,
    0xbc,
    0x22,
    &[0x00, 0x80, 0xc7, 0x3c, 0x88, 0x81],
);

/// `EFI_ACPI_TABLE_GUID` (ACPI 1.0)
pub const ACPI_TABLE_GUID: efi::Guid = efi::Guid::from_fields(
    0xeb9d2d30,
    0x2d88,
    0x11d3,
    0x9a,
    0x16,
    &[0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d],
);

pub fn root_pointer_guid(kind: RootPointerKind) -> &'static efi::Guid {
    match kind {
        RootPointerKind::Current => &ACPI_20_TABLE_GUID,
        RootPointerKind::Legacy => &ACPI_TABLE_GUID,
    }
}

/// First `vendor_table` published under `guid`.
pub fn find_configuration_table(
    tables: &[efi::ConfigurationTable],
    guid: &efi::Guid,
) -> Option<PhysAddr> {
    tables
        .iter()
        .find(|entry| entry.vendor_guid.as_bytes() == guid.as_bytes())
        .filter(|entry| !entry.vendor_table.is_null())
        .and_then(|entry| PhysAddr::try_new(entry.vendor_table as u64))
}

pub fn efi_memory_type(class: MemoryClass) -> efi::MemoryType {
    match class {
        MemoryClass::AcpiNvs => efi::ACPI_MEMORY_NVS,
        MemoryClass::AcpiReclaimable => efi::ACPI_RECLAIM_MEMORY,
        MemoryClass::Reserved => efi::RESERVED_MEMORY_TYPE,
    }
}

pub fn alloc_error_from_status(status: efi::Status) -> AllocError {
    if status == efi::Status::OUT_OF_RESOURCES {
        AllocError::OutOfResources
    } else if status == efi::Status::INVALID_PARAMETER {
        AllocError::InvalidParameter
    } else if status == efi::Status::NOT_FOUND {
        AllocError::NotFound
    } else {
        AllocError::Firmware(status.as_usize())
    }
}

/// Configuration tables published in the system table.
#[derive(Clone, Copy)]
pub struct ConfigTables<'a> {
    entries: &'a [efi::ConfigurationTable],
}

impl<'a> ConfigTables<'a> {
    pub fn new(entries: &'a [efi::ConfigurationTable]) -> Self {
        Self { entries }
    }
}

impl ConfigRegistry for ConfigTables<'_> {
    fn lookup(&self, kind: RootPointerKind) -> Option<PhysAddr> {
        let found = find_configuration_table(self.entries, root_pointer_guid(kind));
        klog_trace!(
            "EFI: {} RSDP {}",
            kind.as_str(),
            if found.is_some() { "published" } else { "absent" }
        );
        found
    }
}

/// `AllocatePages(AllocateAnyPages, ..)` through boot services.
pub struct PageAllocator<'a> {
    bs: &'a efi::BootServices,
}

impl FrameAllocator for PageAllocator<'_> {
    fn allocate_pages(&mut self, pages: usize, class: MemoryClass) -> Result<PhysAddr, AllocError> {
        let mut memory: efi::PhysicalAddress = 0;
        let status = (self.bs.allocate_pages)(
            efi::ALLOCATE_ANY_PAGES,
            efi_memory_type(class),
            pages,
            &mut memory,
        );
        if status.is_error() {
            return Err(alloc_error_from_status(status));
        }
        PhysAddr::try_new(memory).ok_or(AllocError::AddressOutOfRange)
    }
}

pub struct UefiServices {
    st: NonNull<efi::SystemTable>,
}

impl UefiServices {
    /// Wrap the system table passed to the image entry point.
    ///
    /// # Safety
    ///
    /// `st` must be the system table handed to this image, and boot services
    /// must remain available for as long as the returned value is used.
    pub unsafe fn new(st: *mut efi::SystemTable) -> Option<Self> {
        NonNull::new(st).map(|st| Self { st })
    }

    pub fn system_table(&self) -> &efi::SystemTable {
        // SAFETY: `new` requires a live system table.
        unsafe { self.st.as_ref() }
    }

    pub fn boot_services(&self) -> Option<&efi::BootServices> {
        // SAFETY: firmware keeps the boot services table alive until
        // `ExitBootServices`.
        unsafe { self.system_table().boot_services.as_ref() }
    }

    pub fn config_tables(&self) -> ConfigTables<'_> {
        let st = self.system_table();
        if st.configuration_table.is_null() {
            return ConfigTables::new(&[]);
        }
        // SAFETY: firmware publishes `number_of_table_entries` contiguous
        // entries at `configuration_table`.
        let entries =
            unsafe { slice::from_raw_parts(st.configuration_table, st.number_of_table_entries) };
        ConfigTables::new(entries)
    }

    pub fn page_allocator(&self) -> Option<PageAllocator<'_>> {
        self.boot_services().map(|bs| PageAllocator { bs })
    }
}
