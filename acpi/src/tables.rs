use core::mem::{self, offset_of};

use spin::Once;

use hestfix_abi::addr::PhysAddr;
use hestfix_lib::{bytes_as_str, klog_debug, klog_info, klog_trace};
use hestfix_mm::PhysMemory;

/// ACPI 2.0+ RSDP (`RSD PTR `). ACPI 1.0 firmware stops after `rsdt_address`
/// (20 bytes), so only the fields up to there may be read unconditionally.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct Rsdp {
    pub signature: [u8; 8],
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub revision: u8,
    pub rsdt_address: u32,
    pub length: u32,
    pub xsdt_address: u64,
    pub extended_checksum: u8,
    pub reserved: [u8; 3],
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct SdtHeader {
    pub signature: [u8; 4],
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

pub const SDT_HEADER_SIZE: usize = mem::size_of::<SdtHeader>();

/// Size of one RSDT entry (a 32-bit physical table address).
pub const RSDT_ENTRY_SIZE: usize = mem::size_of::<u32>();

/// Size of the RSDT header *including* its first entry slot.
///
/// Firmware C code declares the RSDT as a header followed by `Entry[1]`, and
/// derives the entry count from that struct size. The count arithmetic below
/// keeps that shape.
const RSDT_SIZE_WITH_FIRST_ENTRY: u32 = (SDT_HEADER_SIZE + RSDT_ENTRY_SIZE) as u32;

const _: () = assert!(SDT_HEADER_SIZE == 36);
const _: () = assert!(mem::size_of::<Rsdp>() == 36);

impl SdtHeader {
    /// Copy the header of the table at `addr`.
    pub fn read<M: PhysMemory + ?Sized>(mem: &M, addr: PhysAddr) -> Self {
        // SAFETY: `SdtHeader` is packed and made only of integers and byte
        // arrays.
        unsafe { mem.read_struct(addr) }
    }
}

/// Read the 4-byte signature that starts every ACPI table.
#[inline]
pub fn read_signature<M: PhysMemory + ?Sized>(mem: &M, table: PhysAddr) -> [u8; 4] {
    let mut signature = [0u8; 4];
    mem.read_bytes(table, &mut signature);
    signature
}

/// Number of RSDT entries for a table of `length` bytes.
///
/// `((length - 40) >> 2) + 1`: entries are whole 4-byte slots after the
/// 36-byte header, and a trailing partial slot is ignored. A table too short
/// to hold a single entry has none.
pub const fn rsdt_entry_count(length: u32) -> usize {
    if length < RSDT_SIZE_WITH_FIRST_ENTRY {
        return 0;
    }
    (((length - RSDT_SIZE_WITH_FIRST_ENTRY) >> 2) + 1) as usize
}

// =============================================================================
// Root pointer lookup
// =============================================================================

/// The two configuration-table identifiers firmware publishes the RSDP under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RootPointerKind {
    /// `EFI_ACPI_20_TABLE_GUID`: ACPI 2.0 and later RSDP.
    Current,
    /// `EFI_ACPI_TABLE_GUID`: ACPI 1.0 RSDP.
    Legacy,
}

impl RootPointerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RootPointerKind::Current => "ACPI 2.0+",
            RootPointerKind::Legacy => "ACPI 1.0",
        }
    }
}

/// Firmware-wide registry of configuration tables.
///
/// Implemented over the UEFI system table by the firmware front end and by a
/// static map in tests.
pub trait ConfigRegistry {
    /// Physical address of the RSDP published under `kind`, if any.
    fn lookup(&self, kind: RootPointerKind) -> Option<PhysAddr>;
}

impl<R: ConfigRegistry + ?Sized> ConfigRegistry for &R {
    #[inline]
    fn lookup(&self, kind: RootPointerKind) -> Option<PhysAddr> {
        (**self).lookup(kind)
    }
}

/// Resolve the RSDT address: prefer the current RSDP, fall back to legacy.
///
/// Returns `None` when neither root pointer is published. That is a valid
/// (if degenerate) platform state, not an error.
pub fn locate_directory<M, R>(mem: &M, registry: &R) -> Option<PhysAddr>
where
    M: PhysMemory + ?Sized,
    R: ConfigRegistry + ?Sized,
{
    let (kind, rsdp) = [RootPointerKind::Current, RootPointerKind::Legacy]
        .into_iter()
        .find_map(|kind| registry.lookup(kind).map(|rsdp| (kind, rsdp)))?;

    let rsdt = mem.read_u32(rsdp.offset(offset_of!(Rsdp, rsdt_address) as u64));
    let revision = mem.read_u8(rsdp.offset(offset_of!(Rsdp, revision) as u64));
    let mut oem_id = [0u8; 6];
    mem.read_bytes(rsdp.offset(offset_of!(Rsdp, oem_id) as u64), &mut oem_id);

    klog_debug!(
        "ACPI: {} RSDP at {} (revision {}, OEM '{}'), RSDT at {:#x}",
        kind.as_str(),
        rsdp,
        revision,
        bytes_as_str(&oem_id),
        rsdt
    );
    Some(PhysAddr::from_u32(rsdt))
}

// =============================================================================
// Table directory
// =============================================================================

/// Handle to the ACPI table hierarchy.
///
/// The RSDT address is resolved lazily on first use and then reused for
/// every later lookup, so the configuration registry is queried at most once
/// per handle.
pub struct AcpiTables<'a, M: ?Sized, R: ?Sized> {
    mem: &'a M,
    registry: &'a R,
    rsdt: Once<Option<PhysAddr>>,
}

impl<'a, M, R> AcpiTables<'a, M, R>
where
    M: PhysMemory + ?Sized,
    R: ConfigRegistry + ?Sized,
{
    pub fn new(mem: &'a M, registry: &'a R) -> Self {
        Self {
            mem,
            registry,
            rsdt: Once::new(),
        }
    }

    /// Physical address of the RSDT, or `None` if no RSDP is published.
    pub fn directory(&self) -> Option<PhysAddr> {
        *self
            .rsdt
            .call_once(|| locate_directory(self.mem, self.registry))
    }

    /// Number of entries in the RSDT (zero if there is no RSDT).
    pub fn entry_count(&self) -> usize {
        match self.directory() {
            Some(rsdt) => rsdt_entry_count(SdtHeader::read(self.mem, rsdt).length),
            None => 0,
        }
    }

    /// Find an ACPI table by its 4-byte ASCII signature.
    ///
    /// Walks the RSDT in directory order and returns the first entry whose
    /// table starts with `signature`. Entries are trusted as-is: there is no
    /// checksum or memory-map validation.
    pub fn find_table(&self, signature: &[u8; 4]) -> Option<PhysAddr> {
        let rsdt = self.directory()?;
        let count = self.entry_count();
        let entries = rsdt.offset(SDT_HEADER_SIZE as u64);

        klog_trace!("ACPI: scanning {} RSDT entries for '{}'", count, bytes_as_str(signature));

        for index in 0..count {
            let slot = entries.offset((index * RSDT_ENTRY_SIZE) as u64);
            let table = PhysAddr::from_u32(self.mem.read_u32(slot));
            if read_signature(self.mem, table) == *signature {
                klog_info!("ACPI: {} found at {} (RSDT entry {})", bytes_as_str(signature), table, index);
                return Some(table);
            }
        }
        None
    }
}
