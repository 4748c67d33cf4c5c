//! HEST (Hardware Error Source Table) walking and GHES fixups.
//!
//! Firmware on some platforms publishes Generic Hardware Error Source (GHES)
//! records whose Error Status Address is a system-memory GAS left at zero:
//! the platform never carved out the buffer the OS is supposed to poll. This
//! module walks the HEST records and, for each such GHES, allocates a 64 KiB
//! block of ACPI NVS memory and writes its address into the record
//! (ACPI 6.x §18.3.2).
//!
//! # Record layout assumption
//!
//! HEST records have type-specific sizes. In [`Strictness::Strict`] mode the
//! walker assumes the table is a homogeneous run of GHES records: it advances
//! by the fixed GHES size and stops at the first record of any other type.
//! [`Strictness::SkipKnown`] instead steps over the non-GHES types it knows
//! the architected size of, and stops only at unknown types or at a record
//! that would run past the end of the table.
//!
//! The table checksum is **not** updated after patching.
//!
//! # Usage
//!
//! ```ignore
//! let hest = Hest::read(&mem, addr);
//! let report = patch_error_sources(&mem, &hest, &mut allocator, &PatchOptions::default());
//! if let Some(stop) = report.stop {
//!     // scan ended early
//! }
//! ```

use core::mem::{self, offset_of};

use bitflags::bitflags;

use hestfix_abi::addr::PhysAddr;
use hestfix_abi::MemoryClass;
use hestfix_lib::{klog_debug, klog_info, klog_warn};
use hestfix_mm::{FrameAllocator, PhysMemory, size_to_pages};

use crate::error::Diagnostic;
use crate::gas::{AcpiGas, GAS_ADDRESS_OFFSET};
use crate::tables::SdtHeader;

pub const HEST_SIGNATURE: &[u8; 4] = b"HEST";

/// Size of each Error Status Address block handed to the platform.
pub const ERROR_STATUS_BLOCK_SIZE: u64 = 64 * 1024;

// Error source structure types (ACPI 6.x Table 18-2).
pub const HEST_TYPE_IA32_MACHINE_CHECK: u16 = 0;
pub const HEST_TYPE_IA32_CORRECTED_MACHINE_CHECK: u16 = 1;
pub const HEST_TYPE_IA32_NMI: u16 = 2;
pub const HEST_TYPE_PCIE_ROOT_PORT_AER: u16 = 6;
pub const HEST_TYPE_PCIE_DEVICE_AER: u16 = 7;
pub const HEST_TYPE_PCIE_BRIDGE_AER: u16 = 8;
pub const HEST_TYPE_GENERIC_HARDWARE_ERROR: u16 = 9;
pub const HEST_TYPE_GENERIC_HARDWARE_ERROR_V2: u16 = 10;
pub const HEST_TYPE_IA32_DEFERRED_MACHINE_CHECK: u16 = 11;

/// Size of one IA-32 machine check bank descriptor.
const MACHINE_CHECK_BANK_SIZE: u64 = 28;

// `NumberOfHardwareBanks` offsets; the bank array follows the fixed part.
const MCE_BANK_COUNT_OFFSET: u64 = 32;
const MCE_FIXED_SIZE: u64 = 40;
const CMC_BANK_COUNT_OFFSET: u64 = 44;
const CMC_FIXED_SIZE: u64 = 48;

/// Failed record indices kept verbatim in a [`PatchReport`].
pub const MAX_TRACKED_FAILURES: usize = 16;

// =============================================================================
// Raw ACPI structures (packed, matches firmware layout)
// =============================================================================

/// HEST header: SDT header followed by the record count. Records start
/// immediately after.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RawHest {
    pub header: SdtHeader,
    pub error_source_count: u32,
}

/// Hardware Error Notification Structure (28 bytes).
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RawNotification {
    pub notification_type: u8,
    pub length: u8,
    pub config_write_enable: u16,
    pub poll_interval: u32,
    pub vector: u32,
    pub switch_to_polling_threshold_value: u32,
    pub switch_to_polling_threshold_window: u32,
    pub error_threshold_value: u32,
    pub error_threshold_window: u32,
}

/// Generic Hardware Error Source structure, type 9 (64 bytes).
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct RawGhes {
    pub source_type: u16,
    pub source_id: u16,
    pub related_source_id: u16,
    pub flags: u8,
    pub enabled: u8,
    pub records_to_preallocate: u32,
    pub max_sections_per_record: u32,
    pub max_raw_data_length: u32,
    pub error_status_address: AcpiGas,
    pub notification: RawNotification,
    pub error_block_length: u32,
}

const GHES_SIZE: u64 = mem::size_of::<RawGhes>() as u64;
const GHES_STATUS_GAS_OFFSET: u64 = offset_of!(RawGhes, error_status_address) as u64;
const RECORD_FLAGS_OFFSET: u64 = offset_of!(RawGhes, flags) as u64;

const _: () = assert!(mem::size_of::<RawHest>() == 40);
const _: () = assert!(mem::size_of::<RawNotification>() == 28);
const _: () = assert!(GHES_SIZE == 64);
const _: () = assert!(GHES_STATUS_GAS_OFFSET == 20);

bitflags! {
    /// Flags byte shared by the IA-32 and PCIe AER error source types.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HestSourceFlags: u8 {
        const FIRMWARE_FIRST = 1 << 0;
        const GLOBAL = 1 << 1;
        const GHES_ASSIST = 1 << 2;
    }
}

/// Architected size of a non-GHES record, or `None` for unknown types.
fn foreign_record_len<M>(mem: &M, record: PhysAddr, record_type: u16) -> Option<u64>
where
    M: PhysMemory + ?Sized,
{
    let banks = |count_offset: u64| {
        mem.read_u8(record.offset(count_offset)) as u64 * MACHINE_CHECK_BANK_SIZE
    };
    match record_type {
        HEST_TYPE_IA32_MACHINE_CHECK => Some(MCE_FIXED_SIZE + banks(MCE_BANK_COUNT_OFFSET)),
        HEST_TYPE_IA32_CORRECTED_MACHINE_CHECK | HEST_TYPE_IA32_DEFERRED_MACHINE_CHECK => {
            Some(CMC_FIXED_SIZE + banks(CMC_BANK_COUNT_OFFSET))
        }
        HEST_TYPE_IA32_NMI => Some(20),
        HEST_TYPE_PCIE_ROOT_PORT_AER => Some(48),
        HEST_TYPE_PCIE_DEVICE_AER => Some(44),
        HEST_TYPE_PCIE_BRIDGE_AER => Some(56),
        HEST_TYPE_GENERIC_HARDWARE_ERROR => Some(GHES_SIZE),
        HEST_TYPE_GENERIC_HARDWARE_ERROR_V2 => Some(92),
        _ => None,
    }
}

fn source_flags<M>(mem: &M, record: PhysAddr, record_type: u16) -> Option<HestSourceFlags>
where
    M: PhysMemory + ?Sized,
{
    match record_type {
        HEST_TYPE_IA32_MACHINE_CHECK
        | HEST_TYPE_IA32_CORRECTED_MACHINE_CHECK
        | HEST_TYPE_PCIE_ROOT_PORT_AER
        | HEST_TYPE_PCIE_DEVICE_AER
        | HEST_TYPE_PCIE_BRIDGE_AER
        | HEST_TYPE_IA32_DEFERRED_MACHINE_CHECK => Some(HestSourceFlags::from_bits_truncate(
            mem.read_u8(record.offset(RECORD_FLAGS_OFFSET)),
        )),
        _ => None,
    }
}

// =============================================================================
// Options and report
// =============================================================================

/// How the walker treats records that are not GHES.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Stop at the first non-GHES record; records are assumed homogeneous.
    #[default]
    Strict,
    /// Step over known non-GHES types by their own size.
    SkipKnown,
}

#[derive(Clone, Copy, Debug)]
pub struct PatchOptions {
    pub strictness: Strictness,
    /// Count eligible records without allocating or writing anything.
    pub dry_run: bool,
    /// Bytes per Error Status Address block, rounded up to whole pages.
    pub block_size: u64,
    pub memory_class: MemoryClass,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            strictness: Strictness::Strict,
            dry_run: false,
            block_size: ERROR_STATUS_BLOCK_SIZE,
            memory_class: MemoryClass::AcpiNvs,
        }
    }
}

/// Indices of records whose block allocation failed.
///
/// The first [`MAX_TRACKED_FAILURES`] indices are kept; [`len`](Self::len)
/// counts all of them.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailedRecords {
    indices: [u32; MAX_TRACKED_FAILURES],
    total: u32,
}

impl FailedRecords {
    fn record(&mut self, index: u32) {
        if let Some(slot) = self.indices.get_mut(self.total as usize) {
            *slot = index;
        }
        self.total += 1;
    }

    pub fn len(&self) -> u32 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let tracked = (self.total as usize).min(MAX_TRACKED_FAILURES);
        self.indices[..tracked].iter().copied()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.iter().any(|i| i == index)
    }
}

/// Outcome of one pass over the HEST records.
#[derive(Clone, Copy, Debug, Default)]
pub struct PatchReport {
    /// Records walked before the scan ended.
    pub processed: u32,
    /// GHES records with an unassigned system-memory Error Status Address.
    pub eligible: u32,
    /// Eligible records that received a fresh block.
    pub patched: u32,
    /// GHES records left alone: address already set or not system memory.
    pub already_assigned: u32,
    /// Non-GHES records stepped over in [`Strictness::SkipKnown`] mode.
    pub skipped_foreign: u32,
    pub failures: FailedRecords,
    /// Why the scan ended early, or `None` if every record was walked.
    pub stop: Option<Diagnostic>,
}

impl PatchReport {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.stop.is_none()
    }
}

// =============================================================================
// HEST handle
// =============================================================================

/// Parsed HEST header.
#[derive(Clone, Copy, Debug)]
pub struct Hest {
    addr: PhysAddr,
    length: u32,
    error_source_count: u32,
}

impl Hest {
    pub fn read<M: PhysMemory + ?Sized>(mem: &M, addr: PhysAddr) -> Self {
        // SAFETY: `RawHest` is packed and made only of integers and byte
        // arrays.
        let raw: RawHest = unsafe { mem.read_struct(addr) };
        Self {
            addr,
            length: raw.header.length,
            error_source_count: raw.error_source_count,
        }
    }

    #[inline]
    pub fn address(&self) -> PhysAddr {
        self.addr
    }

    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    #[inline]
    pub fn error_source_count(&self) -> u32 {
        self.error_source_count
    }

    /// Address of the first error source record.
    #[inline]
    pub fn records_base(&self) -> PhysAddr {
        self.addr.offset(mem::size_of::<RawHest>() as u64)
    }
}

// =============================================================================
// Patching
// =============================================================================

/// Backfill every unassigned GHES Error Status Address in `hest`.
///
/// Walks `ErrorSourceCount` records. Each eligible record gets one
/// allocation of `options.block_size` bytes of `options.memory_class`
/// memory; a failed allocation leaves that record untouched and the walk
/// continues. Records that already carry an address, or describe a
/// non-memory space, are never modified.
pub fn patch_error_sources<M, A>(
    mem: &M,
    hest: &Hest,
    allocator: &mut A,
    options: &PatchOptions,
) -> PatchReport
where
    M: PhysMemory + ?Sized,
    A: FrameAllocator + ?Sized,
{
    let mut report = PatchReport::default();
    let table_end = hest.address().offset(hest.length() as u64);
    let mut record = hest.records_base();

    klog_info!(
        "HEST: {} error sources at {} ({} bytes)",
        hest.error_source_count(),
        hest.address(),
        hest.length()
    );

    for index in 0..hest.error_source_count() {
        let record_type = mem.read_u16(record);

        let len = if record_type == HEST_TYPE_GENERIC_HARDWARE_ERROR {
            GHES_SIZE
        } else {
            let known = match options.strictness {
                Strictness::Strict => None,
                Strictness::SkipKnown => foreign_record_len(mem, record, record_type),
            };
            match known {
                Some(len) => len,
                None => {
                    report.stop = Some(Diagnostic::UnexpectedRecordType { index, record_type });
                    break;
                }
            }
        };

        if options.strictness == Strictness::SkipKnown && record.offset(len) > table_end {
            report.stop = Some(Diagnostic::RecordOutOfBounds { index });
            break;
        }

        if record_type == HEST_TYPE_GENERIC_HARDWARE_ERROR {
            patch_ghes(mem, record, index, allocator, options, &mut report);
        } else {
            match source_flags(mem, record, record_type) {
                Some(flags) => klog_debug!(
                    "HEST: skipping entry {} (type {}, flags {:?})",
                    index,
                    record_type,
                    flags
                ),
                None => klog_debug!("HEST: skipping entry {} (type {})", index, record_type),
            }
            report.skipped_foreign += 1;
        }

        report.processed += 1;
        record = record.offset(len);
    }

    if let Some(stop) = report.stop {
        klog_info!("HEST: {}", stop);
    }
    report
}

fn patch_ghes<M, A>(
    mem: &M,
    record: PhysAddr,
    index: u32,
    allocator: &mut A,
    options: &PatchOptions,
    report: &mut PatchReport,
) where
    M: PhysMemory + ?Sized,
    A: FrameAllocator + ?Sized,
{
    // SAFETY: `RawGhes` is packed and made only of integers.
    let ghes: RawGhes = unsafe { mem.read_struct(record) };
    let source_id = ghes.source_id;
    let status = ghes.error_status_address;

    if !status.is_unassigned_memory() {
        let (space, address) = (status.address_space_id, status.address);
        klog_debug!(
            "HEST: GHES entry {} (source {}) already provisioned (space {}, address {:#x})",
            index,
            source_id,
            space,
            address
        );
        report.already_assigned += 1;
        return;
    }

    report.eligible += 1;
    let pages = size_to_pages(options.block_size);

    if options.dry_run {
        klog_info!(
            "HEST: GHES entry {} (source {}) needs {} pages of {} memory (dry run)",
            index,
            source_id,
            pages,
            options.memory_class
        );
        return;
    }

    match allocator.allocate_pages(pages, options.memory_class) {
        Ok(block) => {
            let field = record.offset(GHES_STATUS_GAS_OFFSET + GAS_ADDRESS_OFFSET);
            mem.write_u64(field, block.as_u64());
            klog_info!(
                "HEST: GHES entry {} (source {}) error status block at {}",
                index,
                source_id,
                block
            );
            report.patched += 1;
        }
        Err(error) => {
            klog_warn!("HEST: {}", Diagnostic::AllocationFailed { index, error });
            report.failures.record(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{
        ghes, ghes_status_address, ghes_v2, hest, hest_record, ia32_corrected_machine_check,
        ia32_machine_check, ia32_nmi,
    };
    use alloc::vec;
    use hestfix_abi::AllocError;
    use hestfix_mm::test_fixtures::{ScriptedAllocator, SparseMemory};

    const HEST_ADDR: PhysAddr = PhysAddr(0x7FE5_0000);
    const POOL: PhysAddr = PhysAddr(0x4000_0000);

    fn load(image: &[u8]) -> (SparseMemory, Hest) {
        let mem = SparseMemory::new();
        mem.map(HEST_ADDR, image);
        let table = Hest::read(&mem, HEST_ADDR);
        (mem, table)
    }

    #[test]
    fn test_patches_unassigned_records_with_nvs_blocks() {
        let (mem, table) = load(&hest(&[ghes(0, 0, 0), ghes(1, 0, 0)]));
        let mut alloc = ScriptedAllocator::new(POOL);

        let report = patch_error_sources(&mem, &table, &mut alloc, &PatchOptions::default());

        assert!(report.is_complete());
        assert_eq!(report.processed, 2);
        assert_eq!(report.eligible, 2);
        assert_eq!(report.patched, 2);
        assert_eq!(alloc.calls(), &[(16, MemoryClass::AcpiNvs), (16, MemoryClass::AcpiNvs)]);
        assert_eq!(ghes_status_address(&mem, HEST_ADDR, 0), POOL.as_u64());
        assert_eq!(ghes_status_address(&mem, HEST_ADDR, 1), POOL.as_u64() + 64 * 1024);
    }

    #[test]
    fn test_second_pass_leaves_assigned_records_alone() {
        let (mem, table) = load(&hest(&[ghes(0, 0, 0)]));
        let mut alloc = ScriptedAllocator::new(POOL);

        patch_error_sources(&mem, &table, &mut alloc, &PatchOptions::default());
        let first = ghes_status_address(&mem, HEST_ADDR, 0);
        assert_ne!(first, 0);

        let report = patch_error_sources(&mem, &table, &mut alloc, &PatchOptions::default());
        assert_eq!(report.patched, 0);
        assert_eq!(report.already_assigned, 1);
        assert_eq!(ghes_status_address(&mem, HEST_ADDR, 0), first);
        assert_eq!(alloc.calls().len(), 1);
    }

    #[test]
    fn test_foreign_type_stops_scan() {
        let image = hest(&[
            ghes(0, 0, 0),
            ghes(1, 0, 0),
            hest_record(HEST_TYPE_PCIE_ROOT_PORT_AER, 64),
            ghes(3, 0, 0),
            ghes(4, 0, 0),
        ]);
        let (mem, table) = load(&image);
        let tail_before = mem.snapshot(table.records_base().offset(2 * 64), 3 * 64);
        let mut alloc = ScriptedAllocator::new(POOL);

        let report = patch_error_sources(&mem, &table, &mut alloc, &PatchOptions::default());

        assert_eq!(report.processed, 2);
        assert_eq!(report.patched, 2);
        assert_eq!(
            report.stop,
            Some(Diagnostic::UnexpectedRecordType {
                index: 2,
                record_type: HEST_TYPE_PCIE_ROOT_PORT_AER
            })
        );
        assert_ne!(ghes_status_address(&mem, HEST_ADDR, 0), 0);
        assert_ne!(ghes_status_address(&mem, HEST_ADDR, 1), 0);
        assert_eq!(mem.snapshot(table.records_base().offset(2 * 64), 3 * 64), tail_before);
        assert_eq!(alloc.calls().len(), 2);
    }

    #[test]
    fn test_allocation_failure_does_not_block_later_records() {
        let (mem, table) = load(&hest(&[ghes(0, 0, 0), ghes(1, 0, 0), ghes(2, 0, 0)]));
        let mut alloc = ScriptedAllocator::new(POOL).failing_at(1);

        let report = patch_error_sources(&mem, &table, &mut alloc, &PatchOptions::default());

        assert!(report.is_complete());
        assert_eq!(report.eligible, 3);
        assert_eq!(report.patched, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures.contains(1));
        assert_ne!(ghes_status_address(&mem, HEST_ADDR, 0), 0);
        assert_eq!(ghes_status_address(&mem, HEST_ADDR, 1), 0);
        assert_ne!(ghes_status_address(&mem, HEST_ADDR, 2), 0);
    }

    #[test]
    fn test_ineligible_records_untouched() {
        let image = hest(&[ghes(0, 0, 0xFEED_0000), ghes(1, 1, 0), ghes(2, 0, 0)]);
        let (mem, table) = load(&image);
        let mut alloc = ScriptedAllocator::new(POOL);

        let report = patch_error_sources(&mem, &table, &mut alloc, &PatchOptions::default());

        assert_eq!(report.already_assigned, 2);
        assert_eq!(report.patched, 1);
        assert_eq!(ghes_status_address(&mem, HEST_ADDR, 0), 0xFEED_0000);
        assert_eq!(ghes_status_address(&mem, HEST_ADDR, 1), 0);
        assert_eq!(ghes_status_address(&mem, HEST_ADDR, 2), POOL.as_u64());
    }

    #[test]
    fn test_header_is_not_rewritten() {
        let image = hest(&[ghes(0, 0, 0)]);
        let (mem, table) = load(&image);
        let header_before = mem.snapshot(HEST_ADDR, 40);
        let mut alloc = ScriptedAllocator::new(POOL);

        patch_error_sources(&mem, &table, &mut alloc, &PatchOptions::default());

        assert_eq!(mem.snapshot(HEST_ADDR, 40), header_before);
    }

    #[test]
    fn test_dry_run_counts_without_allocating() {
        let (mem, table) = load(&hest(&[ghes(0, 0, 0), ghes(1, 0, 0x1000)]));
        let mut alloc = ScriptedAllocator::new(POOL);
        let options = PatchOptions {
            dry_run: true,
            ..PatchOptions::default()
        };

        let report = patch_error_sources(&mem, &table, &mut alloc, &options);

        assert_eq!(report.eligible, 1);
        assert_eq!(report.patched, 0);
        assert!(alloc.calls().is_empty());
        assert_eq!(ghes_status_address(&mem, HEST_ADDR, 0), 0);
    }

    #[test]
    fn test_block_size_and_class_are_configurable() {
        let (mem, table) = load(&hest(&[ghes(0, 0, 0)]));
        let mut alloc = ScriptedAllocator::new(POOL);
        let options = PatchOptions {
            block_size: 4097,
            memory_class: MemoryClass::Reserved,
            ..PatchOptions::default()
        };

        patch_error_sources(&mem, &table, &mut alloc, &options);

        assert_eq!(alloc.calls(), &[(2, MemoryClass::Reserved)]);
    }

    fn skip_known() -> PatchOptions {
        PatchOptions {
            strictness: Strictness::SkipKnown,
            ..PatchOptions::default()
        }
    }

    /// Runs `foreign` followed by an eligible GHES in SkipKnown mode and
    /// checks the GHES was found right after `foreign_len` bytes.
    fn assert_ghes_follows(foreign: vec::Vec<u8>, foreign_len: u64) -> (SparseMemory, Hest) {
        assert_eq!(foreign.len() as u64, foreign_len);
        let (mem, table) = load(&hest(&[foreign, ghes(7, 0, 0)]));
        let mut alloc = ScriptedAllocator::new(POOL);

        let report = patch_error_sources(&mem, &table, &mut alloc, &skip_known());

        assert_eq!(report.stop, None);
        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped_foreign, 1);
        assert_eq!(report.patched, 1);
        let status = table.records_base().offset(foreign_len + 24);
        assert_eq!(mem.read_u64(status), POOL.as_u64());
        (mem, table)
    }

    #[test]
    fn test_skip_known_steps_over_foreign_records() {
        let image = hest(&[
            ghes(0, 0, 0),
            hest_record(HEST_TYPE_PCIE_DEVICE_AER, 44),
            ia32_machine_check(2, 2),
            ghes(3, 0, 0),
        ]);
        let (mem, table) = load(&image);
        let mut alloc = ScriptedAllocator::new(POOL);

        let report = patch_error_sources(&mem, &table, &mut alloc, &skip_known());

        assert!(report.is_complete());
        assert_eq!(report.processed, 4);
        assert_eq!(report.skipped_foreign, 2);
        assert_eq!(report.patched, 2);
        let last = table.records_base().offset(64 + 44 + 96);
        assert_eq!(mem.read_u64(last.offset(24)), POOL.as_u64() + 64 * 1024);
    }

    #[test]
    fn test_skip_known_machine_check_bank_count() {
        assert_ghes_follows(ia32_machine_check(0, 1), 40 + 28);
        assert_ghes_follows(ia32_machine_check(0, 3), 40 + 3 * 28);
        assert_ghes_follows(ia32_machine_check(0, 0), 40);
    }

    #[test]
    fn test_skip_known_corrected_machine_check() {
        let record = ia32_corrected_machine_check(HEST_TYPE_IA32_CORRECTED_MACHINE_CHECK, 0, 2);
        assert_ghes_follows(record, 48 + 2 * 28);
    }

    #[test]
    fn test_skip_known_deferred_machine_check() {
        let record = ia32_corrected_machine_check(HEST_TYPE_IA32_DEFERRED_MACHINE_CHECK, 0, 1);
        assert_ghes_follows(record, 48 + 28);
    }

    #[test]
    fn test_skip_known_nmi() {
        assert_ghes_follows(ia32_nmi(0), 20);
    }

    #[test]
    fn test_skip_known_ghes_v2_is_not_patched() {
        let (mem, table) = assert_ghes_follows(ghes_v2(0, 0, 0), 92);
        assert_eq!(mem.read_u64(table.records_base().offset(24)), 0);
    }

    #[test]
    fn test_skip_known_stops_on_unknown_type() {
        let image = hest(&[hest_record(4, 64), ghes(1, 0, 0)]);
        let (mem, table) = load(&image);
        let mut alloc = ScriptedAllocator::new(POOL);
        let options = PatchOptions {
            strictness: Strictness::SkipKnown,
            ..PatchOptions::default()
        };

        let report = patch_error_sources(&mem, &table, &mut alloc, &options);

        assert_eq!(report.processed, 0);
        assert_eq!(
            report.stop,
            Some(Diagnostic::UnexpectedRecordType { index: 0, record_type: 4 })
        );
        assert!(alloc.calls().is_empty());
    }

    #[test]
    fn test_skip_known_stops_at_table_end() {
        // Claims three records but only carries two.
        let mut image = hest(&[ghes(0, 0, 0), ghes(1, 0, 0)]);
        image[36..40].copy_from_slice(&3u32.to_le_bytes());
        image.extend_from_slice(&vec![0u8; 64]);
        let length = (image.len() - 64) as u32;
        image[4..8].copy_from_slice(&length.to_le_bytes());
        let (mem, table) = load(&image);
        let mut alloc = ScriptedAllocator::new(POOL);
        let options = PatchOptions {
            strictness: Strictness::SkipKnown,
            ..PatchOptions::default()
        };

        let report = patch_error_sources(&mem, &table, &mut alloc, &options);

        assert_eq!(report.patched, 2);
        assert_eq!(report.stop, Some(Diagnostic::RecordOutOfBounds { index: 2 }));
    }

    #[test]
    fn test_failed_records_tracks_overflow() {
        let mut failures = FailedRecords::default();
        for index in 0..(MAX_TRACKED_FAILURES as u32 + 4) {
            failures.record(index);
        }
        assert_eq!(failures.len(), MAX_TRACKED_FAILURES as u32 + 4);
        assert_eq!(failures.iter().count(), MAX_TRACKED_FAILURES);
        assert!(failures.contains(0));
        assert!(!failures.contains(MAX_TRACKED_FAILURES as u32 + 1));

        let err = Diagnostic::AllocationFailed {
            index: 1,
            error: AllocError::OutOfResources,
        };
        assert_eq!(
            alloc::format!("{}", err),
            "failed to allocate memory for GHES entry 1 (out of resources)"
        );
    }
}
