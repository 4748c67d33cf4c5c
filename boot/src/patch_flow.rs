//! The HEST fixup run, independent of how firmware services are reached.

use hestfix_acpi::hest::{HEST_SIGNATURE, Hest, PatchReport, patch_error_sources};
use hestfix_acpi::tables::{AcpiTables, ConfigRegistry};
use hestfix_acpi::Diagnostic;
use hestfix_lib::{klog_info, klog_set_level, klog_warn};
use hestfix_mm::{FrameAllocator, PhysMemory};

use crate::config::PatchConfig;

pub const BANNER: &str = "HEST: rewriting HEST GHES error status addresses";

#[derive(Clone, Copy, Debug)]
pub enum PatchOutcome {
    /// No RSDP in the configuration tables; nothing was read or allocated.
    DirectoryNotFound,
    /// The RSDT has no HEST entry.
    TableNotFound,
    Patched(PatchReport),
}

impl PatchOutcome {
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        match self {
            PatchOutcome::DirectoryNotFound => Some(Diagnostic::DirectoryNotFound),
            PatchOutcome::TableNotFound => Some(Diagnostic::TableNotFound {
                signature: *HEST_SIGNATURE,
            }),
            PatchOutcome::Patched(report) => report.stop,
        }
    }

    pub fn report(&self) -> Option<&PatchReport> {
        match self {
            PatchOutcome::Patched(report) => Some(report),
            _ => None,
        }
    }
}

/// Locate HEST and backfill its GHES Error Status Addresses.
///
/// Never fails: every problem is logged and reflected in the outcome, and
/// the caller reports success to firmware regardless.
pub fn run_patch<M, R, A>(
    mem: &M,
    registry: &R,
    allocator: &mut A,
    config: &PatchConfig,
) -> PatchOutcome
where
    M: PhysMemory + ?Sized,
    R: ConfigRegistry + ?Sized,
    A: FrameAllocator + ?Sized,
{
    klog_set_level(config.log_level);
    klog_info!("{}", BANNER);

    let tables = AcpiTables::new(mem, registry);
    if tables.directory().is_none() {
        klog_warn!("ACPI: {}", Diagnostic::DirectoryNotFound);
        return PatchOutcome::DirectoryNotFound;
    }

    let Some(addr) = tables.find_table(HEST_SIGNATURE) else {
        klog_info!(
            "ACPI: {}",
            Diagnostic::TableNotFound {
                signature: *HEST_SIGNATURE
            }
        );
        return PatchOutcome::TableNotFound;
    };

    let hest = Hest::read(mem, addr);
    let report = patch_error_sources(mem, &hest, allocator, &config.patch_options());

    klog_info!(
        "HEST: {} processed, {} patched, {} already assigned, {} skipped, {} failed{}",
        report.processed,
        report.patched,
        report.already_assigned,
        report.skipped_foreign,
        report.failures.len(),
        if config.dry_run { " (dry run)" } else { "" }
    );
    PatchOutcome::Patched(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hestfix_abi::addr::PhysAddr;
    use hestfix_abi::MemoryClass;
    use hestfix_acpi::hest::Strictness;
    use hestfix_acpi::test_fixtures::{
        StaticRegistry, ghes, ghes_status_address, hest, hest_record, rsdp, rsdt, sdt,
    };
    use hestfix_lib::KlogLevel;
    use hestfix_mm::test_fixtures::{ScriptedAllocator, SparseMemory};

    const RSDP_ADDR: PhysAddr = PhysAddr(0xE_0000);
    const RSDT_ADDR: u32 = 0x7FE0_0000;
    const FACP_ADDR: u32 = 0x7FE1_0000;
    const HEST_ADDR: u32 = 0x7FE5_0000;
    const POOL: PhysAddr = PhysAddr(0x4000_0000);

    fn quiet() -> PatchConfig {
        PatchConfig {
            log_level: KlogLevel::Error,
            ..PatchConfig::default()
        }
    }

    fn platform(records: &[std::vec::Vec<u8>]) -> SparseMemory {
        let mem = SparseMemory::new();
        mem.map(RSDP_ADDR, &rsdp(RSDT_ADDR));
        mem.map(PhysAddr::from_u32(RSDT_ADDR), &rsdt(&[FACP_ADDR, HEST_ADDR]));
        mem.map(PhysAddr::from_u32(FACP_ADDR), &sdt(b"FACP", &[0u8; 16]));
        mem.map(PhysAddr::from_u32(HEST_ADDR), &hest(records));
        mem
    }

    #[test]
    fn test_end_to_end_patch() {
        let mem = platform(&[ghes(0, 0, 0), ghes(1, 0, 0xFEED_0000), ghes(2, 0, 0)]);
        let registry = StaticRegistry::new().with_current(RSDP_ADDR);
        let mut alloc = ScriptedAllocator::new(POOL);

        let outcome = run_patch(&mem, &registry, &mut alloc, &quiet());

        let report = outcome.report().copied().unwrap();
        assert!(outcome.diagnostic().is_none());
        assert_eq!(report.patched, 2);
        assert_eq!(report.already_assigned, 1);
        assert_eq!(alloc.calls(), &[(16, MemoryClass::AcpiNvs), (16, MemoryClass::AcpiNvs)]);

        let hest_addr = PhysAddr::from_u32(HEST_ADDR);
        assert_eq!(ghes_status_address(&mem, hest_addr, 0), POOL.as_u64());
        assert_eq!(ghes_status_address(&mem, hest_addr, 1), 0xFEED_0000);
        assert_eq!(ghes_status_address(&mem, hest_addr, 2), POOL.as_u64() + 64 * 1024);
    }

    #[test]
    fn test_no_root_pointer_is_success_without_allocation() {
        let mem = SparseMemory::new();
        let registry = StaticRegistry::new();
        let mut alloc = ScriptedAllocator::new(POOL);

        let outcome = run_patch(&mem, &registry, &mut alloc, &quiet());

        assert!(matches!(outcome, PatchOutcome::DirectoryNotFound));
        assert_eq!(outcome.diagnostic(), Some(Diagnostic::DirectoryNotFound));
        assert!(alloc.calls().is_empty());
        assert_eq!(mem.read_count(), 0);
    }

    #[test]
    fn test_missing_hest() {
        let mem = SparseMemory::new();
        mem.map(RSDP_ADDR, &rsdp(RSDT_ADDR));
        mem.map(PhysAddr::from_u32(RSDT_ADDR), &rsdt(&[FACP_ADDR]));
        mem.map(PhysAddr::from_u32(FACP_ADDR), &sdt(b"FACP", &[]));
        let registry = StaticRegistry::new().with_legacy(RSDP_ADDR);
        let mut alloc = ScriptedAllocator::new(POOL);

        let outcome = run_patch(&mem, &registry, &mut alloc, &quiet());

        assert!(matches!(outcome, PatchOutcome::TableNotFound));
        assert_eq!(
            outcome.diagnostic(),
            Some(Diagnostic::TableNotFound { signature: *b"HEST" })
        );
        assert!(alloc.calls().is_empty());
    }

    #[test]
    fn test_config_flows_into_patch_options() {
        let records = [
            ghes(0, 0, 0),
            hest_record(hestfix_acpi::hest::HEST_TYPE_PCIE_BRIDGE_AER, 56),
            ghes(2, 0, 0),
        ];
        let registry = StaticRegistry::new().with_current(RSDP_ADDR);

        let strict_mem = platform(&records);
        let mut strict_alloc = ScriptedAllocator::new(POOL);
        let strict = run_patch(&strict_mem, &registry, &mut strict_alloc, &quiet());
        assert_eq!(strict.report().map(|r| r.patched), Some(1));
        assert!(matches!(
            strict.diagnostic(),
            Some(Diagnostic::UnexpectedRecordType { index: 1, .. })
        ));

        let lenient_mem = platform(&records);
        let mut lenient_alloc = ScriptedAllocator::new(POOL);
        let config = PatchConfig {
            strictness: Strictness::SkipKnown,
            block_size: 8 * 1024,
            ..quiet()
        };
        let lenient = run_patch(&lenient_mem, &registry, &mut lenient_alloc, &config);
        assert_eq!(lenient.report().map(|r| r.patched), Some(2));
        assert!(lenient.diagnostic().is_none());
        assert_eq!(
            lenient_alloc.calls(),
            &[(2, MemoryClass::AcpiNvs), (2, MemoryClass::AcpiNvs)]
        );
    }

    #[test]
    fn test_dry_run_leaves_table_untouched() {
        let mem = platform(&[ghes(0, 0, 0)]);
        let before = mem.snapshot(PhysAddr::from_u32(HEST_ADDR), 40 + 64);
        let registry = StaticRegistry::new().with_current(RSDP_ADDR);
        let mut alloc = ScriptedAllocator::new(POOL);
        let config = PatchConfig {
            dry_run: true,
            ..quiet()
        };

        let outcome = run_patch(&mem, &registry, &mut alloc, &config);

        assert_eq!(outcome.report().map(|r| r.eligible), Some(1));
        assert!(alloc.calls().is_empty());
        assert_eq!(mem.snapshot(PhysAddr::from_u32(HEST_ADDR), 40 + 64), before);
    }
}
