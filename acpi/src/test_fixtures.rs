//! Table image builders and a static configuration registry for tests.
//!
//! Images are little-endian byte vectors laid out exactly as firmware would
//! publish them. Checksums are left at zero; nothing here validates them.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use hestfix_abi::addr::PhysAddr;
use hestfix_mm::PhysMemory;

use crate::tables::{ConfigRegistry, RootPointerKind, SDT_HEADER_SIZE};

/// Configuration registry with fixed RSDP addresses that counts queries.
pub struct StaticRegistry {
    current: Option<PhysAddr>,
    legacy: Option<PhysAddr>,
    lookups: AtomicUsize,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self {
            current: None,
            legacy: None,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn with_current(mut self, rsdp: PhysAddr) -> Self {
        self.current = Some(rsdp);
        self
    }

    pub fn with_legacy(mut self, rsdp: PhysAddr) -> Self {
        self.legacy = Some(rsdp);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl Default for StaticRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigRegistry for StaticRegistry {
    fn lookup(&self, kind: RootPointerKind) -> Option<PhysAddr> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        match kind {
            RootPointerKind::Current => self.current,
            RootPointerKind::Legacy => self.legacy,
        }
    }
}

/// ACPI 1.0 RSDP (20 bytes) pointing at `rsdt_address`.
pub fn rsdp(rsdt_address: u32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(20);
    bytes.extend_from_slice(b"RSD PTR ");
    bytes.push(0);
    bytes.extend_from_slice(b"HFTEST");
    bytes.push(0);
    bytes.extend_from_slice(&rsdt_address.to_le_bytes());
    bytes
}

/// A table with a standard 36-byte header followed by `payload`.
pub fn sdt(signature: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let length = (SDT_HEADER_SIZE + payload.len()) as u32;
    let mut bytes = Vec::with_capacity(length as usize);
    bytes.extend_from_slice(signature);
    bytes.extend_from_slice(&length.to_le_bytes());
    bytes.push(1);
    bytes.push(0);
    bytes.extend_from_slice(b"HFTEST");
    bytes.extend_from_slice(b"HFTABLE ");
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(b"HFIX");
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

pub fn rsdt(entries: &[u32]) -> Vec<u8> {
    let payload: Vec<u8> = entries.iter().flat_map(|entry| entry.to_le_bytes()).collect();
    sdt(b"RSDT", &payload)
}

/// HEST whose `ErrorSourceCount` equals the number of records.
pub fn hest(records: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&(records.len() as u32).to_le_bytes());
    for record in records {
        payload.extend_from_slice(record);
    }
    sdt(b"HEST", &payload)
}

/// A zero-filled HEST record of `len` bytes carrying only its type.
pub fn hest_record(record_type: u16, len: usize) -> Vec<u8> {
    let mut bytes = alloc::vec![0u8; len];
    bytes[..2].copy_from_slice(&record_type.to_le_bytes());
    bytes
}

/// Hardware Error Notification Structure (28 bytes) of the given type.
pub fn notification(notify_type: u8) -> Vec<u8> {
    let mut bytes = alloc::vec![0u8; 28];
    bytes[0] = notify_type;
    bytes[1] = 28;
    bytes
}

/// `count` IA-32 machine check bank descriptors, 28 bytes each, with
/// distinct non-zero MSR addresses.
fn machine_check_banks(count: u8) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(count as usize * 28);
    for bank in 0..count {
        let msr = 0x400 + 4 * bank as u32;
        bytes.extend_from_slice(&[bank, 1, 0, 0]);
        bytes.extend_from_slice(&msr.to_le_bytes());
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&(msr + 1).to_le_bytes());
        bytes.extend_from_slice(&(msr + 2).to_le_bytes());
        bytes.extend_from_slice(&(msr + 3).to_le_bytes());
    }
    bytes
}

/// IA-32 Machine Check Exception record (type 0), 40 bytes plus banks.
pub fn ia32_machine_check(source_id: u16, banks: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&source_id.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.push(0);
    bytes.push(1);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    // GlobalCapabilityInitData, GlobalControlInitData.
    bytes.extend_from_slice(&0x0C09u64.to_le_bytes());
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    bytes.push(banks);
    bytes.extend_from_slice(&[0u8; 7]);
    bytes.extend_from_slice(&machine_check_banks(banks));
    bytes
}

/// IA-32 Corrected (type 1) or Deferred (type 11) Machine Check record,
/// 48 bytes plus banks.
pub fn ia32_corrected_machine_check(record_type: u16, source_id: u16, banks: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&record_type.to_le_bytes());
    bytes.extend_from_slice(&source_id.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.push(0);
    bytes.push(1);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    // CMCI notification.
    bytes.extend_from_slice(&notification(5));
    bytes.push(banks);
    bytes.extend_from_slice(&[0u8; 3]);
    bytes.extend_from_slice(&machine_check_banks(banks));
    bytes
}

/// IA-32 NMI error source (type 2), 20 bytes.
pub fn ia32_nmi(source_id: u16) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(20);
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&source_id.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&0x1000u32.to_le_bytes());
    bytes
}

/// A 64-byte GHES whose Error Status Address is `{space, address}`.
pub fn ghes(source_id: u16, space: u8, address: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(64);
    bytes.extend_from_slice(&9u16.to_le_bytes());
    bytes.extend_from_slice(&source_id.to_le_bytes());
    bytes.extend_from_slice(&0xFFFFu16.to_le_bytes());
    bytes.push(0);
    bytes.push(1);
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&0x1000u32.to_le_bytes());
    // Error Status Address GAS.
    bytes.extend_from_slice(&[space, 64, 0, 4]);
    bytes.extend_from_slice(&address.to_le_bytes());
    // Polled notification.
    bytes.extend_from_slice(&notification(0));
    bytes.extend_from_slice(&0x1000u32.to_le_bytes());
    bytes
}

/// A 92-byte GHESv2 (type 10): a GHES followed by the Read Ack register
/// GAS, preserve mask and write mask.
pub fn ghes_v2(source_id: u16, space: u8, address: u64) -> Vec<u8> {
    let mut bytes = ghes(source_id, space, address);
    bytes[..2].copy_from_slice(&10u16.to_le_bytes());
    bytes.extend_from_slice(&[0, 64, 0, 4]);
    bytes.extend_from_slice(&0xFED4_0000u64.to_le_bytes());
    bytes.extend_from_slice(&0xFFFF_FFFE_u64.to_le_bytes());
    bytes.extend_from_slice(&1u64.to_le_bytes());
    bytes
}

/// Error Status Address of GHES `index` in a homogeneous HEST at `hest`.
pub fn ghes_status_address<M: PhysMemory + ?Sized>(mem: &M, hest: PhysAddr, index: u64) -> u64 {
    mem.read_u64(hest.offset(40 + index * 64 + 24))
}
