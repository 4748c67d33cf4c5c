//! ACPI table discovery and HEST fixups for hestfix.
//!
//! This crate walks the firmware's ACPI hierarchy through an injected
//! physical memory capability and patches Generic Hardware Error Source
//! records in place. It never allocates and never touches memory directly.
//!
//! # Architecture
//!
//! - [`tables`]: RSDP lookup through the configuration registry, RSDT
//!   traversal, table lookup by signature.
//! - [`gas`]: Generic Address Structure decoding.
//! - [`hest`]: HEST record walking and Error Status Address backfill.
//! - [`error`]: the diagnostics a patch run can produce.
//!
//! # Usage
//!
//! ```ignore
//! use hestfix_acpi::hest::{Hest, PatchOptions, patch_error_sources, HEST_SIGNATURE};
//! use hestfix_acpi::tables::AcpiTables;
//!
//! let tables = AcpiTables::new(&mem, &registry);
//! if let Some(addr) = tables.find_table(HEST_SIGNATURE) {
//!     let hest = Hest::read(&mem, addr);
//!     let report = patch_error_sources(&mem, &hest, &mut allocator, &PatchOptions::default());
//! }
//! ```

#![no_std]

#[cfg(any(test, feature = "testing"))]
extern crate alloc;

pub mod error;
pub mod gas;
pub mod hest;
pub mod tables;
#[cfg(any(test, feature = "testing"))]
pub mod test_fixtures;

pub use error::Diagnostic;
