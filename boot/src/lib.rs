//! UEFI front end for hestfix.
//!
//! Wires firmware services into the `hestfix-acpi` patcher: configuration
//! tables and `AllocatePages` become [`ConfigRegistry`] and
//! [`FrameAllocator`] implementations, load options become a
//! [`PatchConfig`], and klog output is routed to `ConOut`.
//!
//! [`ConfigRegistry`]: hestfix_acpi::tables::ConfigRegistry
//! [`FrameAllocator`]: hestfix_mm::FrameAllocator

#![no_std]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod console;
pub mod efi_entry;
pub mod load_options;
pub mod patch_flow;
pub mod services;

pub use config::{PatchConfig, config_from_load_options};
pub use efi_entry::efi_main_impl;
pub use patch_flow::{BANNER, PatchOutcome, run_patch};
pub use services::UefiServices;
