//! `hestfix.efi`: backfills unassigned GHES Error Status Addresses in the
//! firmware's HEST before the OS loader runs.
//!
//! Built for `x86_64-unknown-uefi`. Host builds of the workspace compile an
//! empty `main` so the crate stays a regular workspace member.

#![cfg_attr(all(not(test), target_os = "uefi"), no_std)]
#![cfg_attr(all(not(test), target_os = "uefi"), no_main)]

#[cfg(any(test, not(target_os = "uefi")))]
fn main() {}

#[cfg(all(not(test), target_os = "uefi"))]
mod rt;
