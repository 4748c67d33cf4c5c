use r_efi::efi;

use hestfix_lib::{klog_init, klog_warn};
use hestfix_mm::IdentityMapped;

use crate::config::config_from_load_options;
use crate::console::console_init;
use crate::load_options::{LOAD_OPTIONS_MAX, read_load_options};
use crate::patch_flow::run_patch;
use crate::services::UefiServices;

/// Body of the image entry point.
///
/// Always returns `EFI_SUCCESS`: a failed fixup must not fail the boot
/// option that launched this image.
///
/// # Safety
///
/// Must be called once, from the entry point, with the arguments firmware
/// passed to it, before `ExitBootServices`.
pub unsafe fn efi_main_impl(image: efi::Handle, st: *mut efi::SystemTable) -> efi::Status {
    klog_init();

    // SAFETY: `st` is the system table handed to the entry point.
    let Some(services) = (unsafe { UefiServices::new(st) }) else {
        return efi::Status::SUCCESS;
    };
    // SAFETY: boot services are live for the whole run.
    unsafe { console_init(services.system_table()) };

    let mut options_buf = [0u8; LOAD_OPTIONS_MAX];
    let options = match services.boot_services() {
        // SAFETY: `image` and `bs` come straight from firmware.
        Some(bs) => unsafe { read_load_options(image, bs, &mut options_buf) },
        None => None,
    };
    let config = config_from_load_options(options);

    // SAFETY: boot services identity-map all of system memory, and the
    // addresses dereferenced come from firmware-published ACPI tables.
    let mem = unsafe { IdentityMapped::new() };
    let registry = services.config_tables();

    match services.page_allocator() {
        Some(mut allocator) => {
            run_patch(&mem, &registry, &mut allocator, &config);
        }
        None => klog_warn!("EFI: no boot services table, HEST left as published"),
    }

    efi::Status::SUCCESS
}
