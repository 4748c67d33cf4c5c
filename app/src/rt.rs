use core::panic::PanicInfo;

use r_efi::efi;

#[unsafe(no_mangle)]
pub extern "efiapi" fn efi_main(image: efi::Handle, st: *mut efi::SystemTable) -> efi::Status {
    // SAFETY: firmware calls the entry point once, with its own arguments,
    // while boot services are running.
    unsafe { hestfix_boot::efi_main_impl(image, st) }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    hestfix_lib::klog_error!("PANIC: {}", info);
    loop {
        #[cfg(target_arch = "x86_64")]
        x86_64::instructions::hlt();
        #[cfg(not(target_arch = "x86_64"))]
        core::hint::spin_loop();
    }
}
