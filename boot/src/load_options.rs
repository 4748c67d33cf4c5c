use core::ffi::c_void;
use core::{ptr, slice};

use r_efi::efi;
use r_efi::protocols::loaded_image;

use hestfix_lib::ucs2_to_ascii;

/// Longest load-options line that is honoured; the rest is cut off.
pub const LOAD_OPTIONS_MAX: usize = 256;

/// Narrow a raw `LoadOptions` buffer (UCS-2, possibly NUL-terminated) into
/// `dst`. Odd trailing bytes are dropped.
pub fn decode_load_options<'a>(raw: &[u8], dst: &'a mut [u8]) -> Option<&'a str> {
    let mut units = [0u16; LOAD_OPTIONS_MAX];
    let count = (raw.len() / 2).min(units.len());
    for (unit, pair) in units.iter_mut().zip(raw.chunks_exact(2)).take(count) {
        *unit = u16::from_le_bytes([pair[0], pair[1]]);
    }
    let text = ucs2_to_ascii(&units[..count], dst).trim();
    if text.is_empty() { None } else { Some(text) }
}

/// Read this image's load options through `EFI_LOADED_IMAGE_PROTOCOL`.
///
/// # Safety
///
/// `image` and `bs` must be the image handle and boot services passed to
/// the running image's entry point.
pub unsafe fn read_load_options<'a>(
    image: efi::Handle,
    bs: &efi::BootServices,
    dst: &'a mut [u8],
) -> Option<&'a str> {
    let mut guid = loaded_image::PROTOCOL_GUID;
    let mut interface: *mut c_void = ptr::null_mut();
    let status = (bs.handle_protocol)(image, &mut guid, &mut interface);
    if status.is_error() || interface.is_null() {
        return None;
    }

    // SAFETY: a successful HandleProtocol for the loaded image GUID returns
    // a pointer to that protocol, owned by firmware for the image lifetime.
    let info = unsafe { &*(interface as *const loaded_image::Protocol) };
    if info.load_options.is_null() || info.load_options_size == 0 {
        return None;
    }
    // SAFETY: firmware describes `load_options_size` readable bytes at
    // `load_options`.
    let raw = unsafe {
        slice::from_raw_parts(info.load_options as *const u8, info.load_options_size as usize)
    };
    decode_load_options(raw, dst)
}
