//! klog backend over the firmware text console (`ConOut`).

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicPtr, Ordering};

use r_efi::efi;
use r_efi::protocols::simple_text_output;

use hestfix_lib::klog_register_backend;

/// Code units per `OutputString` call, excluding the terminating NUL.
const CHUNK: usize = 126;

static CON_OUT: AtomicPtr<simple_text_output::Protocol> = AtomicPtr::new(core::ptr::null_mut());

/// Narrows formatted text to UCS-2 and hands it out in NUL-terminated chunks.
///
/// `\n` is expanded to `\r\n`; characters outside the BMP become `?`.
pub struct Ucs2Writer<F: FnMut(&mut [u16])> {
    buf: [u16; CHUNK + 1],
    len: usize,
    sink: F,
}

impl<F: FnMut(&mut [u16])> Ucs2Writer<F> {
    pub fn new(sink: F) -> Self {
        Self {
            buf: [0; CHUNK + 1],
            len: 0,
            sink,
        }
    }

    fn push(&mut self, unit: u16) {
        if self.len == CHUNK {
            self.flush();
        }
        self.buf[self.len] = unit;
        self.len += 1;
    }

    /// Emit buffered text. The slice passed to the sink ends with a NUL.
    pub fn flush(&mut self) {
        if self.len == 0 {
            return;
        }
        self.buf[self.len] = 0;
        (self.sink)(&mut self.buf[..=self.len]);
        self.len = 0;
    }
}

impl<F: FnMut(&mut [u16])> Write for Ucs2Writer<F> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if c == '\n' {
                self.push(u16::from(b'\r'));
            }
            let mut units = [0u16; 2];
            match c.encode_utf16(&mut units) {
                [unit] => self.push(*unit),
                _ => self.push(u16::from(b'?')),
            }
        }
        Ok(())
    }
}

fn console_backend(args: fmt::Arguments<'_>) {
    let con_out = CON_OUT.load(Ordering::Acquire);
    if con_out.is_null() {
        return;
    }
    let mut writer = Ucs2Writer::new(|chunk: &mut [u16]| {
        // SAFETY: `console_init` only stores the ConOut protocol of the live
        // system table, and `chunk` is NUL-terminated.
        unsafe {
            let _ = ((*con_out).output_string)(con_out, chunk.as_mut_ptr());
        }
    });
    let _ = writer.write_fmt(args);
    let _ = writer.write_str("\n");
    writer.flush();
}

/// Route klog output to the firmware console.
///
/// Leaves the early backend in place if the system table has no `ConOut`.
///
/// # Safety
///
/// `st` must be the live system table and boot services must not have been
/// exited while logging continues.
pub unsafe fn console_init(st: &efi::SystemTable) -> bool {
    if st.con_out.is_null() {
        return false;
    }
    CON_OUT.store(st.con_out, Ordering::Release);
    klog_register_backend(console_backend);
    true
}
