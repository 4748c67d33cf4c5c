#![no_std]

#[cfg(test)]
extern crate std;

pub mod alignment;
pub mod klog;
pub mod string;

pub use alignment::align_up_u64;
pub use klog::{KlogLevel, klog_init, klog_register_backend, klog_set_level};
pub use string::{bytes_as_str, ucs2_to_ascii};
