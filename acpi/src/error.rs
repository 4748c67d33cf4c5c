//! Diagnostics produced while locating and patching HEST.
//!
//! None of these abort the run. Firmware applications that fix up tables
//! must not break the boot flow they are part of, so every diagnostic is
//! logged where it happens and folded into the final report.

use core::fmt;

use hestfix_abi::AllocError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// Neither the current nor the legacy RSDP is published.
    DirectoryNotFound,
    /// The RSDT was walked to the end without a signature match.
    TableNotFound { signature: [u8; 4] },
    /// A record with a type the walker cannot step over ended the scan.
    UnexpectedRecordType { index: u32, record_type: u16 },
    /// A record's declared size runs past the end of the table.
    RecordOutOfBounds { index: u32 },
    /// The Error Status Address block for one record could not be allocated.
    AllocationFailed { index: u32, error: AllocError },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryNotFound => write!(f, "no ACPI root pointer published"),
            Self::TableNotFound { signature } => {
                write!(f, "table '{}' not found", hestfix_lib::bytes_as_str(signature))
            }
            Self::UnexpectedRecordType { index, record_type } => {
                write!(f, "stopped at non-GHES entry {} (type {})", index, record_type)
            }
            Self::RecordOutOfBounds { index } => {
                write!(f, "entry {} extends past the end of the table", index)
            }
            Self::AllocationFailed { index, error } => {
                write!(f, "failed to allocate memory for GHES entry {} ({})", index, error)
            }
        }
    }
}
