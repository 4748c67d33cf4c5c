//! Load-options configuration.
//!
//! The application takes no required arguments. An optional line of
//! whitespace-separated `key=value` tokens tunes the patch run:
//!
//! | token              | effect                                        |
//! |--------------------|-----------------------------------------------|
//! | `hest.strict=off`  | step over known non-GHES records              |
//! | `hest.dry_run=on`  | report eligible records, allocate nothing     |
//! | `hest.block_kib=N` | Error Status Address block size in KiB        |
//! | `log=LEVEL`        | klog level (`error` .. `trace`)               |
//!
//! Unknown tokens are ignored and malformed values keep the default.

use hestfix_acpi::hest::{ERROR_STATUS_BLOCK_SIZE, PatchOptions, Strictness};
use hestfix_lib::KlogLevel;

const DEFAULT_STRICTNESS: Strictness = Strictness::Strict;
const DEFAULT_DRY_RUN: bool = false;
const DEFAULT_BLOCK_SIZE: u64 = ERROR_STATUS_BLOCK_SIZE;
const DEFAULT_LOG_LEVEL: KlogLevel = KlogLevel::Info;

/// Largest accepted `hest.block_kib` value (16 MiB).
const MAX_BLOCK_KIB: u64 = 16 * 1024;

#[derive(Clone, Copy, Debug)]
pub struct PatchConfig {
    pub strictness: Strictness,
    pub dry_run: bool,
    pub block_size: u64,
    pub log_level: KlogLevel,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            strictness: DEFAULT_STRICTNESS,
            dry_run: DEFAULT_DRY_RUN,
            block_size: DEFAULT_BLOCK_SIZE,
            log_level: DEFAULT_LOG_LEVEL,
        }
    }
}

impl PatchConfig {
    pub fn patch_options(&self) -> PatchOptions {
        PatchOptions {
            strictness: self.strictness,
            dry_run: self.dry_run,
            block_size: self.block_size,
            ..PatchOptions::default()
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("on")
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("enabled")
        || value == "1"
    {
        Some(true)
    } else if value.eq_ignore_ascii_case("off")
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value.eq_ignore_ascii_case("disabled")
        || value == "0"
    {
        Some(false)
    } else {
        None
    }
}

pub fn config_from_load_options(options: Option<&str>) -> PatchConfig {
    let mut cfg = PatchConfig::default();
    let Some(options) = options else {
        return cfg;
    };

    for token in options.split_whitespace() {
        if let Some(value) = token.strip_prefix("hest.strict=") {
            if let Some(strict) = parse_bool(value) {
                cfg.strictness = if strict {
                    Strictness::Strict
                } else {
                    Strictness::SkipKnown
                };
            }
        } else if let Some(value) = token.strip_prefix("hest.dry_run=") {
            if let Some(dry_run) = parse_bool(value) {
                cfg.dry_run = dry_run;
            }
        } else if let Some(value) = token.strip_prefix("hest.block_kib=") {
            if let Ok(kib) = value.trim_end_matches("KiB").parse::<u64>() {
                if (1..=MAX_BLOCK_KIB).contains(&kib) {
                    cfg.block_size = kib * 1024;
                }
            }
        } else if let Some(value) = token.strip_prefix("log=") {
            if let Some(level) = KlogLevel::parse(value) {
                cfg.log_level = level;
            }
        }
    }
    cfg
}
