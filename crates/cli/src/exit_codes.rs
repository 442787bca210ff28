//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `hkdecl` exit codes.
//! Exit codes are part of the shell contract: batch scripts that prepare
//! declarations every morning branch on them.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success (report written, or dry run completed)     |
//! | 1    | General error (unspecified)                        |
//! | 2    | Usage error (bad args, missing config or source)   |
//! | 3    | Invalid config (TOML parse or validation failure)  |
//! | 4    | Source read error (file or sheet missing/unparsable) |
//! | 5    | Brand gate failed (not identified or mismatched)   |
//! | 6    | Report render or write failed                      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in [`decl_exit_code`]

use hkdecl_recon::DeclError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable config file, no path for a source.
pub const EXIT_USAGE: u8 = 2;

/// Config file did not parse or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// A source file or sheet could not be read.
pub const EXIT_SOURCE_READ: u8 = 4;

/// Brand cross-check failed; no report was produced.
pub const EXIT_BRAND_GATE: u8 = 5;

/// The report could not be rendered or written.
pub const EXIT_RENDER: u8 = 6;

/// Map an engine/io error to its exit code.
pub fn decl_exit_code(err: &DeclError) -> u8 {
    match err {
        DeclError::ConfigParse(_) | DeclError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        DeclError::SourceRead { .. } => EXIT_SOURCE_READ,
        DeclError::BrandNotIdentified { .. } | DeclError::BrandMismatch { .. } => EXIT_BRAND_GATE,
        DeclError::Render(_) | DeclError::Io(_) => EXIT_RENDER,
    }
}
