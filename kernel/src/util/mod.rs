// =============================================================================
// SliceOS: Kernel Utilities
// =============================================================================
//
//   panic.rs: panic handler (bare metal only; hosted builds use std's)
// =============================================================================

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod panic;
