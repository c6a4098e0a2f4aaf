// ============================================================================
// src/io/mod.rs - 診断出力
// ============================================================================

pub mod hexdump;
pub mod log;
