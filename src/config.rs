// ============================================================================
// src/config.rs - コンパイル時設定
// ============================================================================
//!
//! バッファデバイスの固定パラメータ。
//! 実行時に変更できる値はない（ログレベルを除く）。

use log::LevelFilter;

use crate::buffer::ReadPolicy;

// ============================================================================
// バッファ
// ============================================================================

/// 共有バッファの容量（バイト）
pub const BUFFER_CAPACITY: usize = 131_076;

/// read の既定ポリシー
#[cfg(not(feature = "clamp_reads"))]
pub const DEFAULT_READ_POLICY: ReadPolicy = ReadPolicy::WholeBuffer;

#[cfg(feature = "clamp_reads")]
pub const DEFAULT_READ_POLICY: ReadPolicy = ReadPolicy::Clamped;

// ============================================================================
// デバイス登録
// ============================================================================

/// デバイス名（/dev 以下のノード名）
pub const DEVICE_NAME: &str = "my_buffer_device";

/// 最初のマイナー番号
pub const FIRST_MINOR: u16 = 0;

/// 確保するマイナー番号の数
pub const MINOR_COUNT: u16 = 10;

/// 動的メジャー番号の探索範囲（上端から下向きに探す）
pub const DYNAMIC_MAJOR_FIRST: u16 = 254;
pub const DYNAMIC_MAJOR_LAST: u16 = 234;

// ============================================================================
// ログ
// ============================================================================

/// コンパイル時のログレベル（featureで変更可能）
#[cfg(feature = "verbose_logging")]
pub const MAX_LOG_LEVEL: LevelFilter = LevelFilter::Trace;

#[cfg(not(feature = "verbose_logging"))]
pub const MAX_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// リングロガーが保持する行数
pub const LOG_RING_LINES: usize = 256;

/// ヘックスダンプ1行あたりのバイト数
pub const HEXDUMP_ROW_BYTES: usize = 16;

/// ログへダンプする最大バイト数（超過分は1行の要約にする）
pub const HEXDUMP_MAX_BYTES: usize = 256;
