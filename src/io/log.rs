// ============================================================================
// src/io/log.rs - Kernel Logging System using the `log` crate
// ============================================================================
//!
//! カーネル用ロギングシステム。
//!
//! ## 機能
//! - `log`クレートを使用した標準的なログインターフェース
//! - 固定行数のリングに記録（dmesg 相当、古い行から捨てる）
//! - コンパイル時のログレベルフィルタリング
//! - マルチコア安全なSpinlock保護
//!
//! ## 使用方法
//! ```ignore
//! use log::{info, debug};
//!
//! bufdev::io::log::init().ok();
//! info!("システム起動");
//! let lines = bufdev::io::log::drain();
//! ```

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

use crate::config::{LOG_RING_LINES, MAX_LOG_LEVEL};

// ============================================================================
// ロガー状態管理
// ============================================================================

/// ロガーの初期化状態
static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// 現在のログレベル（実行時変更可能）
static CURRENT_LOG_LEVEL: AtomicU8 = AtomicU8::new(LevelFilter::Info as u8);

/// ログリング
static RING: Mutex<VecDeque<String>> = Mutex::new(VecDeque::new());

// ============================================================================
// リングロガー実装
// ============================================================================

/// カーネル用リングロガー
struct KernelLogger;

impl KernelLogger {
    /// ログレベルのプレフィックスを取得
    fn level_prefix(level: Level) -> &'static str {
        match level {
            Level::Error => "[ERROR] ",
            Level::Warn => "[WARN]  ",
            Level::Info => "[INFO]  ",
            Level::Debug => "[DEBUG] ",
            Level::Trace => "[TRACE] ",
        }
    }

    fn push_line(line: String) {
        let mut ring = RING.lock();
        if ring.len() == LOG_RING_LINES {
            ring.pop_front();
        }
        ring.push_back(line);
    }
}

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= current_log_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = match record.module_path() {
            Some(module) => alloc::format!(
                "{}[{}] {}",
                Self::level_prefix(record.level()),
                module,
                record.args()
            ),
            None => alloc::format!("{}{}", Self::level_prefix(record.level()), record.args()),
        };
        Self::push_line(line);
    }

    fn flush(&self) {}
}

/// グローバルロガーインスタンス
static LOGGER: KernelLogger = KernelLogger;

// ============================================================================
// 公開API
// ============================================================================

/// ロギングシステムを初期化
///
/// 2回目以降は `SetLoggerError` を返す。
pub fn init() -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    set_log_level(MAX_LOG_LEVEL);
    LOGGER_INITIALIZED.store(true, Ordering::SeqCst);
    Ok(())
}

/// 実行時にログレベルを変更
pub fn set_log_level(level: LevelFilter) {
    CURRENT_LOG_LEVEL.store(level as u8, Ordering::SeqCst);
    log::set_max_level(level);
}

/// 現在のログレベルを取得
pub fn current_log_level() -> LevelFilter {
    LevelFilter::iter()
        .nth(CURRENT_LOG_LEVEL.load(Ordering::Relaxed) as usize)
        .unwrap_or(LevelFilter::Info)
}

/// ロガーが初期化済みかどうか
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.load(Ordering::Relaxed)
}

/// 記録済みの行をすべて取り出す
pub fn drain() -> Vec<String> {
    RING.lock().drain(..).collect()
}
