// ============================================================================
// src/lib.rs - 共有バッファ キャラクタデバイス
// ============================================================================
//!
//! 1つの固定容量バッファをキャラクタデバイスとして公開する。
//! どのプロセスが開いても同じスロットを共有し、write は内容を置き換え、
//! read は最後に書かれたバイト列を返す。
//!
//! ## 構成
//! - [`buffer`]: 共有バッファ本体（上書き・切り詰め・有効長の管理）
//! - [`fs`]: デバイス番号、devfs 登録、セッション、ユーザー転送境界
//! - [`module`]: ロード/アンロードとグローバルインスタンス
//! - [`io`]: ロガーとヘックスダンプ

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod buffer;
pub mod config;
pub mod error;
pub mod fs;
pub mod io;
pub mod module;

pub use buffer::{BufferStats, ReadPolicy, SharedBuffer, WriteOutcome};
pub use error::{DevError, DevResult};
pub use fs::{DevFileHandle, DeviceNumber, UserSlice, UserSliceMut};
pub use module::{BufferModule, module_exit, module_init, open_session, release_session};
