// ============================================================================
// src/buffer.rs - 共有単一スロットバッファ
// ============================================================================
//!
//! デバイスを開いた全セッションが共有する、固定容量のバイト領域。
//!
//! ## 契約
//! - write は常にオフセット0からの全体上書き（追記なし）
//! - 容量を超える入力は先頭 `BUFFER_CAPACITY` バイトに切り詰める
//! - read は最後に成功した write の内容を返す
//!
//! ## 同期
//! `(storage, valid_length)` は `spin::RwLock` で保護する。
//! ストレージは2面持ち、write は非公開側へコピーしてから面を切り替える。
//! コピーイン失敗時に公開中のスナップショットは一切変化しない。

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use log::{debug, trace, warn};
use spin::RwLock;

use crate::config::{BUFFER_CAPACITY, DEFAULT_READ_POLICY};
use crate::error::DevResult;
use crate::fs::uaccess::{UserSliceReader, UserSliceWriter};
use crate::io::hexdump;

/// read が返すバイト数の決め方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// 要求サイズを無視し、常に有効長すべてを返す
    WholeBuffer,
    /// `min(max_bytes, valid_length)` を返す
    Clamped,
}

/// write の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// 呼び出し元が渡したバイト数
    pub requested: usize,
    /// 実際に格納したバイト数
    pub accepted: usize,
}

impl WriteOutcome {
    /// 容量超過で切り詰められたか
    pub const fn is_truncated(&self) -> bool {
        self.accepted < self.requested
    }

    /// 捨てられた末尾のバイト数
    pub const fn discarded(&self) -> usize {
        self.requested - self.accepted
    }
}

/// 統計スナップショット
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    /// 成功した read の回数
    pub reads: u64,
    /// 成功した write の回数
    pub writes: u64,
    /// そのうち容量超過で切り詰めた回数
    pub truncated_writes: u64,
    /// コピーイン/コピーアウトの失敗回数
    pub transfer_faults: u64,
}

/// 保護される状態
struct BufferState {
    /// ストレージ2面（`active` が公開中）
    slots: [Box<[u8]>; 2],
    active: usize,
    valid_length: usize,
}

impl BufferState {
    fn payload(&self) -> &[u8] {
        &self.slots[self.active][..self.valid_length]
    }
}

/// 共有バッファ
pub struct SharedBuffer {
    state: RwLock<BufferState>,
    policy: ReadPolicy,
    reads: AtomicU64,
    writes: AtomicU64,
    truncated_writes: AtomicU64,
    transfer_faults: AtomicU64,
}

impl SharedBuffer {
    /// 既定ポリシーで作成
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_READ_POLICY)
    }

    pub fn with_policy(policy: ReadPolicy) -> Self {
        let state = BufferState {
            slots: [
                alloc::vec![0u8; BUFFER_CAPACITY].into_boxed_slice(),
                alloc::vec![0u8; BUFFER_CAPACITY].into_boxed_slice(),
            ],
            active: 0,
            valid_length: 0,
        };

        Self {
            state: RwLock::new(state),
            policy,
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            truncated_writes: AtomicU64::new(0),
            transfer_faults: AtomicU64::new(0),
        }
    }

    pub const fn capacity(&self) -> usize {
        BUFFER_CAPACITY
    }

    pub const fn policy(&self) -> ReadPolicy {
        self.policy
    }

    /// 現在の有効長
    pub fn valid_length(&self) -> usize {
        self.state.read().valid_length
    }

    /// 現在の内容のコピー
    pub fn snapshot(&self) -> Vec<u8> {
        self.state.read().payload().to_vec()
    }

    /// 入力でバッファ全体を置き換える
    ///
    /// 先頭 `min(src.len(), capacity)` バイトを受け付け、その数を返す。
    /// コピーインに失敗した場合は状態を変えずに `TransferFault` を返す。
    pub fn write(&self, src: &dyn UserSliceReader) -> DevResult<WriteOutcome> {
        let requested = src.len();
        let accepted = requested.min(BUFFER_CAPACITY);

        let mut state = self.state.write();
        let staging = state.active ^ 1;

        if let Err(e) = src.copy_into(&mut state.slots[staging][..accepted]) {
            self.transfer_faults.fetch_add(1, Ordering::Relaxed);
            debug!("write: copy-in of {} bytes failed: {}", accepted, e);
            return Err(e);
        }

        state.active = staging;
        state.valid_length = accepted;
        self.writes.fetch_add(1, Ordering::Relaxed);

        let outcome = WriteOutcome {
            requested,
            accepted,
        };
        if outcome.is_truncated() {
            self.truncated_writes.fetch_add(1, Ordering::Relaxed);
            warn!(
                "write: truncated {} bytes to capacity {} ({} discarded)",
                requested,
                BUFFER_CAPACITY,
                outcome.discarded()
            );
        }
        debug!("write: buffer size {}", accepted);
        if log::log_enabled!(log::Level::Trace) {
            hexdump::log_dump("+", state.payload());
        }

        Ok(outcome)
    }

    /// 最後に書き込まれた内容を `dst` へコピー
    ///
    /// `ReadPolicy::WholeBuffer` では `max_bytes` を無視して有効長すべてを
    /// コピーする。`dst` が受け取れなければ `TransferFault`。
    pub fn read(&self, dst: &mut dyn UserSliceWriter, max_bytes: usize) -> DevResult<usize> {
        let state = self.state.read();
        let count = match self.policy {
            ReadPolicy::WholeBuffer => state.valid_length,
            ReadPolicy::Clamped => max_bytes.min(state.valid_length),
        };

        if let Err(e) = dst.copy_from(&state.payload()[..count]) {
            self.transfer_faults.fetch_add(1, Ordering::Relaxed);
            debug!(
                "read: not all was copied ({} bytes into {}): {}",
                count,
                dst.len(),
                e
            );
            return Err(e);
        }

        self.reads.fetch_add(1, Ordering::Relaxed);
        trace!("read: {} bytes (requested {})", count, max_bytes);
        Ok(count)
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            truncated_writes: self.truncated_writes.load(Ordering::Relaxed),
            transfer_faults: self.transfer_faults.load(Ordering::Relaxed),
        }
    }
}

impl Default for SharedBuffer {
    fn default() -> Self {
        Self::new()
    }
}
