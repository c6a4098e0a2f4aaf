// ============================================================================
// src/module.rs - バッファデバイスのロード/アンロード
// ============================================================================
//!
//! 共有バッファを /dev に公開する。
//!
//! ## 流れ
//! 1. 共有バッファを1つだけ作成
//! 2. デバイス番号領域を確保（`MINOR_COUNT` 個）
//! 3. キャラクタデバイスとして登録（失敗時は領域を解放して戻す）
//!
//! 全セッションは同じ `Arc<SharedBuffer>` を参照する。アンロード後も
//! 開いたままのセッションが閉じるまでバッファは解放されない。

use alloc::sync::Arc;
use log::{debug, info, warn};
use spin::Mutex;

use crate::buffer::SharedBuffer;
use crate::config::{DEVICE_NAME, FIRST_MINOR, MINOR_COUNT};
use crate::error::{DevError, DevResult};
use crate::fs::chrdev::{DeviceNumber, DeviceRegion};
use crate::fs::devfs::{DevFileHandle, DevFs, DeviceOps, devfs};
use crate::fs::uaccess::{UserSliceReader, UserSliceWriter};

// ============================================================================
// file_operations
// ============================================================================

impl DeviceOps for SharedBuffer {
    fn open(&self, dev: DeviceNumber) -> DevResult<()> {
        debug!("+ buffer_open {}:{}", dev.major(), dev.minor());
        Ok(())
    }

    fn release(&self, dev: DeviceNumber) -> DevResult<()> {
        debug!("+ buffer_release {}:{}", dev.major(), dev.minor());
        Ok(())
    }

    // 書き込みは常にオフセット0からの全体置き換え
    fn read(&self, dst: &mut dyn UserSliceWriter, count: usize, _offset: u64) -> DevResult<usize> {
        SharedBuffer::read(self, dst, count)
    }

    fn write(&self, src: &dyn UserSliceReader, _offset: u64) -> DevResult<usize> {
        Ok(SharedBuffer::write(self, src)?.accepted)
    }
}

// ============================================================================
// モジュール本体
// ============================================================================

/// ロード済みのバッファデバイス
pub struct BufferModule {
    buffer: Arc<SharedBuffer>,
    region: DeviceRegion,
}

impl BufferModule {
    /// `fs` にバッファデバイスを登録する
    pub fn load(fs: &DevFs) -> DevResult<Self> {
        Self::load_as(fs, DEVICE_NAME)
    }

    /// 名前を指定して登録する
    pub fn load_as(fs: &DevFs, name: &str) -> DevResult<Self> {
        let buffer = Arc::new(SharedBuffer::new());

        let region = fs.chrdev().alloc_region(FIRST_MINOR, MINOR_COUNT, name)?;

        if let Err(e) = fs.register_char_device(name, &region, buffer.clone()) {
            warn!("[FAIL] {}: registration failed: {}", name, e);
            fs.chrdev().release_region(&region)?;
            return Err(e);
        }

        let base = region.base();
        info!(
            "[OK] {} registered: major {}, minor {} (+{})",
            name,
            base.major(),
            base.minor(),
            region.count()
        );
        Ok(Self { buffer, region })
    }

    /// 登録解除と番号領域の解放
    ///
    /// 登録解除に失敗しても番号領域は必ず解放し、最初のエラーを返す。
    pub fn unload(self, fs: &DevFs) -> DevResult<()> {
        let name = self.region.name();
        let unregistered = fs.unregister_device(name);
        if let Err(e) = unregistered {
            warn!("[FAIL] {}: unregister failed: {}", name, e);
        }
        let released = fs.chrdev().release_region(&self.region);

        unregistered.and(released)?;
        info!("[OK] {} unregistered", name);
        Ok(())
    }

    pub fn buffer(&self) -> &Arc<SharedBuffer> {
        &self.buffer
    }

    pub fn region(&self) -> &DeviceRegion {
        &self.region
    }

    /// 先頭のデバイス番号
    pub fn device_number(&self) -> DeviceNumber {
        self.region.base()
    }
}

// ============================================================================
// グローバルインスタンス
// ============================================================================

/// ロード済みモジュール（高々1つ）
static MODULE: Mutex<Option<BufferModule>> = Mutex::new(None);

/// グローバル devfs にバッファデバイスを登録
pub fn module_init() -> DevResult<()> {
    let mut slot = MODULE.lock();
    if slot.is_some() {
        return Err(DevError::AlreadyLoaded);
    }

    info!("[INIT] Loading {}", DEVICE_NAME);
    *slot = Some(BufferModule::load(devfs())?);
    Ok(())
}

/// グローバル devfs から登録解除
pub fn module_exit() -> DevResult<()> {
    let module = MODULE.lock().take().ok_or(DevError::NotLoaded)?;
    module.unload(devfs())
}

/// ロード済みかどうか
pub fn is_loaded() -> bool {
    MODULE.lock().is_some()
}

/// 新しいセッションを開く
pub fn open_session() -> DevResult<DevFileHandle> {
    if !is_loaded() {
        return Err(DevError::NotLoaded);
    }
    DevFileHandle::open(DEVICE_NAME)
}

/// セッションを閉じる
pub fn release_session(handle: DevFileHandle) {
    drop(handle);
}
