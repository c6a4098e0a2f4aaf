// ============================================================================
// src/fs/mod.rs - デバイス層
// ============================================================================
//!
//! # デバイス層
//!
//! - chrdev: キャラクタデバイス番号の領域確保
//! - devfs: /dev ノードの登録とセッション（ファイルハンドル）
//! - uaccess: ユーザー空間との転送境界

pub mod chrdev;
pub mod devfs;
pub mod uaccess;

pub use chrdev::{ChrdevRegions, DeviceNumber, DeviceRegion};
pub use devfs::{DevEntry, DevFileHandle, DevFs, DevInode, DeviceOps, DeviceType, devfs};
pub use uaccess::{UserSlice, UserSliceMut, UserSliceReader, UserSliceWriter};
