//! 統一エラーハンドリングモジュール
//!
//! バッファデバイスとデバイス層で共通に使うエラー型。
//! ディスパッチ層へは負の errno として渡す。

use core::fmt;

/// デバイス層のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevError {
    /// エントリが見つからない
    NotFound,
    /// デバイスではない
    NotDevice,
    /// 既に存在する
    AlreadyExists,
    /// 無効な引数
    InvalidArgument,
    /// 動的メジャー番号が枯渇
    RegionExhausted,
    /// モジュールが未ロード
    NotLoaded,
    /// モジュールが既にロード済み
    AlreadyLoaded,
    /// ユーザー空間との転送失敗（コピーイン/コピーアウト）
    TransferFault,
}

// Linux 互換 errno
const EFAULT: isize = 14;
const EBUSY: isize = 16;
const EEXIST: isize = 17;
const ENODEV: isize = 19;
const EINVAL: isize = 22;
const ENOENT: isize = 2;

impl DevError {
    /// 負の errno 値（ssize_t 戻り値用）
    pub const fn errno(&self) -> isize {
        match self {
            DevError::NotFound => -ENOENT,
            DevError::NotDevice | DevError::NotLoaded => -ENODEV,
            DevError::AlreadyExists => -EEXIST,
            DevError::InvalidArgument => -EINVAL,
            DevError::RegionExhausted | DevError::AlreadyLoaded => -EBUSY,
            DevError::TransferFault => -EFAULT,
        }
    }
}

impl fmt::Display for DevError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevError::NotFound => write!(f, "entry not found"),
            DevError::NotDevice => write!(f, "not a device"),
            DevError::AlreadyExists => write!(f, "entry already exists"),
            DevError::InvalidArgument => write!(f, "invalid argument"),
            DevError::RegionExhausted => write!(f, "no free device numbers"),
            DevError::NotLoaded => write!(f, "module not loaded"),
            DevError::AlreadyLoaded => write!(f, "module already loaded"),
            DevError::TransferFault => write!(f, "bad address in user transfer"),
        }
    }
}

/// デバイス層の結果型エイリアス
pub type DevResult<T> = Result<T, DevError>;

/// `DevResult<usize>` を ssize_t 相当へ変換
pub fn to_ssize(result: DevResult<usize>) -> isize {
    match result {
        Ok(n) => n as isize,
        Err(e) => e.errno(),
    }
}
