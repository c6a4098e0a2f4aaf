//! uaccess - ユーザー空間との転送境界
//!
//! copy_from_user / copy_to_user に相当する抽象。
//! デバイス実装は具体的なメモリ表現を知らず、この2つのトレイト越しにだけ
//! 呼び出し元のバッファへ触れる。

use crate::error::{DevError, DevResult};

/// コピーイン元（write の入力）
pub trait UserSliceReader {
    /// 呼び出し元が申告したバイト数
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 先頭 `dst.len()` バイトを `dst` へコピー
    ///
    /// 読み出せない場合は `TransferFault`。
    fn copy_into(&self, dst: &mut [u8]) -> DevResult<()>;
}

/// コピーアウト先（read の出力）
pub trait UserSliceWriter {
    /// 書き込み可能なバイト数
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `src` 全体を先頭から書き込む
    ///
    /// 全体を受け取れない場合は `TransferFault`。途中までコピーされていても
    /// 部分的な成功は報告しない。
    fn copy_from(&mut self, src: &[u8]) -> DevResult<()>;
}

/// カーネルから見えるユーザー入力領域
#[derive(Debug, Clone, Copy)]
pub struct UserSlice<'a> {
    data: &'a [u8],
}

impl<'a> UserSlice<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl UserSliceReader for UserSlice<'_> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn copy_into(&self, dst: &mut [u8]) -> DevResult<()> {
        let src = self.data.get(..dst.len()).ok_or(DevError::TransferFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

/// カーネルから見えるユーザー出力領域
#[derive(Debug)]
pub struct UserSliceMut<'a> {
    data: &'a mut [u8],
}

impl<'a> UserSliceMut<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data }
    }
}

impl UserSliceWriter for UserSliceMut<'_> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn copy_from(&mut self, src: &[u8]) -> DevResult<()> {
        // 入る分だけはコピーされる（copy_to_user の残りバイト挙動）
        let fit = src.len().min(self.data.len());
        self.data[..fit].copy_from_slice(&src[..fit]);
        if fit < src.len() {
            return Err(DevError::TransferFault);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_in_prefix() {
        let src = UserSlice::new(b"hello world");
        let mut dst = [0u8; 5];
        src.copy_into(&mut dst).unwrap();
        assert_eq!(&dst, b"hello");
    }

    #[test]
    fn test_copy_in_short_source_faults() {
        let src = UserSlice::new(b"abc");
        let mut dst = [0u8; 4];
        assert_eq!(src.copy_into(&mut dst), Err(DevError::TransferFault));
    }

    #[test]
    fn test_copy_out_too_small_faults_after_partial_copy() {
        let mut out = [0u8; 2];
        let mut dst = UserSliceMut::new(&mut out);
        assert_eq!(dst.copy_from(b"xyz"), Err(DevError::TransferFault));
        assert_eq!(&out, b"xy");
    }

    #[test]
    fn test_copy_out_exact() {
        let mut out = [0u8; 3];
        UserSliceMut::new(&mut out).copy_from(b"xyz").unwrap();
        assert_eq!(&out, b"xyz");
    }
}
