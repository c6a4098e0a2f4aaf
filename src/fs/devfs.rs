//! devfs - Device Filesystem
//!
//! /dev ファイルシステムの実装
//! キャラクタデバイスを名前とデバイス番号の両方から開けるようにする

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use log::debug;

use super::chrdev::{ChrdevRegions, DeviceNumber, DeviceRegion};
use super::uaccess::{UserSliceReader, UserSliceWriter};
use crate::error::{DevError, DevResult};

/// inode番号 (Newtype)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct DevInode(u64);

impl DevInode {
    pub const ROOT: Self = Self(1);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

}

/// エントリの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// ディレクトリ
    Directory,
    /// キャラクタデバイス
    Character,
}

/// デバイス操作トレイト（file_operations）
///
/// `offset` はセッションごとのファイル位置。ハンドルが処理したバイト数だけ
/// 進めるが、シークには使わない。
pub trait DeviceOps: Send + Sync {
    /// デバイスを開く
    fn open(&self, dev: DeviceNumber) -> DevResult<()>;

    /// デバイスを閉じる
    fn release(&self, dev: DeviceNumber) -> DevResult<()>;

    /// 読み取り
    fn read(&self, dst: &mut dyn UserSliceWriter, count: usize, offset: u64) -> DevResult<usize>;

    /// 書き込み
    fn write(&self, src: &dyn UserSliceReader, offset: u64) -> DevResult<usize>;
}

/// デバイスエントリ
pub struct DevEntry {
    /// inode
    pub inode: DevInode,
    /// 名前
    pub name: String,
    /// 種類
    pub device_type: DeviceType,
    /// デバイス番号の領域
    pub region: Option<DeviceRegion>,
    /// デバイス操作
    pub ops: Option<Arc<dyn DeviceOps>>,
    /// 子エントリ (ディレクトリの場合)
    pub children: BTreeMap<String, DevEntry>,
}

impl DevEntry {
    /// ディレクトリエントリを作成
    pub fn directory(inode: DevInode, name: &str) -> Self {
        Self {
            inode,
            name: String::from(name),
            device_type: DeviceType::Directory,
            region: None,
            ops: None,
            children: BTreeMap::new(),
        }
    }

    /// キャラクタデバイスエントリを作成
    pub fn character_device(
        inode: DevInode,
        name: &str,
        region: DeviceRegion,
        ops: Arc<dyn DeviceOps>,
    ) -> Self {
        Self {
            inode,
            name: String::from(name),
            device_type: DeviceType::Character,
            region: Some(region),
            ops: Some(ops),
            children: BTreeMap::new(),
        }
    }

    /// ディレクトリかどうか
    pub fn is_directory(&self) -> bool {
        self.device_type == DeviceType::Directory
    }
}

/// devfs ファイルシステム
pub struct DevFs {
    /// ルートエントリ
    root: spin::RwLock<DevEntry>,
    /// 次のinode番号
    next_inode: AtomicU64,
    /// デバイス番号の確保状況
    chrdev: ChrdevRegions,
}

impl DevFs {
    /// 新しいdevfsを作成
    pub fn new() -> Self {
        Self {
            root: spin::RwLock::new(DevEntry::directory(DevInode::ROOT, "")),
            next_inode: AtomicU64::new(2),
            chrdev: ChrdevRegions::new(),
        }
    }

    /// デバイス番号の確保状況
    pub fn chrdev(&self) -> &ChrdevRegions {
        &self.chrdev
    }

    /// 次のinode番号を取得
    fn allocate_inode(&self) -> DevInode {
        DevInode::new(self.next_inode.fetch_add(1, Ordering::AcqRel))
    }

    /// キャラクタデバイスを登録（cdev_add 相当）
    ///
    /// 同名のエントリや、領域が重なるデバイスがあれば `AlreadyExists`。
    pub fn register_char_device(
        &self,
        name: &str,
        region: &DeviceRegion,
        ops: Arc<dyn DeviceOps>,
    ) -> DevResult<DevInode> {
        if name.is_empty() || name.contains('/') {
            return Err(DevError::InvalidArgument);
        }

        let mut root = self.root.write();
        if root.children.contains_key(name) {
            return Err(DevError::AlreadyExists);
        }
        let overlaps = root
            .children
            .values()
            .filter_map(|e| e.region.as_ref())
            .any(|r| r.base().major() == region.base().major());
        if overlaps {
            return Err(DevError::AlreadyExists);
        }

        let inode = self.allocate_inode();
        let entry = DevEntry::character_device(inode, name, region.clone(), ops);
        root.children.insert(String::from(name), entry);

        debug!(
            "devfs: registered {} as {}:{} (+{})",
            name,
            region.base().major(),
            region.base().minor(),
            region.count()
        );
        Ok(inode)
    }

    /// デバイスを登録解除
    pub fn unregister_device(&self, name: &str) -> DevResult<()> {
        let mut root = self.root.write();
        root.children.remove(name).ok_or(DevError::NotFound)?;
        debug!("devfs: unregistered {}", name);
        Ok(())
    }

    /// パスからエントリを検索
    fn lookup_entry<'a>(entry: &'a DevEntry, path: &str) -> Option<&'a DevEntry> {
        let mut current = entry;

        for component in path.split('/').filter(|s| !s.is_empty()) {
            match current.children.get(component) {
                Some(child) => current = child,
                None => return None,
            }
        }

        Some(current)
    }

    /// エントリを検索
    pub fn lookup(&self, path: &str) -> DevResult<DevInode> {
        let root = self.root.read();
        Self::lookup_entry(&root, path)
            .map(|e| e.inode)
            .ok_or(DevError::NotFound)
    }

    /// ディレクトリ一覧を取得
    pub fn readdir(&self, path: &str) -> DevResult<Vec<String>> {
        let root = self.root.read();
        let entry = Self::lookup_entry(&root, path).ok_or(DevError::NotFound)?;

        if !entry.is_directory() {
            return Err(DevError::NotDevice);
        }

        Ok(entry.children.keys().cloned().collect())
    }

    /// パスでデバイスを開く（領域の先頭番号で開いたものとする）
    pub fn open(&self, path: &str) -> DevResult<(Arc<dyn DeviceOps>, DeviceNumber)> {
        let root = self.root.read();
        let entry = Self::lookup_entry(&root, path).ok_or(DevError::NotFound)?;

        match (&entry.ops, &entry.region) {
            (Some(ops), Some(region)) => Ok((Arc::clone(ops), region.base())),
            _ => Err(DevError::NotDevice),
        }
    }

    /// デバイス番号で開く（領域内の任意のマイナー番号を受け付ける）
    pub fn open_number(&self, dev: DeviceNumber) -> DevResult<Arc<dyn DeviceOps>> {
        let root = self.root.read();
        root.children
            .values()
            .find(|e| e.region.as_ref().is_some_and(|r| r.contains(dev)))
            .and_then(|e| e.ops.clone())
            .ok_or(DevError::NotFound)
    }
}

impl Default for DevFs {
    fn default() -> Self {
        Self::new()
    }
}

/// グローバル devfs インスタンス
static DEVFS: spin::Once<DevFs> = spin::Once::new();

/// devfs を取得
pub fn devfs() -> &'static DevFs {
    DEVFS.call_once(DevFs::new)
}

/// デバイスファイルハンドル（セッション）
pub struct DevFileHandle {
    ops: Arc<dyn DeviceOps>,
    number: DeviceNumber,
    position: AtomicU64,
}

impl DevFileHandle {
    /// グローバル devfs 上のパスを開く
    pub fn open(path: &str) -> DevResult<Self> {
        Self::open_in(devfs(), path)
    }

    pub fn open_in(fs: &DevFs, path: &str) -> DevResult<Self> {
        let (ops, number) = fs.open(path)?;
        Self::attach(ops, number)
    }

    pub fn open_number_in(fs: &DevFs, number: DeviceNumber) -> DevResult<Self> {
        let ops = fs.open_number(number)?;
        Self::attach(ops, number)
    }

    fn attach(ops: Arc<dyn DeviceOps>, number: DeviceNumber) -> DevResult<Self> {
        ops.open(number)?;

        Ok(Self {
            ops,
            number,
            position: AtomicU64::new(0),
        })
    }

    pub fn read(&self, dst: &mut dyn UserSliceWriter, max_bytes: usize) -> DevResult<usize> {
        let pos = self.position.load(Ordering::Acquire);
        let bytes_read = self.ops.read(dst, max_bytes, pos)?;
        self.position.fetch_add(bytes_read as u64, Ordering::AcqRel);
        Ok(bytes_read)
    }

    pub fn write(&self, src: &dyn UserSliceReader) -> DevResult<usize> {
        let pos = self.position.load(Ordering::Acquire);
        let bytes_written = self.ops.write(src, pos)?;
        self.position.fetch_add(bytes_written as u64, Ordering::AcqRel);
        Ok(bytes_written)
    }

    /// 開いたときのデバイス番号
    pub fn device_number(&self) -> DeviceNumber {
        self.number
    }

    /// 現在のファイル位置
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }
}

impl Drop for DevFileHandle {
    fn drop(&mut self) {
        let _ = self.ops.release(self.number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::uaccess::{UserSlice, UserSliceMut};
    use core::sync::atomic::AtomicUsize;

    /// 開閉回数を数えるだけのデバイス
    #[derive(Default)]
    struct CountingDevice {
        opens: AtomicUsize,
        releases: AtomicUsize,
    }

    impl DeviceOps for CountingDevice {
        fn open(&self, _dev: DeviceNumber) -> DevResult<()> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn release(&self, _dev: DeviceNumber) -> DevResult<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn read(&self, dst: &mut dyn UserSliceWriter, _count: usize, _offset: u64) -> DevResult<usize> {
            dst.copy_from(b"c")?;
            Ok(1)
        }

        fn write(&self, src: &dyn UserSliceReader, _offset: u64) -> DevResult<usize> {
            Ok(src.len())
        }
    }

    fn register(fs: &DevFs, name: &str) -> (Arc<CountingDevice>, DeviceRegion) {
        let device = Arc::new(CountingDevice::default());
        let region = fs.chrdev().alloc_region(0, 10, name).unwrap();
        fs.register_char_device(name, &region, device.clone()).unwrap();
        (device, region)
    }

    #[test]
    fn test_register_and_readdir() {
        let fs = DevFs::new();
        register(&fs, "counter");

        let entries = fs.readdir("").unwrap();
        assert_eq!(entries, alloc::vec![String::from("counter")]);
        assert!(fs.lookup("/counter").is_ok());
        assert_eq!(fs.readdir("counter"), Err(DevError::NotDevice));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let fs = DevFs::new();
        let (device, region) = register(&fs, "dup");
        assert!(matches!(
            fs.register_char_device("dup", &region, device.clone()),
            Err(DevError::AlreadyExists)
        ));
        assert!(matches!(
            fs.register_char_device("other", &region, device),
            Err(DevError::AlreadyExists)
        ));
    }

    #[test]
    fn test_open_by_any_minor_in_region() {
        let fs = DevFs::new();
        let (device, region) = register(&fs, "counter");
        let major = region.base().major();

        let handle = DevFileHandle::open_number_in(&fs, DeviceNumber::new(major, 7)).unwrap();
        assert_eq!(handle.device_number().minor(), 7);
        assert!(matches!(
            DevFileHandle::open_number_in(&fs, DeviceNumber::new(major, 10)),
            Err(DevError::NotFound)
        ));
        drop(handle);
        assert_eq!(device.opens.load(Ordering::SeqCst), 1);
        assert_eq!(device.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_position_advances() {
        let fs = DevFs::new();
        register(&fs, "counter");

        let handle = DevFileHandle::open_in(&fs, "counter").unwrap();
        assert_eq!(handle.write(&UserSlice::new(b"abcd")).unwrap(), 4);
        let mut out = [0u8; 1];
        handle.read(&mut UserSliceMut::new(&mut out), 1).unwrap();
        assert_eq!(handle.position(), 5);
    }

    #[test]
    fn test_shared_handle_position_counts_every_transfer() {
        let fs = DevFs::new();
        register(&fs, "counter");
        let handle = Arc::new(DevFileHandle::open_in(&fs, "counter").unwrap());

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = Arc::clone(&handle);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        handle.write(&UserSlice::new(b"ab")).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(handle.position(), 4 * 500 * 2);
    }

    #[test]
    fn test_unregister_then_open_fails() {
        let fs = DevFs::new();
        register(&fs, "gone");
        fs.unregister_device("gone").unwrap();
        assert!(matches!(DevFileHandle::open_in(&fs, "gone"), Err(DevError::NotFound)));
        assert_eq!(fs.unregister_device("gone"), Err(DevError::NotFound));
    }

    #[test]
    fn test_directory_is_not_openable() {
        let fs = DevFs::new();
        assert!(matches!(fs.open(""), Err(DevError::NotDevice)));
    }
}
