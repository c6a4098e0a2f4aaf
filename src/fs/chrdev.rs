//! chrdev - キャラクタデバイス番号の管理
//!
//! alloc_chrdev_region / unregister_chrdev_region に相当する。
//! メジャー番号は動的範囲の上端から下向きに割り当てる。

use alloc::collections::BTreeMap;
use alloc::string::String;
use log::debug;
use spin::Mutex;

use crate::config::{DYNAMIC_MAJOR_FIRST, DYNAMIC_MAJOR_LAST};
use crate::error::{DevError, DevResult};

/// デバイス番号 (Newtype)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct DeviceNumber {
    major: u16,
    minor: u16,
}

impl DeviceNumber {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    pub const fn major(&self) -> u16 {
        self.major
    }

    pub const fn minor(&self) -> u16 {
        self.minor
    }

    pub const fn to_dev_t(&self) -> u32 {
        ((self.major as u32) << 16) | (self.minor as u32)
    }

    pub const fn from_dev_t(dev: u32) -> Self {
        Self {
            major: (dev >> 16) as u16,
            minor: dev as u16,
        }
    }
}

/// 連続したマイナー番号の確保領域
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRegion {
    base: DeviceNumber,
    count: u16,
    name: String,
}

impl DeviceRegion {
    /// 先頭のデバイス番号
    pub const fn base(&self) -> DeviceNumber {
        self.base
    }

    pub const fn count(&self) -> u16 {
        self.count
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `dev` がこの領域に含まれるか
    pub fn contains(&self, dev: DeviceNumber) -> bool {
        dev.major == self.base.major
            && dev.minor >= self.base.minor
            && dev.minor - self.base.minor < self.count
    }
}

/// デバイス番号の確保状況
pub struct ChrdevRegions {
    /// メジャー番号 → 領域
    regions: Mutex<BTreeMap<u16, DeviceRegion>>,
}

impl ChrdevRegions {
    pub const fn new() -> Self {
        Self {
            regions: Mutex::new(BTreeMap::new()),
        }
    }

    /// 空いている動的メジャー番号に `count` 個のマイナー番号を確保
    pub fn alloc_region(&self, first_minor: u16, count: u16, name: &str) -> DevResult<DeviceRegion> {
        if count == 0 || first_minor.checked_add(count - 1).is_none() {
            return Err(DevError::InvalidArgument);
        }

        let mut regions = self.regions.lock();
        let major = (DYNAMIC_MAJOR_LAST..=DYNAMIC_MAJOR_FIRST)
            .rev()
            .find(|major| !regions.contains_key(major))
            .ok_or(DevError::RegionExhausted)?;

        let region = DeviceRegion {
            base: DeviceNumber::new(major, first_minor),
            count,
            name: String::from(name),
        };
        regions.insert(major, region.clone());

        debug!(
            "chrdev: allocated {}:{}+{} for {}",
            major, first_minor, count, name
        );
        Ok(region)
    }

    /// 確保済みの領域を解放
    pub fn release_region(&self, region: &DeviceRegion) -> DevResult<()> {
        let mut regions = self.regions.lock();
        match regions.get(&region.base.major) {
            Some(existing) if existing == region => {
                regions.remove(&region.base.major);
                debug!("chrdev: released major {}", region.base.major);
                Ok(())
            }
            _ => Err(DevError::NotFound),
        }
    }

    /// 確保済み領域の数
    pub fn allocated(&self) -> usize {
        self.regions.lock().len()
    }
}

impl Default for ChrdevRegions {
    fn default() -> Self {
        Self::new()
    }
}
