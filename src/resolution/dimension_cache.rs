//! 检测尺寸缓存
//!
//! 前端按节点 id 读取自动检测到的图片尺寸, 键为字符串化的 unique_id,
//! 值为 `{width, height, timestamp}`。

use std::{
    sync::{Arc, OnceLock, RwLock},
    time::{SystemTime, UNIX_EPOCH},
};

use indexmap::IndexMap;
use pyo3::{pyfunction, types::PyAnyMethods, Bound, PyAny, PyResult, Python};
use serde::{Deserialize, Serialize};

use crate::{config::ResolutionMasterConfig, error::Error};

// 全局缓存实例, 由宿主集成层持有并注入到节点
static DIMENSION_CACHE: OnceLock<DimensionCache> = OnceLock::new();

/// 缓存项
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionCacheEntry {
    pub width: u32,
    pub height: u32,
    /// 秒级 Unix 时间戳, 与 python time.time() 一致
    pub timestamp: f64,
}

impl DimensionCacheEntry {
    /// 以当前时间创建缓存项
    pub fn now(width: u32, height: u32) -> Result<Self, Error> {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs_f64();
        Ok(Self {
            width,
            height,
            timestamp,
        })
    }
}

/// 有界尺寸缓存
///
/// 超出容量时淘汰最早写入的条目, 重复写入同一个键会刷新其顺序。
#[derive(Debug, Clone)]
pub struct DimensionCache {
    entries: Arc<RwLock<IndexMap<String, DimensionCacheEntry>>>,
    capacity: usize,
}

impl DimensionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(IndexMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// 进程级共享缓存的句柄
    pub fn global() -> DimensionCache {
        DIMENSION_CACHE
            .get_or_init(|| DimensionCache::new(ResolutionMasterConfig::global().cache_capacity))
            .clone()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 写入缓存
    pub fn set(&self, key: impl Into<String>, entry: DimensionCacheEntry) -> Result<(), Error> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| Error::LockError(e.to_string()))?;

        let key = key.into();
        entries.shift_remove(&key);
        entries.insert(key, entry);

        while entries.len() > self.capacity {
            entries.shift_remove_index(0);
        }
        Ok(())
    }

    /// 读取缓存
    pub fn get(&self, key: &str) -> Result<Option<DimensionCacheEntry>, Error> {
        let entries = self
            .entries
            .read()
            .map_err(|e| Error::LockError(e.to_string()))?;
        Ok(entries.get(key).copied())
    }

    pub fn len(&self) -> Result<usize, Error> {
        let entries = self
            .entries
            .read()
            .map_err(|e| Error::LockError(e.to_string()))?;
        Ok(entries.len())
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&self) -> Result<(), Error> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| Error::LockError(e.to_string()))?;
        entries.clear();
        Ok(())
    }
}

/// 读取节点的检测尺寸, 返回 `{width, height, timestamp}` 或 None
#[pyfunction]
pub fn get_detected_dimensions<'py>(
    py: Python<'py>,
    unique_id: Bound<'py, PyAny>,
) -> PyResult<Option<Bound<'py, PyAny>>> {
    let key = unique_id.str()?.to_string();
    let Some(entry) = DimensionCache::global().get(&key)? else {
        return Ok(None);
    };
    let dict = pythonize::pythonize(py, &entry).map_err(Error::from)?;
    Ok(Some(dict))
}

/// 清空检测尺寸缓存
#[pyfunction]
pub fn clear_detected_dimensions() -> PyResult<()> {
    DimensionCache::global().clear()?;
    Ok(())
}
