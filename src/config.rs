//! 节点配置
//!
//! 默认值与 ComfyUI 前端控件保持一致, 可通过环境变量 `RESOLUTION_MASTER_CONFIG`
//! 指定 JSON 文件覆盖部分字段。

use std::{fs, path::Path, sync::OnceLock};

use log::{info, warn};
use serde::Deserialize;

use crate::error::Error;

/// 配置文件路径的环境变量
pub const CONFIG_ENV: &str = "RESOLUTION_MASTER_CONFIG";

static CONFIG: OnceLock<ResolutionMasterConfig> = OnceLock::new();

/// ResolutionMaster 配置
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResolutionMasterConfig {
    /// 后端兜底缩放的目标分辨率, 以 "p" 计 (1080 => 1920x1080 像素数)
    pub target_resolution: u32,
    /// 尺寸缓存的最大条目数
    pub cache_capacity: usize,
    pub default_width: u32,
    pub default_height: u32,
    pub min_dimension: u32,
    pub max_dimension: u32,
    pub dimension_step: u32,
    pub max_batch_size: usize,
}

impl Default for ResolutionMasterConfig {
    fn default() -> Self {
        Self {
            target_resolution: 1080,
            cache_capacity: 256,
            default_width: 512,
            default_height: 512,
            min_dimension: 0,
            max_dimension: 32768,
            dimension_step: 64,
            max_batch_size: 4096,
        }
    }
}

impl ResolutionMasterConfig {
    /// 全局配置, 首次访问时加载
    pub fn global() -> &'static ResolutionMasterConfig {
        CONFIG.get_or_init(Self::from_env)
    }

    /// 从环境变量指定的文件加载, 失败时回退到默认配置
    pub fn from_env() -> Self {
        let Ok(path) = std::env::var(CONFIG_ENV) else {
            return Self::default();
        };

        match Self::from_file(&path) {
            Ok(config) => {
                info!("[ResolutionMaster] loaded config from {path}");
                config
            }
            Err(e) => {
                warn!("[ResolutionMaster] invalid config {path}, using defaults: {e}");
                Self::default()
            }
        }
    }

    /// 读取 JSON 配置文件
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, Error> {
        let config: ResolutionMasterConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.min_dimension > self.max_dimension {
            return Err(Error::InvalidParameter(format!(
                "min_dimension {} > max_dimension {}",
                self.min_dimension, self.max_dimension
            )));
        }
        if self.cache_capacity == 0 {
            return Err(Error::InvalidParameter(
                "cache_capacity must be greater than 0".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(Error::InvalidParameter(
                "max_batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() -> anyhow::Result<()> {
        let config = ResolutionMasterConfig::from_json(r#"{"target_resolution": 720}"#)?;
        assert_eq!(config.target_resolution, 720);
        assert_eq!(config.cache_capacity, 256);
        assert_eq!(config.max_dimension, 32768);
        Ok(())
    }

    #[test]
    fn test_invalid_config() -> anyhow::Result<()> {
        assert!(ResolutionMasterConfig::from_json(r#"{"cache_capacity": 0}"#).is_err());
        assert!(
            ResolutionMasterConfig::from_json(r#"{"min_dimension": 64, "max_dimension": 8}"#)
                .is_err()
        );
        assert!(ResolutionMasterConfig::from_json("not json").is_err());
        Ok(())
    }
}
