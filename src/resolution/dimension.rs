//! 尺寸解析
//!
//! 手动输入的宽高与从图片张量形状检测到的宽高之间的取舍。

use log::{debug, error};

use crate::{
    error::Error,
    resolution::dimension_cache::{DimensionCache, DimensionCacheEntry},
};

/// 从图片张量形状中检测到的尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedDimensions {
    pub width: u32,
    pub height: u32,
}

/// 根据张量形状读取宽高
///
/// - 4 维: (batch, height, width, channel)
/// - 3 维: (height, width, channel)
/// - 其他维度: 忽略, 返回 None
pub fn detect_from_shape(shape: &[usize]) -> Result<Option<DetectedDimensions>, Error> {
    let (height, width) = match shape {
        [_batch, height, width, _channels] => (*height, *width),
        [height, width, _channels] => (*height, *width),
        _ => return Ok(None),
    };

    let to_u32 = |value: usize| {
        u32::try_from(value)
            .map_err(|_| Error::InvalidTensorShape(format!("dimension {value} out of range")))
    };

    Ok(Some(DetectedDimensions {
        width: to_u32(width)?,
        height: to_u32(height)?,
    }))
}

/// 解析结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedDimensions {
    pub width: u32,
    pub height: u32,
    /// 本次检测并写入缓存的尺寸
    pub detected: Option<DimensionCacheEntry>,
}

/// 尺寸解析器
pub struct DimensionResolver<'a> {
    cache: &'a DimensionCache,
}

impl<'a> DimensionResolver<'a> {
    pub fn new(cache: &'a DimensionCache) -> Self {
        Self { cache }
    }

    /// 解析最终宽高
    ///
    /// 仅当输入宽高与检测到的宽高完全相同时才采用检测值, 否则视为用户手动覆盖。
    /// 该规则无法区分"恰好相同的手动值"与"未改动的值"。
    /// 检测过程中的任何错误只记录日志, 回退到原始宽高。
    pub fn resolve(
        &self,
        width: u32,
        height: u32,
        auto_detect: bool,
        image_shape: Option<Result<Vec<usize>, Error>>,
        unique_id: Option<&str>,
    ) -> ResolvedDimensions {
        let original = ResolvedDimensions {
            width,
            height,
            detected: None,
        };

        let Some(image_shape) = image_shape.filter(|_| auto_detect) else {
            return original;
        };

        match self.detect(width, height, image_shape, unique_id) {
            Ok(Some(resolved)) => resolved,
            Ok(None) => original,
            Err(e) => {
                error!("[ResolutionMaster] Error in auto-detection: {e}");
                original
            }
        }
    }

    fn detect(
        &self,
        width: u32,
        height: u32,
        image_shape: Result<Vec<usize>, Error>,
        unique_id: Option<&str>,
    ) -> Result<Option<ResolvedDimensions>, Error> {
        let shape = image_shape?;
        let Some(detected) = detect_from_shape(&shape)? else {
            debug!("[ResolutionMaster] unsupported image rank {}, ignored", shape.len());
            return Ok(None);
        };

        let entry = DimensionCacheEntry::now(detected.width, detected.height)?;
        let mut cached = None;
        if let Some(unique_id) = unique_id.filter(|id| !id.is_empty()) {
            self.cache.set(unique_id, entry)?;
            cached = Some(entry);
        }

        let resolved = if width == detected.width && height == detected.height {
            ResolvedDimensions {
                width: detected.width,
                height: detected.height,
                detected: cached,
            }
        } else {
            debug!(
                "[ResolutionMaster] manual override {width}x{height}, detected {}x{}",
                detected.width, detected.height
            );
            ResolvedDimensions {
                width,
                height,
                detected: cached,
            }
        };
        Ok(Some(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_shape() -> anyhow::Result<()> {
        assert_eq!(
            detect_from_shape(&[1, 768, 1024, 3])?,
            Some(DetectedDimensions {
                width: 1024,
                height: 768
            })
        );
        assert_eq!(
            detect_from_shape(&[600, 800, 3])?,
            Some(DetectedDimensions {
                width: 800,
                height: 600
            })
        );
        assert_eq!(detect_from_shape(&[600, 800])?, None);
        assert_eq!(detect_from_shape(&[1, 1, 600, 800, 3])?, None);
        Ok(())
    }

    #[test]
    fn test_rank4_axis_order_keeps_manual_values() -> anyhow::Result<()> {
        let cache = DimensionCache::new(8);
        let resolver = DimensionResolver::new(&cache);

        let resolved = resolver.resolve(768, 1024, true, Some(Ok(vec![1, 768, 1024, 3])), Some("7"));
        assert_eq!((resolved.width, resolved.height), (768, 1024));

        let cached = cache.get("7")?.expect("cache entry");
        assert_eq!((cached.width, cached.height), (1024, 768));
        assert!(cached.timestamp > 0.0);
        assert_eq!(resolved.detected, Some(cached));
        Ok(())
    }

    #[test]
    fn test_rank3_matching_adopts_detected() -> anyhow::Result<()> {
        let cache = DimensionCache::new(8);
        let resolver = DimensionResolver::new(&cache);

        let resolved = resolver.resolve(800, 600, true, Some(Ok(vec![600, 800, 3])), Some("3"));
        assert_eq!((resolved.width, resolved.height), (800, 600));
        assert!(cache.get("3")?.is_some());
        Ok(())
    }

    #[test]
    fn test_malformed_rank_keeps_original() -> anyhow::Result<()> {
        let cache = DimensionCache::new(8);
        let resolver = DimensionResolver::new(&cache);

        let resolved = resolver.resolve(512, 512, true, Some(Ok(vec![64, 64])), Some("1"));
        assert_eq!((resolved.width, resolved.height), (512, 512));
        assert_eq!(resolved.detected, None);
        assert!(cache.is_empty()?);
        Ok(())
    }

    #[test]
    fn test_shape_error_is_swallowed() -> anyhow::Result<()> {
        let cache = DimensionCache::new(8);
        let resolver = DimensionResolver::new(&cache);

        let shape = Err(Error::InvalidTensorShape("object has no shape".to_string()));
        let resolved = resolver.resolve(640, 480, true, Some(shape), Some("1"));
        assert_eq!((resolved.width, resolved.height), (640, 480));
        assert!(cache.is_empty()?);
        Ok(())
    }

    #[test]
    fn test_without_unique_id_skips_cache() -> anyhow::Result<()> {
        let cache = DimensionCache::new(8);
        let resolver = DimensionResolver::new(&cache);

        let resolved = resolver.resolve(800, 600, true, Some(Ok(vec![600, 800, 3])), None);
        assert_eq!((resolved.width, resolved.height), (800, 600));
        assert_eq!(resolved.detected, None);
        assert!(cache.is_empty()?);
        Ok(())
    }

    #[test]
    fn test_auto_detect_disabled() -> anyhow::Result<()> {
        let cache = DimensionCache::new(8);
        let resolver = DimensionResolver::new(&cache);

        let resolved = resolver.resolve(512, 768, false, Some(Ok(vec![600, 800, 3])), Some("5"));
        assert_eq!((resolved.width, resolved.height), (512, 768));
        assert!(cache.get("5")?.is_none());
        Ok(())
    }
}
