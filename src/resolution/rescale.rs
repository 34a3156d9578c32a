//! 缩放系数
//!
//! 前端计算的 rescale_value 优先; 未提供时后端按 1080p 像素数兜底计算。

use log::warn;
use pyo3::pyfunction;
use strum_macros::{Display, EnumString};

/// 16:9 宽高比
const WIDESCREEN_ASPECT: f64 = 16.0 / 9.0;

/// 前端缩放模式, 仅用于日志
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RescaleMode {
    /// 手动倍数
    Manual,
    /// 目标 "p" 分辨率
    Resolution,
    /// 目标百万像素
    Megapixels,
}

/// "p" 分辨率对应的 16:9 像素数, 例如 1080 => 1920 * 1080
pub fn pixels_for_resolution(target_p: f64) -> f64 {
    (target_p * WIDESCREEN_ASPECT) * target_p
}

/// 将当前像素数缩放到目标像素数所需的等比系数
///
/// 当前像素为 0 时返回 None
pub fn scale_from_pixels(target_pixels: f64, width: u32, height: u32) -> Option<f64> {
    let current_pixels = width as f64 * height as f64;
    if current_pixels <= 0.0 {
        return None;
    }
    Some((target_pixels / current_pixels).sqrt())
}

/// 缩放到目标 "p" 分辨率的系数
#[pyfunction]
pub fn resolution_scale(target_p: f64, width: u32, height: u32) -> f64 {
    scale_from_pixels(pixels_for_resolution(target_p), width, height).unwrap_or(1.0)
}

/// 缩放到目标百万像素的系数
#[pyfunction]
pub fn megapixels_scale(target_megapixels: f64, width: u32, height: u32) -> f64 {
    scale_from_pixels(target_megapixels * 1_000_000.0, width, height).unwrap_or(1.0)
}

/// 缩放系数策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescalePolicy {
    target_resolution: u32,
}

impl RescalePolicy {
    pub fn new(target_resolution: u32) -> Self {
        Self { target_resolution }
    }

    /// 计算输出的缩放系数
    ///
    /// 1. rescale_value 存在时原样透传
    /// 2. 否则 sqrt(target_pixels / (width * height))
    /// 3. 宽或高为 0 时返回 1.0
    pub fn rescale_factor(&self, rescale_value: Option<f64>, width: u32, height: u32) -> f64 {
        if let Some(value) = rescale_value {
            return value;
        }

        let target_pixels = pixels_for_resolution(self.target_resolution as f64);
        match scale_from_pixels(target_pixels, width, height) {
            Some(factor) => factor,
            None => {
                warn!("[ResolutionMaster] zero pixel resolution {width}x{height}, rescale factor 1.0");
                1.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_against_1080p() -> anyhow::Result<()> {
        let policy = RescalePolicy::new(1080);

        let factor = policy.rescale_factor(None, 512, 512);
        let expected = ((1080.0_f64 * (16.0 / 9.0)) * 1080.0 / (512.0 * 512.0)).sqrt();
        assert!((factor - expected).abs() < 1e-9);
        assert!((factor - 2.8125).abs() < 1e-6);

        assert!((policy.rescale_factor(None, 1920, 1080) - 1.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_supplied_value_passes_through() -> anyhow::Result<()> {
        let policy = RescalePolicy::new(1080);
        assert_eq!(policy.rescale_factor(Some(1.37), 512, 512), 1.37);
        assert_eq!(policy.rescale_factor(Some(0.5), 0, 0), 0.5);
        Ok(())
    }

    #[test]
    fn test_zero_pixels_fallback() -> anyhow::Result<()> {
        let policy = RescalePolicy::new(1080);
        assert_eq!(policy.rescale_factor(None, 0, 512), 1.0);
        assert_eq!(resolution_scale(720.0, 512, 0), 1.0);
        Ok(())
    }

    #[test]
    fn test_frontend_formulas() -> anyhow::Result<()> {
        assert!((resolution_scale(1080.0, 1920, 1080) - 1.0).abs() < 1e-9);
        assert!((resolution_scale(720.0, 1920, 1080) - 720.0 / 1080.0).abs() < 1e-9);
        assert!((megapixels_scale(1.0, 1000, 1000) - 1.0).abs() < 1e-9);
        assert!((megapixels_scale(4.0, 1000, 1000) - 2.0).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_rescale_mode_parse() -> anyhow::Result<()> {
        assert_eq!("resolution".parse::<RescaleMode>()?, RescaleMode::Resolution);
        assert_eq!("megapixels".parse::<RescaleMode>()?, RescaleMode::Megapixels);
        assert_eq!(RescaleMode::Manual.to_string(), "manual");
        assert!("unknown".parse::<RescaleMode>().is_err());
        Ok(())
    }
}
