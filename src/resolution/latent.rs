//! 空 latent 生成

use candle_core::{DType, Device, Tensor};
use log::warn;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::Error;

/// latent 类型, 按下游模型族区分通道数与下采样倍数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, EnumIter, Display)]
pub enum LatentType {
    /// 4 通道, 8 倍下采样 (SD1.x / SDXL / Flux 等)
    #[default]
    #[strum(serialize = "latent_4x8")]
    Latent4x8,
    /// 128 通道, 16 倍下采样
    #[strum(serialize = "latent_128x16")]
    Latent128x16,
}

impl LatentType {
    /// 下拉选项
    pub fn options() -> Vec<String> {
        LatentType::iter().map(|t| t.to_string()).collect()
    }

    /// 解析 latent 类型, 未知值回退到 latent_4x8
    pub fn parse_or_default(name: Option<&str>) -> Self {
        match name {
            None => LatentType::default(),
            Some(name) => name.parse::<LatentType>().unwrap_or_else(|_| {
                warn!("[ResolutionMaster] unknown latent_type {name}, using latent_4x8");
                LatentType::default()
            }),
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            LatentType::Latent4x8 => 4,
            LatentType::Latent128x16 => 128,
        }
    }

    pub fn downscale(&self) -> usize {
        match self {
            LatentType::Latent4x8 => 8,
            LatentType::Latent128x16 => 16,
        }
    }

    /// latent 形状 (batch, channels, height / n, width / n), 整除向下取整
    pub fn shape(
        &self,
        batch_size: usize,
        width: u32,
        height: u32,
    ) -> (usize, usize, usize, usize) {
        let factor = self.downscale();
        (
            batch_size,
            self.channels(),
            height as usize / factor,
            width as usize / factor,
        )
    }
}

/// 创建全零 latent
pub fn empty_latent(
    latent_type: LatentType,
    batch_size: usize,
    width: u32,
    height: u32,
    device: &Device,
) -> Result<Tensor, Error> {
    let shape = latent_type.shape(batch_size, width, height);
    let latent = Tensor::zeros(shape, DType::F32, device)?;
    Ok(latent)
}
