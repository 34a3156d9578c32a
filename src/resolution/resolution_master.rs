//! Resolution Master
//!
//! 输出宽、高、缩放系数、批次大小与空 latent, 可从输入图片自动检测尺寸。
//!
//! 依赖:
//! - python: torch

use candle_core::{Device, Tensor};
use log::{debug, error, warn};
use pyo3::{
    exceptions::PyRuntimeError,
    prelude::*,
    types::{PyDict, PyString, PyType},
};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    config::ResolutionMasterConfig,
    core::{
        category::CATEGORY_AZ_TOOLKIT,
        node_base::{InputSpec, InputType},
        PromptServer,
    },
    error::Error,
    resolution::{
        dimension::{DimensionResolver, ResolvedDimensions},
        dimension_cache::{DimensionCache, DimensionCacheEntry},
        latent::{empty_latent, LatentType},
        rescale::{RescaleMode, RescalePolicy},
    },
    wrapper::{
        comfy::model_management::{intermediate_device, to_device},
        comfyui::types::{HIDDEN_UNIQUE_ID, NODE_FLOAT, NODE_INT, NODE_LATENT},
        torch::tensor::{tensor_shape, TensorWrapper},
    },
};

/// 检测尺寸推送事件
pub const EVENT_DIMENSIONS: &str = "resolution_master.dimensions";

/// 前端界面模式, 后端不使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, Display)]
pub enum ResolutionMode {
    #[strum(to_string = "Manual")]
    Manual,
    #[strum(to_string = "Manual Sliders")]
    ManualSliders,
    #[strum(to_string = "Common Resolutions")]
    CommonResolutions,
    #[strum(to_string = "Aspect Ratios")]
    AspectRatios,
}

/// 一次调用的输入
#[derive(Debug)]
pub struct ResolutionRequest {
    pub width: u32,
    pub height: u32,
    pub auto_detect: bool,
    /// 仅在开启自动检测且存在图片时读取
    pub image_shape: Option<Result<Vec<usize>, Error>>,
    pub unique_id: Option<String>,
    pub rescale_value: Option<f64>,
    pub latent_type: LatentType,
    pub batch_size: usize,
}

/// 一次调用的输出
#[derive(Debug)]
pub struct ResolutionOutput {
    pub width: u32,
    pub height: u32,
    pub rescale_factor: f64,
    pub batch_size: usize,
    pub latent: Tensor,
    /// 写入缓存的检测尺寸
    pub detected: Option<DimensionCacheEntry>,
}

// 分辨率大师
#[pyclass(subclass)]
pub struct ResolutionMaster {
    device: Device,
    intermediate_device: Option<Py<PyAny>>,
    cache: DimensionCache,
    config: ResolutionMasterConfig,
}

impl PromptServer for ResolutionMaster {}

#[pymethods]
impl ResolutionMaster {
    #[new]
    fn new(py: Python<'_>) -> PyResult<Self> {
        let intermediate_device = intermediate_device(py)?.unbind();
        Ok(Self::with_cache(
            DimensionCache::global(),
            ResolutionMasterConfig::global().clone(),
            Some(intermediate_device),
        ))
    }

    #[classattr]
    #[pyo3(name = "INPUT_IS_LIST")]
    fn input_is_list() -> bool {
        false
    }

    #[classattr]
    #[pyo3(name = "RETURN_TYPES")]
    fn return_types() -> (
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static str,
    ) {
        (NODE_INT, NODE_INT, NODE_FLOAT, NODE_INT, NODE_LATENT)
    }

    #[classattr]
    #[pyo3(name = "RETURN_NAMES")]
    fn return_names() -> (
        &'static str,
        &'static str,
        &'static str,
        &'static str,
        &'static str,
    ) {
        ("width", "height", "rescale_factor", "batch_size", "latent")
    }

    #[classattr]
    #[pyo3(name = "OUTPUT_IS_LIST")]
    fn output_is_list() -> (bool, bool, bool, bool, bool) {
        (false, false, false, false, false)
    }

    #[classattr]
    #[pyo3(name = "CATEGORY")]
    const CATEGORY: &'static str = CATEGORY_AZ_TOOLKIT;

    #[classattr]
    #[pyo3(name = "DESCRIPTION")]
    fn description() -> &'static str {
        "Width, height, rescale factor and an empty latent. Optionally detects the size of a connected image."
    }

    #[classattr]
    #[pyo3(name = "FUNCTION")]
    const FUNCTION: &'static str = "main";

    #[classmethod]
    #[pyo3(name = "INPUT_TYPES")]
    fn input_types(_cls: &Bound<'_, PyType>) -> PyResult<Py<PyDict>> {
        Python::with_gil(|py| {
            let config = ResolutionMasterConfig::global();
            let dimension = |default: u32| {
                InputType::int()
                    .default(default)
                    .min(config.min_dimension)
                    .max(config.max_dimension)
                    .step(config.dimension_step)
            };

            InputSpec::new()
                .with_required(
                    "mode",
                    InputType::list(ResolutionMode::iter().map(|m| m.to_string()).collect())
                        .default(ResolutionMode::Manual.to_string()),
                )
                .with_required(
                    "latent_type",
                    InputType::list(LatentType::options())
                        .default(LatentType::default().to_string())
                        .tooltip("latent_4x8: 4 channels, 1/8 size. latent_128x16: 128 channels, 1/16 size"),
                )
                .with_required("width", dimension(config.default_width))
                .with_required("height", dimension(config.default_height))
                .with_required(
                    "auto_detect",
                    InputType::bool()
                        .default(false)
                        .label_on("enabled")
                        .label_off("disabled")
                        .tooltip("Detect width and height from input_image"),
                )
                .with_required(
                    "batch_size",
                    InputType::int()
                        .default(1usize)
                        .min(1usize)
                        .max(config.max_batch_size),
                )
                .with_optional(
                    "rescale_mode",
                    InputType::string().default(RescaleMode::Resolution.to_string()),
                )
                .with_optional(
                    "rescale_value",
                    InputType::float().default(1.0).min(0.0).step(0.001),
                )
                .with_optional("input_image", InputType::image())
                .with_hidden("unique_id", InputType::hidden(HIDDEN_UNIQUE_ID))
                .build(py)
        })
    }

    #[pyo3(
        name = "main",
        signature = (
            mode,
            width,
            height,
            auto_detect = false,
            rescale_mode = None,
            rescale_value = None,
            input_image = None,
            unique_id = None,
            latent_type = None,
            batch_size = 1
        )
    )]
    #[allow(clippy::too_many_arguments)]
    fn main<'py>(
        &self,
        py: Python<'py>,
        mode: &str,
        width: u32,
        height: u32,
        auto_detect: bool,
        rescale_mode: Option<String>,
        rescale_value: Option<Bound<'py, PyAny>>,
        input_image: Option<Bound<'py, PyAny>>,
        unique_id: Option<Bound<'py, PyAny>>,
        latent_type: Option<String>,
        batch_size: usize,
    ) -> PyResult<(u32, u32, f64, usize, Bound<'py, PyDict>)> {
        debug!(
            "[ResolutionMaster] mode: {}, rescale_mode: {}",
            mode.parse::<ResolutionMode>()
                .map(|m| m.to_string())
                .unwrap_or_else(|_| format!("{mode} (unknown)")),
            parse_rescale_mode(rescale_mode.as_deref()),
        );

        let results = self.execute(
            py,
            width,
            height,
            auto_detect,
            rescale_value,
            input_image,
            unique_id,
            latent_type,
            batch_size,
        );

        match results {
            Ok(v) => Ok(v),
            Err(e) => {
                error!("[ResolutionMaster] error, {e}");
                if let Err(e) = self.send_error(py, "ResolutionMaster".to_string(), e.to_string()) {
                    error!("[ResolutionMaster] send error failed, {e}");
                };
                Err(PyErr::new::<PyRuntimeError, _>(e.to_string()))
            }
        }
    }
}

impl ResolutionMaster {
    /// 使用指定缓存创建节点
    ///
    /// intermediate_device 为 None 时 latent 保留在 CPU 上
    pub fn with_cache(
        cache: DimensionCache,
        config: ResolutionMasterConfig,
        intermediate_device: Option<Py<PyAny>>,
    ) -> Self {
        Self {
            device: Device::Cpu,
            intermediate_device,
            cache,
            config,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn execute<'py>(
        &self,
        py: Python<'py>,
        width: u32,
        height: u32,
        auto_detect: bool,
        rescale_value: Option<Bound<'py, PyAny>>,
        input_image: Option<Bound<'py, PyAny>>,
        unique_id: Option<Bound<'py, PyAny>>,
        latent_type: Option<String>,
        batch_size: usize,
    ) -> Result<(u32, u32, f64, usize, Bound<'py, PyDict>), Error> {
        let image_shape = if auto_detect {
            input_image.as_ref().map(tensor_shape)
        } else {
            None
        };

        let unique_id = match unique_id {
            Some(id) => Some(id.str()?.to_string()),
            None => None,
        };

        let request = ResolutionRequest {
            width,
            height,
            auto_detect,
            image_shape,
            unique_id,
            rescale_value: parse_rescale_value(rescale_value.as_ref())?,
            latent_type: LatentType::parse_or_default(latent_type.as_deref()),
            batch_size,
        };
        let unique_id = request.unique_id.clone();

        let output = self.resolve(request)?;

        if let (Some(entry), Some(unique_id)) = (output.detected, unique_id) {
            if let Err(e) = self.notify_dimensions(py, &unique_id, &entry) {
                debug!("[ResolutionMaster] notify dimensions failed, {e}");
            }
        }

        let samples = TensorWrapper::<f32>::from_tensor(output.latent).to_py_tensor(py)?;
        let samples = match &self.intermediate_device {
            Some(device) => to_device(&samples, device.bind(py))?,
            None => samples,
        };
        let latent = PyDict::new(py);
        latent.set_item("samples", samples)?;

        Ok((
            output.width,
            output.height,
            output.rescale_factor,
            output.batch_size,
            latent,
        ))
    }

    /// 解析尺寸、缩放系数并生成 latent
    pub fn resolve(&self, request: ResolutionRequest) -> Result<ResolutionOutput, Error> {
        let ResolvedDimensions {
            width,
            height,
            detected,
        } = DimensionResolver::new(&self.cache).resolve(
            request.width,
            request.height,
            request.auto_detect,
            request.image_shape,
            request.unique_id.as_deref(),
        );

        let rescale_factor = RescalePolicy::new(self.config.target_resolution).rescale_factor(
            request.rescale_value,
            width,
            height,
        );

        let batch_size = if request.batch_size == 0 {
            warn!("[ResolutionMaster] batch_size 0, using 1");
            1
        } else {
            request.batch_size
        };

        let latent = empty_latent(request.latent_type, batch_size, width, height, &self.device)?;

        Ok(ResolutionOutput {
            width,
            height,
            rescale_factor,
            batch_size,
            latent,
            detected,
        })
    }

    /// 推送检测到的尺寸到前端
    fn notify_dimensions(
        &self,
        py: Python<'_>,
        unique_id: &str,
        entry: &DimensionCacheEntry,
    ) -> Result<(), Error> {
        let data = PyDict::new(py);
        data.set_item("node_id", unique_id)?;
        data.set_item("width", entry.width)?;
        data.set_item("height", entry.height)?;
        data.set_item("timestamp", entry.timestamp)?;
        self.send_event(py, EVENT_DIMENSIONS, data)?;
        Ok(())
    }
}

/// 解析前端传入的 rescale_value
///
/// None 或空字符串视为未提供
fn parse_rescale_value(value: Option<&Bound<'_, PyAny>>) -> Result<Option<f64>, Error> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.is_none() {
        return Ok(None);
    }

    if let Ok(text) = value.downcast::<PyString>() {
        let text = text.to_str()?.trim().to_string();
        if text.is_empty() {
            return Ok(None);
        }
        return text
            .parse::<f64>()
            .map(Some)
            .map_err(|e| Error::InvalidParameter(format!("rescale_value {text}, {e}")));
    }

    Ok(Some(value.extract::<f64>()?))
}

/// rescale_mode 仅用于日志, 未知值原样输出
fn parse_rescale_mode(rescale_mode: Option<&str>) -> String {
    match rescale_mode {
        None => "none".to_string(),
        Some(mode) => mode
            .parse::<RescaleMode>()
            .map(|m| m.to_string())
            .unwrap_or_else(|_| format!("{mode} (unknown)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(cache: &DimensionCache) -> ResolutionMaster {
        ResolutionMaster::with_cache(cache.clone(), ResolutionMasterConfig::default(), None)
    }

    fn request(width: u32, height: u32) -> ResolutionRequest {
        ResolutionRequest {
            width,
            height,
            auto_detect: false,
            image_shape: None,
            unique_id: None,
            rescale_value: None,
            latent_type: LatentType::Latent4x8,
            batch_size: 1,
        }
    }

    #[test]
    fn test_manual_defaults() -> anyhow::Result<()> {
        let cache = DimensionCache::new(4);
        let output = node(&cache).resolve(request(512, 512))?;

        assert_eq!((output.width, output.height), (512, 512));
        assert!((output.rescale_factor - 2.8125).abs() < 1e-6);
        assert_eq!(output.batch_size, 1);
        assert_eq!(output.latent.dims4()?, (1, 4, 64, 64));
        assert!(output.detected.is_none());
        Ok(())
    }

    #[test]
    fn test_rescale_value_wins() -> anyhow::Result<()> {
        let cache = DimensionCache::new(4);
        let mut req = request(1024, 576);
        req.rescale_value = Some(1.5);

        let output = node(&cache).resolve(req)?;
        assert_eq!(output.rescale_factor, 1.5);
        Ok(())
    }

    #[test]
    fn test_auto_detect_writes_cache() -> anyhow::Result<()> {
        let cache = DimensionCache::new(4);
        let mut req = request(768, 1024);
        req.auto_detect = true;
        req.image_shape = Some(Ok(vec![1, 768, 1024, 3]));
        req.unique_id = Some("7".to_string());

        let output = node(&cache).resolve(req)?;
        assert_eq!((output.width, output.height), (768, 1024));
        assert_eq!(output.latent.dims4()?, (1, 4, 128, 96));

        let entry = cache.get("7")?.expect("cache entry");
        assert_eq!((entry.width, entry.height), (1024, 768));
        assert_eq!(output.detected, Some(entry));
        Ok(())
    }

    #[test]
    fn test_latent_128x16_batch() -> anyhow::Result<()> {
        let cache = DimensionCache::new(4);
        let mut req = request(256, 256);
        req.latent_type = LatentType::Latent128x16;
        req.batch_size = 2;

        let output = node(&cache).resolve(req)?;
        assert_eq!(output.latent.dims4()?, (2, 128, 16, 16));
        assert_eq!(output.batch_size, 2);
        Ok(())
    }

    #[test]
    fn test_zero_batch_and_zero_width() -> anyhow::Result<()> {
        let cache = DimensionCache::new(4);
        let mut req = request(0, 512);
        req.batch_size = 0;

        let output = node(&cache).resolve(req)?;
        assert_eq!(output.batch_size, 1);
        assert_eq!(output.rescale_factor, 1.0);
        assert_eq!(output.latent.dims4()?, (1, 4, 64, 0));
        Ok(())
    }

    #[test]
    fn test_mode_names() -> anyhow::Result<()> {
        let modes: Vec<String> = ResolutionMode::iter().map(|m| m.to_string()).collect();
        assert_eq!(
            modes,
            vec![
                "Manual",
                "Manual Sliders",
                "Common Resolutions",
                "Aspect Ratios"
            ]
        );
        assert_eq!(
            "Manual Sliders".parse::<ResolutionMode>()?,
            ResolutionMode::ManualSliders
        );
        assert_eq!(parse_rescale_mode(Some("megapixels")), "megapixels");
        assert_eq!(parse_rescale_mode(Some("other")), "other (unknown)");
        Ok(())
    }

    #[test]
    fn test_parse_rescale_value() -> anyhow::Result<()> {
        pyo3::prepare_freethreaded_python();
        Python::with_gil(|py| -> anyhow::Result<()> {
            assert_eq!(parse_rescale_value(None)?, None);

            let none = py.None().into_bound(py);
            assert_eq!(parse_rescale_value(Some(&none))?, None);

            let empty = PyString::new(py, " ").into_any();
            assert_eq!(parse_rescale_value(Some(&empty))?, None);

            let text = PyString::new(py, "1.25").into_any();
            assert_eq!(parse_rescale_value(Some(&text))?, Some(1.25));

            let value = 0.75f64.into_pyobject(py)?.into_any();
            assert_eq!(parse_rescale_value(Some(&value))?, Some(0.75));

            let int = 2i64.into_pyobject(py)?.into_any();
            assert_eq!(parse_rescale_value(Some(&int))?, Some(2.0));

            let bad = PyString::new(py, "abc").into_any();
            assert!(matches!(
                parse_rescale_value(Some(&bad)),
                Err(Error::InvalidParameter(_))
            ));
            Ok(())
        })
    }
}
