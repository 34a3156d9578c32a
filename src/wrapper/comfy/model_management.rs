//! comfy.model_management

use log::warn;
use pyo3::{types::PyAnyMethods, Bound, PyAny, PyResult, Python};

/// 中间结果所在的设备
///
/// ```python,ignore
/// import comfy.model_management
/// device = comfy.model_management.intermediate_device()
/// ```
///
/// 脱离 ComfyUI 运行时回退到 `torch.device("cpu")`
pub fn intermediate_device(py: Python<'_>) -> PyResult<Bound<'_, PyAny>> {
    match py
        .import("comfy.model_management")
        .and_then(|module| module.call_method0("intermediate_device"))
    {
        Ok(device) => Ok(device),
        Err(e) => {
            warn!("[ResolutionMaster] comfy.model_management unavailable, using cpu: {e}");
            py.import("torch")?.getattr("device")?.call1(("cpu",))
        }
    }
}

/// 将 torch.Tensor 移动到指定设备
pub fn to_device<'py>(
    tensor: &Bound<'py, PyAny>,
    device: &Bound<'py, PyAny>,
) -> PyResult<Bound<'py, PyAny>> {
    tensor.call_method1("to", (device,))
}
