pub mod config;
pub mod core;
pub mod error;
pub mod wrapper;

pub mod resolution;

use pyo3::{
    pymodule,
    types::{PyDict, PyDictMethods, PyModule, PyModuleMethods},
    wrap_pyfunction, Bound, PyResult, Python,
};

use crate::{
    core::node::NodeRegister,
    resolution::dimension_cache::{clear_detected_dimensions, get_detected_dimensions},
};

/// 前端脚本目录
const WEB_DIRECTORY: &str = "./js";

/// A Python module implemented in Rust.
#[pymodule]
#[pyo3(name = "comfyui_resolution_master")] // 需要与包名保持一致
fn py_init(py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    // 初始化日志
    // 每个扩展模块都有自己的全局变量，因此所使用的记录器也与其他 Rust 原生扩展无关。
    let _ = tracing_subscriber::fmt()
        .with_ansi(true)
        .with_max_level(tracing::Level::DEBUG)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .try_init();

    // 添加子模块
    m.add_submodule(&resolution::submodule(py)?)?;

    // 前端读取检测尺寸
    m.add_function(wrap_pyfunction!(get_detected_dimensions, m)?)?;
    m.add_function(wrap_pyfunction!(clear_detected_dimensions, m)?)?;

    // 注册 ComfyUI NODE_CLASS_MAPPINGS/NODE_DISPLAY_NAME_MAPPINGS
    let node_mapping = PyDict::new(py);
    let name_mapping = PyDict::new(py);

    for node in node_register(py)? {
        node_mapping.set_item(node.0, node.1)?;
        name_mapping.set_item(node.0, node.2)?;
    }

    m.add("NODE_CLASS_MAPPINGS", node_mapping)?;
    m.add("NODE_DISPLAY_NAME_MAPPINGS", name_mapping)?;
    m.add("WEB_DIRECTORY", WEB_DIRECTORY)?;
    Ok(())
}

/// 节点注册
fn node_register(py: Python<'_>) -> PyResult<Vec<NodeRegister<'_>>> {
    let mut nodes: Vec<NodeRegister> = Vec::new();
    nodes.extend(resolution::node_register(py)?);
    Ok(nodes)
}
