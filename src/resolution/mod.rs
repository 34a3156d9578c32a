//! 分辨率

use pyo3::{
    types::{PyModule, PyModuleMethods},
    wrap_pyfunction, Bound, PyResult, Python,
};

use crate::core::node::NodeRegister;

pub mod dimension;
pub mod dimension_cache;
pub mod latent;
pub mod presets;
pub mod rescale;

mod resolution_master;
pub use resolution_master::{ResolutionMaster, ResolutionMode, ResolutionOutput, ResolutionRequest};

/// 分辨率模块
pub fn submodule(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let submodule = PyModule::new(py, "resolution")?;
    submodule.add_class::<ResolutionMaster>()?;

    submodule.add_function(wrap_pyfunction!(rescale::resolution_scale, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(rescale::megapixels_scale, &submodule)?)?;

    submodule.add_function(wrap_pyfunction!(presets::preset_categories, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(presets::presets, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(presets::aspect_ratio, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(presets::py_closest_preset, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(presets::snap, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(presets::flux_constraints, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(presets::wan_constraints, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(presets::p_label, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(presets::custom_calculation, &submodule)?)?;
    Ok(submodule)
}

/// Resolution node register
pub fn node_register(py: Python<'_>) -> PyResult<Vec<NodeRegister<'_>>> {
    let nodes: Vec<NodeRegister> = vec![NodeRegister(
        "ResolutionMaster",
        py.get_type::<ResolutionMaster>(),
        "Resolution Master",
    )];
    Ok(nodes)
}
