//! comfy 包装

pub mod model_management;
