//! ComfyUI 约定

pub mod types;
