//! 类型定义
//! 相关节点定义: ComfyUI/comfy/comfy_types/node_typing.py

pub const NODE_INT: &str = "INT";
pub const NODE_FLOAT: &str = "FLOAT";
pub const NODE_STRING: &str = "STRING";
pub const NODE_BOOLEAN: &str = "BOOLEAN";
pub const NODE_IMAGE: &str = "IMAGE";
pub const NODE_LATENT: &str = "LATENT";

/// 隐藏输入: 节点在工作流中的唯一 id
pub const HIDDEN_UNIQUE_ID: &str = "UNIQUE_ID";
