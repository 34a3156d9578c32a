//! 节点分类

/// azToolkit 实用工具
pub const CATEGORY_AZ_TOOLKIT: &str = "utils/azToolkit";
