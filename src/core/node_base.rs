//! ComfyUI 节点输入构建器
//!
//! 提供类型安全、易用的构建器 API，用于生成 ComfyUI 节点的 INPUT_TYPES
//!
//! # 使用示例
//!
//! ```rust,ignore
//! Python::with_gil(|py| {
//!     InputSpec::new()
//!         .with_required("width", InputType::int().default(512).min(0).max(32768).step(64))
//!         .with_required("mode", InputType::list(vec!["A".to_string(), "B".to_string()]))
//!         .with_optional("input_image", InputType::image())
//!         .with_hidden("unique_id", InputType::hidden(HIDDEN_UNIQUE_ID))
//!         .build(py)
//! })
//! ```

use indexmap::IndexMap;
use pyo3::{
    types::{PyDict, PyDictMethods},
    Bound, IntoPyObject, Py, PyAny, PyResult, Python,
};

use crate::wrapper::comfyui::types::{
    NODE_BOOLEAN, NODE_FLOAT, NODE_IMAGE, NODE_INT, NODE_STRING,
};

/// 输入规范构建器
///
/// 用于构建 ComfyUI 节点的 INPUT_TYPES 字典结构
pub struct InputSpec {
    required: Vec<(String, InputType)>,
    optional: Vec<(String, InputType)>,
    hidden: Vec<(String, InputType)>,
}

impl InputSpec {
    /// 创建一个新的输入规范构建器
    pub fn new() -> Self {
        Self {
            required: Vec::new(),
            optional: Vec::new(),
            hidden: Vec::new(),
        }
    }

    /// 添加必需输入
    pub fn with_required(mut self, name: impl Into<String>, input: InputType) -> Self {
        self.required.push((name.into(), input));
        self
    }

    /// 添加可选输入
    pub fn with_optional(mut self, name: impl Into<String>, input: InputType) -> Self {
        self.optional.push((name.into(), input));
        self
    }

    /// 添加隐藏输入
    pub fn with_hidden(mut self, name: impl Into<String>, input: InputType) -> Self {
        self.hidden.push((name.into(), input));
        self
    }

    /// 构建 PyDict
    ///
    /// 生成符合 ComfyUI INPUT_TYPES 格式的字典结构, 空分组不会输出
    pub fn build(self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let dict = PyDict::new(py);

        for (group, inputs) in [
            ("required", self.required),
            ("optional", self.optional),
            ("hidden", self.hidden),
        ] {
            if inputs.is_empty() {
                continue;
            }
            let group_dict = PyDict::new(py);
            for (name, input_type) in inputs {
                group_dict.set_item(name, input_type.to_py_object(py)?)?;
            }
            dict.set_item(group, group_dict)?;
        }

        Ok(dict.into())
    }
}

impl Default for InputSpec {
    fn default() -> Self {
        Self::new()
    }
}

/// 输入类型（包含类型和参数）
pub struct InputType {
    kind: InputKind,
    params: IndexMap<String, ParamValue>,
    list_options: Vec<String>,
}

/// 输入类型枚举（仅表示类型，不包含参数）
#[derive(Debug, Clone, PartialEq)]
enum InputKind {
    String,
    Int,
    Float,
    Bool,
    Image,
    List,
    /// 由 ComfyUI 注入的隐藏值, 如 "UNIQUE_ID"
    Hidden(&'static str),
}

/// 参数值
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl InputType {
    fn new(kind: InputKind) -> Self {
        Self {
            kind,
            params: IndexMap::new(),
            list_options: Vec::new(),
        }
    }

    /// String 类型
    pub fn string() -> Self {
        Self::new(InputKind::String)
    }

    /// Int 类型
    pub fn int() -> Self {
        Self::new(InputKind::Int)
    }

    /// Float 类型
    pub fn float() -> Self {
        Self::new(InputKind::Float)
    }

    /// Bool 类型
    pub fn bool() -> Self {
        Self::new(InputKind::Bool)
    }

    /// Image 类型
    pub fn image() -> Self {
        Self::new(InputKind::Image)
    }

    /// 下拉选项列表
    pub fn list(options: Vec<String>) -> Self {
        Self {
            kind: InputKind::List,
            params: IndexMap::new(),
            list_options: options,
        }
    }

    /// 隐藏输入
    pub fn hidden(name: &'static str) -> Self {
        Self::new(InputKind::Hidden(name))
    }
}

impl InputType {
    // ============ 通用参数 ============

    /// 设置默认值
    pub fn default<V: Into<ParamValue>>(mut self, value: V) -> Self {
        self.params.insert("default".to_string(), value.into());
        self
    }

    /// 设置提示文本
    pub fn tooltip(mut self, value: impl Into<String>) -> Self {
        self.params
            .insert("tooltip".to_string(), ParamValue::String(value.into()));
        self
    }

    // ============ 数值类型参数 ============

    /// 设置最小值
    pub fn min<V: Into<ParamValue>>(mut self, value: V) -> Self {
        self.params.insert("min".to_string(), value.into());
        self
    }

    /// 设置最大值
    pub fn max<V: Into<ParamValue>>(mut self, value: V) -> Self {
        self.params.insert("max".to_string(), value.into());
        self
    }

    /// 设置步长
    pub fn step<V: Into<ParamValue>>(mut self, value: V) -> Self {
        self.params.insert("step".to_string(), value.into());
        self
    }

    // ============ 布尔类型参数 ============

    /// 设置开标签
    pub fn label_on(mut self, label: impl Into<String>) -> Self {
        self.params
            .insert("label_on".to_string(), ParamValue::String(label.into()));
        self
    }

    /// 设置关标签
    pub fn label_off(mut self, label: impl Into<String>) -> Self {
        self.params
            .insert("label_off".to_string(), ParamValue::String(label.into()));
        self
    }

    /// 转换为 Python 对象
    ///
    /// 列表类型：(options_list, params_dict)
    /// 隐藏类型：type_name
    /// 其他类型：(type_name, params_dict)
    fn to_py_object<'py>(self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        let type_str = match &self.kind {
            InputKind::Hidden(name) => return Ok((*name).into_pyobject(py)?.into_any()),
            InputKind::List => {
                let params_dict = self.params.to_py_dict(py)?;
                return Ok((self.list_options, params_dict)
                    .into_pyobject(py)?
                    .into_any());
            }
            InputKind::String => NODE_STRING,
            InputKind::Int => NODE_INT,
            InputKind::Float => NODE_FLOAT,
            InputKind::Bool => NODE_BOOLEAN,
            InputKind::Image => NODE_IMAGE,
        };
        let params_dict = self.params.to_py_dict(py)?;
        Ok((type_str, params_dict).into_pyobject(py)?.into_any())
    }
}

/// 将 IndexMap<String, ParamValue> 转换为 PyDict
trait ToPyDict {
    fn to_py_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>>;
}

impl ToPyDict for IndexMap<String, ParamValue> {
    fn to_py_dict<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let dict = PyDict::new(py);
        for (key, value) in self {
            match value {
                ParamValue::String(s) => dict.set_item(key, s.as_str())?,
                ParamValue::Int(i) => dict.set_item(key, *i)?,
                ParamValue::Float(f) => dict.set_item(key, *f)?,
                ParamValue::Bool(b) => dict.set_item(key, *b)?,
            }
        }
        Ok(dict)
    }
}

// ============ ParamValue 的 From 实现 ============

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<u32> for ParamValue {
    fn from(i: u32) -> Self {
        ParamValue::Int(i as i64)
    }
}

impl From<usize> for ParamValue {
    fn from(i: usize) -> Self {
        ParamValue::Int(i as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_spec_groups() -> anyhow::Result<()> {
        let spec = InputSpec::new()
            .with_required("width", InputType::int().default(512u32).min(0u32))
            .with_required("auto_detect", InputType::bool().default(false))
            .with_optional("input_image", InputType::image())
            .with_hidden("unique_id", InputType::hidden("UNIQUE_ID"));

        assert_eq!(spec.required.len(), 2);
        assert_eq!(spec.optional.len(), 1);
        assert_eq!(spec.hidden.len(), 1);
        assert_eq!(spec.required[0].0, "width");
        assert_eq!(spec.hidden[0].1.kind, InputKind::Hidden("UNIQUE_ID"));
        Ok(())
    }

    #[test]
    fn test_params_keep_insertion_order() -> anyhow::Result<()> {
        let input = InputType::int()
            .default(512u32)
            .min(0u32)
            .max(32768u32)
            .step(64u32);

        let keys: Vec<&str> = input.params.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["default", "min", "max", "step"]);
        assert_eq!(input.params["step"], ParamValue::Int(64));
        Ok(())
    }

    #[test]
    fn test_list_input_type() -> anyhow::Result<()> {
        let options = vec!["latent_4x8".to_string(), "latent_128x16".to_string()];
        let input = InputType::list(options.clone()).default("latent_4x8");

        assert_eq!(input.kind, InputKind::List);
        assert_eq!(input.list_options, options);
        assert_eq!(
            input.params["default"],
            ParamValue::String("latent_4x8".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_setting_twice_overrides() -> anyhow::Result<()> {
        let input = InputType::float().default(1.0).default(2.5);
        assert_eq!(input.params.len(), 1);
        assert_eq!(input.params["default"], ParamValue::Float(2.5));
        Ok(())
    }
}
