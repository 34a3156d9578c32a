//! Convert to Python object wrapper
//! 依赖:
//! - python: torch

use std::marker::PhantomData;

use candle_core::{Tensor, WithDType};
use numpy::{Element, PyArray, PyArrayDyn, PyArrayMethods};
use pyo3::{
    exceptions::PyRuntimeError, types::PyAnyMethods, Bound, IntoPyObject, PyAny, PyErr, PyResult,
    Python,
};

use crate::error::Error;

pub struct TensorWrapper<T>
where
    T: Element + WithDType,
{
    tensor: Tensor,
    _marker: PhantomData<T>,
}

impl<T> TensorWrapper<T>
where
    T: Element + WithDType,
{
    pub fn from_tensor(tensor: Tensor) -> Self {
        Self {
            tensor,
            _marker: PhantomData,
        }
    }

    /// The dimension size for this tensor on each axis.
    pub fn dims(&self) -> &[usize] {
        self.tensor.dims()
    }

    pub fn into_tensor(self) -> Tensor {
        self.tensor
    }
}

impl<T> TensorWrapper<T>
where
    T: Element + WithDType,
{
    /// 转换为python对象
    ///
    /// 将数组转换为 python 的 tensor, 与 numpy 数组共享内存
    /// ```python,ignore
    /// import torch
    /// tensor = torch.from_numpy(data)
    /// ```
    pub fn to_py_tensor<'py>(self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        let data = self.into_pyobject(py)?;

        let torch = py.import("torch")?;
        torch.getattr("from_numpy")?.call1((data,))
    }
}

impl<T> From<Tensor> for TensorWrapper<T>
where
    T: Element + WithDType,
{
    fn from(value: Tensor) -> Self {
        TensorWrapper::from_tensor(value)
    }
}

impl<'py, T> IntoPyObject<'py> for TensorWrapper<T>
where
    T: Element + WithDType,
{
    type Target = PyArrayDyn<T>; // the Python type
    type Output = Bound<'py, Self::Target>; // in most cases this will be `Bound`
    type Error = PyErr; // the conversion error type, has to be convertable to `PyErr`

    fn into_pyobject(self, py: Python<'py>) -> Result<Self::Output, Self::Error> {
        let tensor = self.into_tensor();
        let shape = tensor.dims().to_vec();

        let data = tensor
            .flatten_all()
            .map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))?
            .to_vec1::<T>()
            .map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))?;
        // candle 缓冲区在此释放, 只保留一份数据
        drop(tensor);

        // numpy 直接接管 Vec, reshape 返回视图
        let array = PyArray::from_vec(py, data)
            .reshape(shape)
            .map_err(|e| PyErr::new::<PyRuntimeError, _>(e.to_string()))?;

        Ok(array)
    }
}

/// 读取 torch.Tensor / numpy.ndarray 的形状
///
/// 只访问 `shape` 属性, 不拷贝数据
pub fn tensor_shape(py_any: &Bound<'_, PyAny>) -> Result<Vec<usize>, Error> {
    let shape = py_any
        .getattr("shape")
        .map_err(|e| Error::InvalidTensorShape(format!("object has no shape, {e}")))?;

    let dims = shape
        .extract::<Vec<usize>>()
        .map_err(|e| Error::PyDowncastError(e.to_string()))?;
    Ok(dims)
}
