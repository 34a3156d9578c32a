//! 错误处理

#[allow(unused)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // 标准库错误处理
    #[error("io error, {0}")]
    Io(std::io::Error),
    #[error("system time error, {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
    // std::sync::poison::rwlock
    #[error("lock error, {0}")]
    LockError(String),

    #[error("serde json error, {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("py error, {0}")]
    PyErr(#[from] pyo3::PyErr),
    #[error("pythonize error, {0}")]
    PythonizeError(#[from] pythonize::PythonizeError),
    #[error("py downcast error, {0}")]
    PyDowncastError(String),

    #[error("tensor error, {0}")]
    TensorErr(#[from] candle_core::Error),
    #[error("invalid tensor shape, {0}")]
    InvalidTensorShape(String),

    #[error("invalid parameter, {0}")]
    InvalidParameter(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<Error> for pyo3::PyErr {
    fn from(e: Error) -> Self {
        match e {
            Error::PyErr(e) => e,
            e => pyo3::PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string()),
        }
    }
}
