//! Exceptions raised by the Python bindings.
//!
//! ```text
//! ValueError
//! ├── ConfigurationError   # adapter options are invalid or contradict the defaults
//! └── SignatureError       # the callable's parameters cannot be inspected
//! ```
//!
//! Binding failures raise plain `TypeError`, like a direct call would. Copy failures
//! and exceptions raised by the wrapped function propagate unchanged.

use immutable_defaults::{BindError, ConfigError, SignatureError as CoreSignatureError, WrapError};
use pyo3::{PyClassInitializer, exceptions::PyTypeError, exceptions::PyValueError, prelude::*};

/// Raised when the adapter is applied with options that cannot be honored.
#[pyclass(name = "ConfigurationError", extends = PyValueError, module = "immutable_defaults")]
pub struct ConfigurationError {
    /// Which check failed, e.g. `"SplitCopy"`.
    #[pyo3(get)]
    kind: String,
    message: String,
}

impl ConfigurationError {
    #[must_use]
    pub fn new_err(py: Python<'_>, err: &ConfigError) -> PyErr {
        let kind: &'static str = err.into();
        let init = PyClassInitializer::from(Self {
            kind: kind.to_owned(),
            message: err.to_string(),
        });
        match Py::new(py, init) {
            Ok(exc) => PyErr::from_value(exc.into_bound(py).into_any()),
            Err(e) => e,
        }
    }
}

#[pymethods]
impl ConfigurationError {
    fn __str__(&self) -> &str {
        &self.message
    }

    fn __repr__(&self) -> String {
        format!("ConfigurationError({:?})", self.message)
    }
}

/// Raised when the wrapped callable's signature cannot be inspected or is malformed.
#[pyclass(name = "SignatureError", extends = PyValueError, module = "immutable_defaults")]
pub struct SignatureError {
    #[pyo3(get)]
    kind: String,
    message: String,
}

impl SignatureError {
    #[must_use]
    pub fn new_err(py: Python<'_>, err: &CoreSignatureError) -> PyErr {
        let kind: &'static str = err.into();
        let init = PyClassInitializer::from(Self {
            kind: kind.to_owned(),
            message: err.to_string(),
        });
        match Py::new(py, init) {
            Ok(exc) => PyErr::from_value(exc.into_bound(py).into_any()),
            Err(e) => e,
        }
    }
}

#[pymethods]
impl SignatureError {
    fn __str__(&self) -> &str {
        &self.message
    }

    fn __repr__(&self) -> String {
        format!("SignatureError({:?})", self.message)
    }
}

/// Converts a wrap-time failure into the matching Python exception.
pub fn wrap_error_to_py(py: Python<'_>, err: &WrapError) -> PyErr {
    match err {
        WrapError::Signature(err) => SignatureError::new_err(py, err),
        WrapError::Config(err) => ConfigurationError::new_err(py, err),
    }
}

/// Error type of one wrapped call.
///
/// Exists because `PyErr` and `BindError` are both foreign to this crate, so neither
/// can convert into the other here.
#[derive(Debug)]
pub enum PyCallError {
    Bind(BindError),
    Python(PyErr),
}

impl From<BindError> for PyCallError {
    fn from(err: BindError) -> Self {
        Self::Bind(err)
    }
}

impl From<PyErr> for PyCallError {
    fn from(err: PyErr) -> Self {
        Self::Python(err)
    }
}

impl From<PyCallError> for PyErr {
    fn from(err: PyCallError) -> Self {
        match err {
            PyCallError::Bind(err) => PyTypeError::new_err(err.to_string()),
            PyCallError::Python(err) => err,
        }
    }
}
