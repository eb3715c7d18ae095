//! Python callables seen through `inspect.signature`.

use immutable_defaults::{BoundArguments, Callable, Param, ParamKind, Signature, SignatureError};
use pyo3::{
    prelude::*,
    sync::PyOnceLock,
    types::{PyDict, PyTuple},
};

use crate::{exceptions::PyCallError, value::PyDefault};

/// A Python callable together with the name used in error messages.
pub struct PyCallable {
    func: Py<PyAny>,
    name: String,
}

impl PyCallable {
    /// Uses `__qualname__`, then `__name__`, then `repr()` for the name.
    pub fn new(func: &Bound<'_, PyAny>) -> Self {
        let name = ["__qualname__", "__name__"]
            .into_iter()
            .find_map(|attr| func.getattr(attr).ok()?.extract::<String>().ok())
            .or_else(|| func.repr().ok().map(|r| r.to_string()))
            .unwrap_or_else(|| "<callable>".to_owned());
        Self {
            func: func.clone().unbind(),
            name,
        }
    }
}

impl Callable<PyDefault> for PyCallable {
    type Output = Py<PyAny>;
    type Error = PyCallError;

    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Result<Signature<PyDefault>, SignatureError> {
        Python::attach(|py| {
            inspect_signature(self.func.bind(py)).map_err(|err| SignatureError::Uninspectable {
                function: self.name.clone(),
                reason: err.to_string(),
            })?
        })
    }

    fn call(&self, args: BoundArguments<PyDefault>) -> Result<Py<PyAny>, PyCallError> {
        let (args, kwargs) = args.into_call_args();
        Python::attach(|py| {
            let args = PyTuple::new(py, args.into_iter().map(PyDefault::into_inner))?;
            let kwargs_dict = PyDict::new(py);
            for (name, value) in kwargs {
                kwargs_dict.set_item(name, value.into_inner())?;
            }
            let result = if kwargs_dict.is_empty() {
                self.func.bind(py).call1(args)?
            } else {
                self.func.bind(py).call(args, Some(&kwargs_dict))?
            };
            Ok(result.unbind())
        })
    }
}

/// Reads the parameter list of a Python callable.
///
/// The outer error is a Python failure of `inspect` itself. The inner result holds a
/// parameter list that `inspect` accepted but that violates Python's ordering rules,
/// which only happens for hand-built `__signature__` objects.
fn inspect_signature(func: &Bound<'_, PyAny>) -> PyResult<Result<Signature<PyDefault>, SignatureError>> {
    let py = func.py();
    static SIGNATURE: PyOnceLock<Py<PyAny>> = PyOnceLock::new();
    static PARAMETER: PyOnceLock<Py<PyAny>> = PyOnceLock::new();
    let signature = SIGNATURE.import(py, "inspect", "signature")?.call1((func,))?;
    let empty = PARAMETER.import(py, "inspect", "Parameter")?.getattr("empty")?;

    let mut params = Vec::new();
    for param in signature.getattr("parameters")?.call_method0("values")?.try_iter()? {
        let param = param?;
        let name: String = param.getattr("name")?.extract()?;
        let kind = match param.getattr("kind")?.extract::<u8>()? {
            0 => ParamKind::PositionalOnly,
            1 => ParamKind::PositionalOrKeyword,
            2 => ParamKind::VarPositional,
            3 => ParamKind::KeywordOnly,
            _ => ParamKind::VarKeyword,
        };
        let default = param.getattr("default")?;
        params.push(if default.is(&empty) {
            Param::required(name, kind)
        } else {
            Param::with_default(name, kind, PyDefault::new(default.unbind()))
        });
    }
    tracing::trace!(parameters = params.len(), "inspected python signature");
    Ok(Signature::from_params(params))
}
