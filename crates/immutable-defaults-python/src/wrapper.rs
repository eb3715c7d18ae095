//! The decorator, the configured adapter and the wrapper around a decorated function.

use std::collections::BTreeSet;

// `::immutable_defaults` is the core crate, not the pyfunction below
use ::immutable_defaults::{ArgValues, ConfigError, CopyDirective, ImmutableDefaults, Wrapped};
use pyo3::{
    prelude::*,
    sync::PyOnceLock,
    types::{PyBool, PyDict, PyString, PyTuple},
};

use crate::{
    exceptions::{ConfigurationError, wrap_error_to_py},
    signature::PyCallable,
    value::PyDefault,
};

/// A function whose mutable defaults are copied on every call.
///
/// Carries the wrapped function's metadata (`__name__`, `__doc__`, `__wrapped__`, ...)
/// in its instance dict and binds as a method like a plain function does.
#[pyclass(name = "ImmutableDefaultsWrapper", module = "immutable_defaults", frozen, dict)]
pub struct PyWrapped {
    inner: Wrapped<PyDefault, PyCallable>,
}

#[pymethods]
impl PyWrapped {
    #[pyo3(signature = (*args, **kwargs))]
    fn __call__(&self, args: &Bound<'_, PyTuple>, kwargs: Option<&Bound<'_, PyDict>>) -> PyResult<Py<PyAny>> {
        let mut call_args = ArgValues::new();
        for arg in args.iter() {
            call_args.push_arg(PyDefault::new(arg.unbind()));
        }
        if let Some(kwargs) = kwargs {
            for (name, value) in kwargs.iter() {
                call_args.push_kwarg(name.extract()?, PyDefault::new(value.unbind()));
            }
        }
        Ok(self.inner.call(call_args)?)
    }

    fn __get__(
        slf: &Bound<'_, Self>,
        instance: Option<&Bound<'_, PyAny>>,
        _owner: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<Py<PyAny>> {
        match instance {
            Some(instance) if !instance.is_none() => {
                static METHOD_TYPE: PyOnceLock<Py<PyAny>> = PyOnceLock::new();
                let method = METHOD_TYPE.import(slf.py(), "types", "MethodType")?;
                Ok(method.call1((slf, instance))?.unbind())
            }
            _ => Ok(slf.clone().into_any().unbind()),
        }
    }

    fn __repr__(&self) -> String {
        format!("<immutable_defaults wrapper of {}>", self.inner.name())
    }
}

/// `immutable_defaults` called with options and no function: applies them on call.
#[pyclass(name = "ImmutableDefaults", module = "immutable_defaults", frozen)]
pub struct PyAdapter {
    adapter: ImmutableDefaults,
}

#[pymethods]
impl PyAdapter {
    fn __call__(&self, f: &Bound<'_, PyAny>) -> PyResult<Py<PyAny>> {
        wrap(&self.adapter, f)
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.adapter)
    }
}

/// Copies mutable default arguments on every call.
///
/// Usable bare (`@immutable_defaults`) or with options
/// (`@immutable_defaults(ignore=["cache"], deepcopy=False)`).
#[pyfunction]
#[pyo3(
    signature = (f=None, /, *, ignore=None, deepcopy=None),
    text_signature = "(f=None, /, *, ignore=None, deepcopy=True)"
)]
pub fn immutable_defaults(
    py: Python<'_>,
    f: Option<&Bound<'_, PyAny>>,
    ignore: Option<&Bound<'_, PyAny>>,
    deepcopy: Option<&Bound<'_, PyAny>>,
) -> PyResult<Py<PyAny>> {
    let mut adapter = ImmutableDefaults::new();
    if let Some(ignore) = ignore {
        let names = names(ignore).ok_or_else(|| {
            let err = ConfigError::InvalidIgnore { got: describe(ignore) };
            ConfigurationError::new_err(py, &err)
        })?;
        adapter = adapter.ignore(names);
    }
    if let Some(deepcopy) = deepcopy {
        adapter = adapter.deepcopy(directive(deepcopy).map_err(|err| ConfigurationError::new_err(py, &err))?);
    }
    match f {
        Some(f) => wrap(&adapter, f),
        None => Ok(Py::new(py, PyAdapter { adapter })?.into_any()),
    }
}

fn wrap(adapter: &ImmutableDefaults, f: &Bound<'_, PyAny>) -> PyResult<Py<PyAny>> {
    let py = f.py();
    let inner = adapter
        .wrap(PyCallable::new(f))
        .map_err(|err| wrap_error_to_py(py, &err))?;
    let wrapper = Bound::new(py, PyWrapped { inner })?;
    static UPDATE_WRAPPER: PyOnceLock<Py<PyAny>> = PyOnceLock::new();
    UPDATE_WRAPPER
        .import(py, "functools", "update_wrapper")?
        .call1((&wrapper, f))?;
    Ok(wrapper.into_any().unbind())
}

fn directive(obj: &Bound<'_, PyAny>) -> Result<CopyDirective, ConfigError> {
    if let Ok(flag) = obj.cast::<PyBool>() {
        return Ok(CopyDirective::from(flag.is_true()));
    }
    names(obj).map(CopyDirective::DeepOnly).ok_or_else(|| ConfigError::InvalidDeepcopy {
        got: describe(obj),
    })
}

/// A single string or an iterable of strings.
fn names(obj: &Bound<'_, PyAny>) -> Option<BTreeSet<String>> {
    if let Ok(name) = obj.cast::<PyString>() {
        return Some(BTreeSet::from([name.to_string()]));
    }
    obj.try_iter()
        .ok()?
        .map(|item| item.ok()?.extract::<String>().ok())
        .collect()
}

fn describe(obj: &Bound<'_, PyAny>) -> String {
    let type_name = obj
        .get_type()
        .name()
        .map_or_else(|_| "object".to_owned(), |n| n.to_string());
    match obj.repr() {
        Ok(repr) => format!("{type_name} {repr}"),
        Err(_) => type_name,
    }
}
