//! Python objects as recordable defaults.
//!
//! Identity is the object's address (`id()` in CPython). Copies go through the
//! `copy` module so user classes with `__copy__`/`__deepcopy__` behave exactly as they
//! would under a hand-written `copy.deepcopy(default)`.

use immutable_defaults::{DefaultValue, ObjectId};
use pyo3::{
    prelude::*,
    sync::PyOnceLock,
    types::{PyBool, PyBytes, PyComplex, PyFloat, PyFrozenSet, PyInt, PyString, PyTuple, PyType},
};

/// Tuples nested deeper than this are treated as mutable and copied.
const MAX_IMMUTABLE_DEPTH: u16 = 64;

/// A Python object recorded as a parameter default or passed as an argument.
pub struct PyDefault(Py<PyAny>);

impl PyDefault {
    #[must_use]
    pub fn new(obj: Py<PyAny>) -> Self {
        Self(obj)
    }

    pub fn bind<'py>(&self, py: Python<'py>) -> &Bound<'py, PyAny> {
        self.0.bind(py)
    }

    #[must_use]
    pub fn into_inner(self) -> Py<PyAny> {
        self.0
    }
}

impl Clone for PyDefault {
    fn clone(&self) -> Self {
        Python::attach(|py| Self(self.0.clone_ref(py)))
    }
}

impl std::fmt::Debug for PyDefault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PyDefault({:#x})", self.0.as_ptr() as usize)
    }
}

impl DefaultValue for PyDefault {
    type Error = PyErr;

    fn identity(&self) -> Option<ObjectId> {
        Some(ObjectId::from_addr(self.0.as_ptr() as usize))
    }

    fn is_immutable(&self) -> bool {
        Python::attach(|py| is_immutable(self.0.bind(py), 0))
    }

    fn shallow_copy(&self) -> PyResult<Self> {
        Python::attach(|py| {
            let obj = self.0.bind(py);
            // `copy.copy` hands tuples and frozensets back unchanged, even when they hold
            // mutable members
            if let Some(outer) = rebuild_outer(obj)? {
                return Ok(Self(outer.unbind()));
            }
            static COPY: PyOnceLock<Py<PyAny>> = PyOnceLock::new();
            let copy = COPY.import(py, "copy", "copy")?;
            Ok(Self(copy.call1((obj,))?.unbind()))
        })
    }

    fn deep_copy(&self) -> PyResult<Self> {
        Python::attach(|py| {
            static DEEPCOPY: PyOnceLock<Py<PyAny>> = PyOnceLock::new();
            let deepcopy = DEEPCOPY.import(py, "copy", "deepcopy")?;
            Ok(Self(deepcopy.call1((self.0.bind(py),))?.unbind()))
        })
    }
}

/// A new outer `tuple`/`frozenset` sharing the members, for exact instances that
/// hold something mutable. `None` for every other object.
fn rebuild_outer<'py>(obj: &Bound<'py, PyAny>) -> PyResult<Option<Bound<'py, PyAny>>> {
    let py = obj.py();
    if obj.is_exact_instance_of::<PyTuple>() {
        if is_immutable(obj, 0) {
            return Ok(None);
        }
        let items = obj.try_iter()?.collect::<PyResult<Vec<_>>>()?;
        return Ok(Some(PyTuple::new(py, items)?.into_any()));
    }
    if obj.is_exact_instance_of::<PyFrozenSet>() {
        if is_immutable(obj, 0) {
            return Ok(None);
        }
        let items = obj.try_iter()?.collect::<PyResult<Vec<_>>>()?;
        return Ok(Some(PyFrozenSet::new(py, items)?.into_any()));
    }
    Ok(None)
}

/// Built-in kinds that `copy.deepcopy` returns unchanged.
///
/// Exact type checks only: a subclass of `int` can carry a mutable `__dict__`.
fn is_immutable(obj: &Bound<'_, PyAny>, depth: u16) -> bool {
    if obj.is_none()
        || obj.is_exact_instance_of::<PyBool>()
        || obj.is_exact_instance_of::<PyInt>()
        || obj.is_exact_instance_of::<PyFloat>()
        || obj.is_exact_instance_of::<PyComplex>()
        || obj.is_exact_instance_of::<PyString>()
        || obj.is_exact_instance_of::<PyBytes>()
        || obj.is_instance_of::<PyType>()
    {
        return true;
    }
    if depth >= MAX_IMMUTABLE_DEPTH {
        return false;
    }
    if obj.is_exact_instance_of::<PyTuple>() || obj.is_exact_instance_of::<PyFrozenSet>() {
        return match obj.try_iter() {
            Ok(mut items) => items.all(|item| item.is_ok_and(|item| is_immutable(&item, depth + 1))),
            Err(_) => false,
        };
    }
    false
}
