//! Python bindings for immutable-defaults.
//!
//! Exposes the `immutable_defaults` decorator. Python objects plug into the core
//! engine through [`value::PyDefault`]; signatures come from `inspect.signature`.

mod exceptions;
mod signature;
mod value;
mod wrapper;

use std::sync::OnceLock;

pub use exceptions::{ConfigurationError, SignatureError};
use pyo3::prelude::*;
pub use wrapper::{PyAdapter, PyWrapped};

/// Returns the package version, converting Cargo's format to Python's PEP 440.
fn get_version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();

    VERSION.get_or_init(|| {
        let version = env!("CARGO_PKG_VERSION");
        // cargo uses "1.0-alpha1" etc. while python uses "1.0.0a1"
        version.replace("-alpha", "a").replace("-beta", "b")
    })
}

/// Fresh copies of mutable default arguments on every call.
#[pymodule]
mod _immutable_defaults {
    use pyo3::prelude::*;

    #[pymodule_export]
    use super::ConfigurationError;
    #[pymodule_export]
    use super::PyAdapter as ImmutableDefaults;
    #[pymodule_export]
    use super::PyWrapped as ImmutableDefaultsWrapper;
    #[pymodule_export]
    use super::SignatureError;
    use super::get_version;
    #[pymodule_export]
    use crate::wrapper::immutable_defaults;

    #[pymodule_init]
    fn init(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add("__version__", get_version())?;
        Ok(())
    }
}
