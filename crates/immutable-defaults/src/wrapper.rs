//! The adapter and the wrapped callables it produces.
//!
//! Applying an adapter analyzes the callable's signature once, validates the options
//! against it and precomputes which parameters get a fresh copy of their default on
//! every call. Each call then binds the supplied arguments, copies the defaults the
//! caller did not override and forwards everything to the original callable.

use std::collections::BTreeSet;

use crate::{
    args::{ArgValues, BoundArguments, bind_partial},
    copy::{CopyDirective, CopyMode, CopyPolicy},
    error::{SignatureError, WrapResult},
    signature::{Callable, FunctionDescriptor, Signature},
    validate::validate,
    value::DefaultValue,
};

/// Adapter options as they appear in a configuration file.
///
/// ```
/// use immutable_defaults::{AdapterConfig, CopyDirective};
///
/// let config: AdapterConfig = serde_json::from_str(r#"{"ignore": ["cache"], "deepcopy": ["rows"]}"#).unwrap();
/// assert_eq!(config.deepcopy, CopyDirective::deep_only(["rows"]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    /// Parameters whose defaults are passed through uncopied.
    pub ignore: Vec<String>,
    /// `true` (the default), `false`, or the names to deep copy.
    pub deepcopy: CopyDirective,
}

/// A configured adapter. Applying it to a callable yields a [`Wrapped`] callable.
///
/// With no options every mutable default is deep copied on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImmutableDefaults {
    ignore: BTreeSet<String>,
    deepcopy: CopyDirective,
}

impl ImmutableDefaults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters whose defaults are shared across calls as-is.
    #[must_use]
    pub fn ignore<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.ignore.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn deepcopy(mut self, directive: impl Into<CopyDirective>) -> Self {
        self.deepcopy = directive.into();
        self
    }

    #[must_use]
    pub fn from_config(config: AdapterConfig) -> Self {
        Self {
            ignore: config.ignore.into_iter().collect(),
            deepcopy: config.deepcopy,
        }
    }

    /// Applies the adapter.
    ///
    /// # Errors
    /// - `WrapError::Signature` if the callable cannot describe its parameters
    /// - `WrapError::Config` if the options contradict the callable's defaults
    pub fn wrap<V, C>(&self, callable: C) -> WrapResult<Wrapped<V, C>>
    where
        V: DefaultValue,
        C: Callable<V>,
    {
        let descriptor = FunctionDescriptor::analyze(&callable)?;
        if let Err(err) = validate(&descriptor, &self.ignore, &self.deepcopy) {
            let kind: &'static str = (&err).into();
            tracing::debug!(function = descriptor.name(), kind, %err, "rejected adapter options");
            return Err(err.into());
        }

        let policy = CopyPolicy::resolve(self.deepcopy.clone());
        let mut substitutions = Vec::new();
        let mut pass_through = Vec::new();
        for (slot, spec) in descriptor.params().iter().enumerate() {
            if !spec.has_default() {
                continue;
            }
            if spec.is_immutable() || self.ignore.contains(spec.name()) {
                pass_through.push(slot);
            } else {
                substitutions.push(Substitution {
                    slot,
                    mode: policy.mode_for(spec.name()),
                });
            }
        }
        if tracing::enabled!(tracing::Level::DEBUG) {
            let plan: Vec<String> = substitutions
                .iter()
                .map(|sub| format!("{}={}", descriptor.params()[sub.slot].name(), sub.mode))
                .collect();
            tracing::debug!(
                function = descriptor.name(),
                substituted = ?plan,
                ignored = ?self.ignore,
                "wrapped with immutable defaults"
            );
        }

        Ok(Wrapped {
            callable,
            descriptor,
            policy,
            ignore: self.ignore.clone(),
            substitutions,
            pass_through,
        })
    }
}

/// Wraps a callable with the default options: every mutable default deep copied.
pub fn immutable_defaults<V, C>(callable: C) -> WrapResult<Wrapped<V, C>>
where
    V: DefaultValue,
    C: Callable<V>,
{
    ImmutableDefaults::new().wrap(callable)
}

#[derive(Debug, Clone, Copy)]
struct Substitution {
    slot: usize,
    mode: CopyMode,
}

/// A callable whose mutable defaults are fresh on every call.
///
/// Holds no per-call state, so one instance can be shared between threads and called
/// concurrently whenever the values and the inner callable allow it.
#[derive(Debug, Clone)]
pub struct Wrapped<V, C> {
    callable: C,
    descriptor: FunctionDescriptor<V>,
    policy: CopyPolicy,
    ignore: BTreeSet<String>,
    /// Defaulted parameters that get a copy when unbound or bound to the template itself.
    substitutions: Vec<Substitution>,
    /// Defaulted parameters that receive the template itself when unbound.
    pass_through: Vec<usize>,
}

impl<V, C> Wrapped<V, C>
where
    V: DefaultValue,
    C: Callable<V>,
{
    /// Calls the wrapped callable.
    ///
    /// A defaulted parameter that the caller left out, or bound to the very default
    /// object, receives a fresh copy. Anything else the caller passed is forwarded
    /// untouched. Binding, copy and callable errors all surface as `C::Error`.
    pub fn call(&self, args: ArgValues<V>) -> Result<C::Output, C::Error> {
        let mut bound = bind_partial(self.descriptor.name(), self.descriptor.params(), args)?;
        let params = self.descriptor.params();
        for sub in &self.substitutions {
            let spec = &params[sub.slot];
            let Some(template) = spec.default() else {
                continue;
            };
            let stale = bound.slot(sub.slot).is_none_or(|value| value.is_same(template));
            if stale {
                tracing::trace!(
                    function = self.descriptor.name(),
                    parameter = spec.name(),
                    mode = %sub.mode,
                    "fresh default"
                );
                bound.set_slot(sub.slot, sub.mode.apply(template)?);
            }
        }
        for &slot in &self.pass_through {
            if bound.slot(slot).is_none()
                && let Some(template) = params[slot].default()
            {
                bound.set_slot(slot, template.clone());
            }
        }
        bound.check_complete(self.descriptor.name())?;
        self.callable.call(bound)
    }
}

impl<V, C> Wrapped<V, C> {
    #[must_use]
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    #[must_use]
    pub fn descriptor(&self) -> &FunctionDescriptor<V> {
        &self.descriptor
    }

    #[must_use]
    pub fn policy(&self) -> &CopyPolicy {
        &self.policy
    }

    #[must_use]
    pub fn ignored(&self) -> &BTreeSet<String> {
        &self.ignore
    }

    /// The original callable.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.callable
    }

    #[must_use]
    pub fn into_inner(self) -> C {
        self.callable
    }
}

/// A wrapped callable can itself be wrapped; it presents the original's signature.
impl<V, C> Callable<V> for Wrapped<V, C>
where
    V: DefaultValue,
    C: Callable<V>,
{
    type Output = C::Output;
    type Error = C::Error;

    fn name(&self) -> &str {
        self.descriptor.name()
    }

    fn signature(&self) -> Result<Signature<V>, SignatureError> {
        Ok(self.descriptor.signature())
    }

    fn call(&self, args: BoundArguments<V>) -> Result<C::Output, C::Error> {
        Self::call(self, args.into_arg_values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallError, Function, Object, WrapError, error::ConfigError};

    fn appender() -> Function<Object, impl Fn(BoundArguments<Object>) -> Result<Object, CallError>> {
        let sig = Signature::<Object>::builder()
            .param("value")
            .param_with_default("xs", Object::empty_list())
            .build()
            .unwrap();
        Function::new("append", sig, |args: BoundArguments<Object>| {
            let xs = args["xs"].clone();
            if let Some(list) = xs.as_list() {
                list.push(args["value"].clone());
            }
            Ok::<_, CallError>(xs)
        })
    }

    #[test]
    fn plan_skips_immutable_and_ignored_defaults() {
        let sig = Signature::<Object>::builder()
            .param_with_default("a", Object::empty_list())
            .param_with_default("b", Object::empty_dict())
            .param_with_default("n", 3)
            .build()
            .unwrap();
        let f = Function::new("f", sig, |_args: BoundArguments<Object>| Ok::<_, CallError>(Object::None));
        let wrapped = ImmutableDefaults::new().ignore(["b"]).wrap(f).unwrap();
        let slots: Vec<usize> = wrapped.substitutions.iter().map(|s| s.slot).collect();
        assert_eq!(slots, [0]);
        assert_eq!(wrapped.pass_through, [1, 2]);
    }

    #[test]
    fn method_forms_follow_the_policy() {
        let wrapped = ImmutableDefaults::new().deepcopy(false).wrap(appender()).unwrap();
        assert_eq!(wrapped.substitutions[0].mode, CopyMode::Shallow);
        assert_eq!(wrapped.policy().directive(), &CopyDirective::ShallowAll);
    }

    #[test]
    fn from_config_matches_builder() {
        let config = AdapterConfig {
            ignore: vec!["a".to_owned()],
            deepcopy: CopyDirective::ShallowAll,
        };
        assert_eq!(
            ImmutableDefaults::from_config(config),
            ImmutableDefaults::new().ignore(["a"]).deepcopy(false)
        );
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let result = serde_json::from_str::<AdapterConfig>(r#"{"ignroe": []}"#);
        assert!(result.is_err());
        let config: AdapterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AdapterConfig::default());
    }

    #[test]
    fn wrap_reports_config_errors() {
        let err = ImmutableDefaults::new().ignore(["nope"]).wrap(appender()).unwrap_err();
        assert!(matches!(err, WrapError::Config(ConfigError::UnknownParameter { .. })));
    }

    #[test]
    fn each_call_gets_its_own_default() {
        let wrapped = immutable_defaults(appender()).unwrap();
        let first = wrapped.call(ArgValues::new().arg(1)).unwrap();
        let second = wrapped.call(ArgValues::new().arg(2)).unwrap();
        assert_eq!(first.to_string(), "[1]");
        assert_eq!(second.to_string(), "[2]");
        assert!(!first.is_same(&second));
    }
}
