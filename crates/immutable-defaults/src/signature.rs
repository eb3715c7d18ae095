//! Function signatures and the signature analyzer.
//!
//! Rust closures carry no inspectable parameter list, so every wrapped callable declares
//! one explicitly as a [`Signature`]: the ordered parameters with their Python kinds and
//! default values. [`FunctionDescriptor::analyze`] turns that declaration into the
//! immutable parameter table the interceptor consults on every call.
//!
//! Parameters follow Python's ordering rules:
//! ```text
//! [positional-only] [positional-or-keyword] [*args] [keyword-only] [**kwargs]
//! ```

use std::sync::Arc;

use crate::{
    args::BoundArguments,
    error::{BindError, SignatureError},
    value::DefaultValue,
};

/// Python parameter kinds, in the order they must be declared.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::IntoStaticStr, serde::Serialize,
)]
pub enum ParamKind {
    /// Before `/`; can only be passed by position.
    #[strum(serialize = "positional-only")]
    PositionalOnly,
    /// Regular parameter; by position or by keyword.
    #[strum(serialize = "positional or keyword")]
    PositionalOrKeyword,
    /// `*args`; collects excess positional arguments.
    #[strum(serialize = "variadic positional")]
    VarPositional,
    /// After `*` or `*args`; can only be passed by keyword.
    #[strum(serialize = "keyword-only")]
    KeywordOnly,
    /// `**kwargs`; collects excess keyword arguments.
    #[strum(serialize = "variadic keyword")]
    VarKeyword,
}

impl ParamKind {
    /// Whether arguments can bind to this parameter by position.
    #[must_use]
    pub fn is_positional(self) -> bool {
        matches!(self, Self::PositionalOnly | Self::PositionalOrKeyword)
    }

    #[must_use]
    pub fn is_variadic(self) -> bool {
        matches!(self, Self::VarPositional | Self::VarKeyword)
    }
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct Param<V> {
    name: String,
    kind: ParamKind,
    default: Option<V>,
}

impl<V> Param<V> {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, kind: ParamKind, default: V) -> Self {
        Self {
            name: name.into(),
            kind,
            default: Some(default),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    #[must_use]
    pub fn default(&self) -> Option<&V> {
        self.default.as_ref()
    }
}

/// A declared parameter list, validated against Python's rules.
#[derive(Debug, Clone)]
pub struct Signature<V> {
    params: Vec<Param<V>>,
}

impl<V> Signature<V> {
    #[must_use]
    pub fn builder() -> SignatureBuilder<V> {
        SignatureBuilder { params: Vec::new() }
    }

    /// Validates a parameter list.
    ///
    /// # Errors
    /// - two parameters with the same name
    /// - kinds out of order, or a second `*args`/`**kwargs`
    /// - a default on `*args`/`**kwargs`
    /// - a required positional parameter after a defaulted one
    pub fn from_params(params: Vec<Param<V>>) -> Result<Self, SignatureError> {
        let mut previous: Option<ParamKind> = None;
        let mut seen_default = false;
        for (i, param) in params.iter().enumerate() {
            if params[..i].iter().any(|p| p.name == param.name) {
                return Err(SignatureError::DuplicateParameter {
                    name: param.name.clone(),
                });
            }
            if let Some(prev) = previous
                && (param.kind < prev || (param.kind == prev && param.kind.is_variadic()))
            {
                return Err(SignatureError::WrongKindOrder {
                    name: param.name.clone(),
                    kind: param.kind,
                    previous: prev,
                });
            }
            previous = Some(param.kind);

            if param.kind.is_variadic() && param.default.is_some() {
                return Err(SignatureError::VariadicDefault {
                    name: param.name.clone(),
                });
            }
            if param.kind.is_positional() {
                if param.default.is_some() {
                    seen_default = true;
                } else if seen_default {
                    return Err(SignatureError::NonDefaultAfterDefault {
                        name: param.name.clone(),
                    });
                }
            }
        }
        Ok(Self { params })
    }

    #[must_use]
    pub fn params(&self) -> &[Param<V>] {
        &self.params
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Declares parameters in order; `build()` validates them.
///
/// ```
/// use immutable_defaults::{Object, Signature};
///
/// // def f(a, b, c=[])
/// let sig = Signature::<Object>::builder()
///     .param("a")
///     .param("b")
///     .param_with_default("c", Object::empty_list())
///     .build()
///     .unwrap();
/// assert_eq!(sig.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct SignatureBuilder<V> {
    params: Vec<Param<V>>,
}

impl<V> SignatureBuilder<V> {
    #[must_use]
    pub fn positional_only(self, name: &str) -> Self {
        self.push(Param::required(name, ParamKind::PositionalOnly))
    }

    #[must_use]
    pub fn positional_only_with_default(self, name: &str, default: impl Into<V>) -> Self {
        self.push(Param::with_default(name, ParamKind::PositionalOnly, default.into()))
    }

    #[must_use]
    pub fn param(self, name: &str) -> Self {
        self.push(Param::required(name, ParamKind::PositionalOrKeyword))
    }

    #[must_use]
    pub fn param_with_default(self, name: &str, default: impl Into<V>) -> Self {
        self.push(Param::with_default(name, ParamKind::PositionalOrKeyword, default.into()))
    }

    #[must_use]
    pub fn var_positional(self, name: &str) -> Self {
        self.push(Param::required(name, ParamKind::VarPositional))
    }

    #[must_use]
    pub fn keyword_only(self, name: &str) -> Self {
        self.push(Param::required(name, ParamKind::KeywordOnly))
    }

    #[must_use]
    pub fn keyword_only_with_default(self, name: &str, default: impl Into<V>) -> Self {
        self.push(Param::with_default(name, ParamKind::KeywordOnly, default.into()))
    }

    #[must_use]
    pub fn var_keyword(self, name: &str) -> Self {
        self.push(Param::required(name, ParamKind::VarKeyword))
    }

    pub fn build(self) -> Result<Signature<V>, SignatureError> {
        Signature::from_params(self.params)
    }

    fn push(mut self, param: Param<V>) -> Self {
        self.params.push(param);
        self
    }
}

/// A parameter as recorded by the analyzer.
///
/// The default is an archived template: the interceptor only ever reads and copies it.
#[derive(Debug, Clone)]
pub struct ParamSpec<V> {
    name: String,
    kind: ParamKind,
    default: Option<V>,
    immutable: bool,
}

impl<V> ParamSpec<V> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    #[must_use]
    pub fn default(&self) -> Option<&V> {
        self.default.as_ref()
    }

    /// Whether the default is of a kind that never needs copying.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }
}

/// The analyzed parameter table of one wrapped function. Immutable after construction.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor<V> {
    name: String,
    params: Arc<[ParamSpec<V>]>,
}

impl<V: DefaultValue> FunctionDescriptor<V> {
    /// Extracts the parameter table of a callable, once.
    ///
    /// Fails only when the callable cannot describe its own parameters.
    pub fn analyze<C: Callable<V>>(callable: &C) -> Result<Self, SignatureError> {
        let signature = callable.signature()?;
        Ok(Self::from_signature(callable.name(), signature))
    }

    pub fn from_signature(name: &str, signature: Signature<V>) -> Self {
        let params = signature
            .params
            .into_iter()
            .map(|param| {
                let immutable = param.default.as_ref().is_some_and(DefaultValue::is_immutable);
                ParamSpec {
                    name: param.name,
                    kind: param.kind,
                    default: param.default,
                    immutable,
                }
            })
            .collect();
        Self {
            name: name.to_owned(),
            params,
        }
    }
}

impl<V> FunctionDescriptor<V> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &Arc<[ParamSpec<V>]> {
        &self.params
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec<V>> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Index of a parameter in declaration order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}

impl<V: Clone> FunctionDescriptor<V> {
    /// Rebuilds the declared signature. Defaults are aliases of the recorded templates.
    #[must_use]
    pub fn signature(&self) -> Signature<V> {
        Signature {
            params: self
                .params
                .iter()
                .map(|spec| Param {
                    name: spec.name.clone(),
                    kind: spec.kind,
                    default: spec.default.clone(),
                })
                .collect(),
        }
    }
}

/// Something that can be wrapped: it describes its parameters and accepts bound
/// arguments.
///
/// The error type must absorb binding failures and copy failures so both propagate to
/// the caller unchanged through `?`.
pub trait Callable<V: DefaultValue> {
    type Output;
    type Error: From<BindError> + From<V::Error>;

    fn name(&self) -> &str;

    /// The declared parameter list, or `SignatureError::Uninspectable`.
    fn signature(&self) -> Result<Signature<V>, SignatureError>;

    fn call(&self, args: BoundArguments<V>) -> Result<Self::Output, Self::Error>;
}

/// A Rust closure paired with its declared signature.
pub struct Function<V, F> {
    name: String,
    signature: Signature<V>,
    func: F,
}

impl<V, F> Function<V, F> {
    pub fn new<R, E>(name: &str, signature: Signature<V>, func: F) -> Self
    where
        F: Fn(BoundArguments<V>) -> Result<R, E>,
    {
        Self {
            name: name.to_owned(),
            signature,
            func,
        }
    }
}

impl<V, F, R, E> Callable<V> for Function<V, F>
where
    V: DefaultValue,
    F: Fn(BoundArguments<V>) -> Result<R, E>,
    E: From<BindError> + From<V::Error>,
{
    type Output = R;
    type Error = E;

    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> Result<Signature<V>, SignatureError> {
        Ok(self.signature.clone())
    }

    fn call(&self, args: BoundArguments<V>) -> Result<R, E> {
        (self.func)(args)
    }
}

impl<V: std::fmt::Debug, F> std::fmt::Debug for Function<V, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Object;

    fn err_of(builder: SignatureBuilder<Object>) -> SignatureError {
        builder.build().unwrap_err()
    }

    #[test]
    fn full_python_signature_is_accepted() {
        // def f(a, /, b, c=[], *args, d, e={}, **kwargs)
        let sig = Signature::<Object>::builder()
            .positional_only("a")
            .param("b")
            .param_with_default("c", Object::empty_list())
            .var_positional("args")
            .keyword_only("d")
            .keyword_only_with_default("e", Object::empty_dict())
            .var_keyword("kwargs")
            .build()
            .unwrap();
        let kinds: Vec<ParamKind> = sig.params().iter().map(Param::kind).collect();
        assert_eq!(
            kinds,
            [
                ParamKind::PositionalOnly,
                ParamKind::PositionalOrKeyword,
                ParamKind::PositionalOrKeyword,
                ParamKind::VarPositional,
                ParamKind::KeywordOnly,
                ParamKind::KeywordOnly,
                ParamKind::VarKeyword,
            ]
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = err_of(Signature::builder().param("a").keyword_only("a"));
        assert_eq!(err, SignatureError::DuplicateParameter { name: "a".to_owned() });
    }

    #[test]
    fn kinds_out_of_order_are_rejected() {
        let err = err_of(Signature::builder().keyword_only("k").param("p"));
        assert_eq!(
            err.to_string(),
            "wrong parameter order: keyword-only parameter before positional or keyword parameter 'p'"
        );
        let err = err_of(Signature::builder().var_positional("a").var_positional("b"));
        assert!(matches!(err, SignatureError::WrongKindOrder { .. }));
    }

    #[test]
    fn required_after_default_is_rejected() {
        let err = err_of(Signature::builder().param_with_default("a", 1).param("b"));
        assert_eq!(err, SignatureError::NonDefaultAfterDefault { name: "b".to_owned() });
    }

    #[test]
    fn keyword_only_may_mix_required_and_defaults() {
        let sig = Signature::<Object>::builder()
            .param_with_default("a", 1)
            .keyword_only_with_default("b", 2)
            .keyword_only("c")
            .build();
        assert!(sig.is_ok());
    }

    #[test]
    fn variadic_defaults_are_rejected() {
        let params = vec![Param::with_default("args", ParamKind::VarPositional, Object::None)];
        let err = Signature::from_params(params).unwrap_err();
        assert_eq!(err, SignatureError::VariadicDefault { name: "args".to_owned() });
    }

    #[test]
    fn analyzer_records_immutable_defaults() {
        let sig = Signature::<Object>::builder()
            .param("a")
            .param_with_default("n", 3)
            .param_with_default("t", Object::tuple([Object::str("x")]))
            .param_with_default("l", Object::empty_list())
            .build()
            .unwrap();
        let descriptor = FunctionDescriptor::from_signature("f", sig);
        let flags: Vec<(&str, bool, bool)> = descriptor
            .params()
            .iter()
            .map(|p| (p.name(), p.has_default(), p.is_immutable()))
            .collect();
        assert_eq!(
            flags,
            [("a", false, false), ("n", true, true), ("t", true, true), ("l", true, false)]
        );
        assert_eq!(descriptor.position("l"), Some(3));
    }

    #[test]
    fn rebuilt_signature_aliases_the_templates() {
        let list = Object::empty_list();
        let sig = Signature::<Object>::builder().param_with_default("l", list.clone()).build().unwrap();
        let descriptor = FunctionDescriptor::from_signature("f", sig);
        let rebuilt = descriptor.signature();
        assert!(rebuilt.params()[0].default().unwrap().is_same(&list));
    }
}
