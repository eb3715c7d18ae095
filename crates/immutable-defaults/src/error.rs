//! Error types.
//!
//! Errors fall into two families with different lifetimes:
//! - wrap-time errors ([`SignatureError`], [`ConfigError`], joined in [`WrapError`]) are
//!   raised while an adapter is being applied and mean no wrapper was produced;
//! - call-time errors ([`BindError`], [`CopyError`], and whatever the wrapped callable
//!   raises) belong to one invocation and propagate to that caller unchanged.

use std::fmt;

use strum::IntoStaticStr;

use crate::signature::ParamKind;

/// Result type alias for wrap-time operations.
pub type WrapResult<T> = Result<T, WrapError>;

/// Declared signature could not be turned into a parameter table.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
pub enum SignatureError {
    /// Two parameters share a name.
    DuplicateParameter { name: String },
    /// A parameter kind appears after a kind that must follow it,
    /// e.g. a positional parameter after a keyword-only one.
    WrongKindOrder {
        name: String,
        kind: ParamKind,
        previous: ParamKind,
    },
    /// A required positional parameter follows a positional parameter with a default.
    NonDefaultAfterDefault { name: String },
    /// `*args` or `**kwargs` declared with a default value.
    VariadicDefault { name: String },
    /// The callable's parameter list cannot be inspected at all.
    Uninspectable { function: String, reason: String },
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateParameter { name } => write!(f, "duplicate parameter name: '{name}'"),
            Self::WrongKindOrder { name, kind, previous } => {
                write!(f, "wrong parameter order: {previous} parameter before {kind} parameter '{name}'")
            }
            Self::NonDefaultAfterDefault { name } => {
                write!(f, "non-default argument '{name}' follows default argument")
            }
            Self::VariadicDefault { name } => write!(f, "variadic parameter '{name}' cannot have a default value"),
            Self::Uninspectable { function, reason } => write!(f, "no signature found for {function}: {reason}"),
        }
    }
}

impl std::error::Error for SignatureError {}

/// The adapter's options are invalid or contradict each other for this function.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
pub enum ConfigError {
    /// `deepcopy` was neither a boolean nor a collection of parameter names.
    InvalidDeepcopy { got: String },
    /// `ignore` was not a collection of parameter names.
    InvalidIgnore { got: String },
    /// An option names a parameter that the function does not declare with a default.
    UnknownParameter {
        function: String,
        option: &'static str,
        name: String,
    },
    /// A parameter is ignored and also named in the deep-copy subset.
    IgnoredAndDeep { name: String },
    /// Parameters sharing one default object would be copied both deeply and shallowly.
    SplitCopy { group: Vec<String>, deep: Vec<String> },
    /// Parameters sharing one default object are only partly ignored.
    SplitIgnore { group: Vec<String>, ignored: Vec<String> },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDeepcopy { got } => {
                write!(f, "deepcopy must be a bool or a collection of parameter names, got {got}")
            }
            Self::InvalidIgnore { got } => write!(f, "ignore must be a collection of parameter names, got {got}"),
            Self::UnknownParameter { function, option, name } => {
                write!(f, "{function}() has no parameter '{name}' with a default, named in {option}")
            }
            Self::IgnoredAndDeep { name } => write!(f, "'{name}' is both ignored and set to be deep copied"),
            Self::SplitCopy { group, deep } => write!(
                f,
                "{} share one default object and {} can be both shallow and deep copied",
                quoted_list(group),
                quoted_list(deep),
            ),
            Self::SplitIgnore { group, ignored } => write!(
                f,
                "{} share one default object and {} is both ignored and set to immutable",
                quoted_list(group),
                quoted_list(ignored),
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure to apply an adapter to a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapError {
    Signature(SignatureError),
    Config(ConfigError),
}

impl fmt::Display for WrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for WrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Signature(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<SignatureError> for WrapError {
    fn from(err: SignatureError) -> Self {
        Self::Signature(err)
    }
}

impl From<ConfigError> for WrapError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// The arguments of one call do not fit the declared parameters.
///
/// Messages follow CPython's `TypeError` wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// `min` counts the positional parameters without a default.
    TooManyPositional {
        function: String,
        min: usize,
        max: usize,
        given: usize,
    },
    MultipleValues { function: String, name: String },
    UnexpectedKeyword { function: String, name: String },
    PositionalOnlyAsKeyword { function: String, names: Vec<String> },
    MissingPositional { function: String, names: Vec<String> },
    MissingKeywordOnly { function: String, names: Vec<String> },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyPositional {
                function,
                min,
                max,
                given,
            } => {
                let verb = if *given == 1 { "was" } else { "were" };
                if min < max {
                    write!(
                        f,
                        "{function}() takes from {min} to {max} positional arguments but {given} {verb} given"
                    )
                } else {
                    write!(
                        f,
                        "{function}() takes {max} positional argument{} but {given} {verb} given",
                        plural(*max),
                    )
                }
            }
            Self::MultipleValues { function, name } => {
                write!(f, "{function}() got multiple values for argument '{name}'")
            }
            Self::UnexpectedKeyword { function, name } => {
                write!(f, "{function}() got an unexpected keyword argument '{name}'")
            }
            Self::PositionalOnlyAsKeyword { function, names } => write!(
                f,
                "{function}() got some positional-only arguments passed as keyword arguments: '{}'",
                names.join(", "),
            ),
            Self::MissingPositional { function, names } => write!(
                f,
                "{function}() missing {} required positional argument{}: {}",
                names.len(),
                plural(names.len()),
                quoted_list(names),
            ),
            Self::MissingKeywordOnly { function, names } => write!(
                f,
                "{function}() missing {} required keyword-only argument{}: {}",
                names.len(),
                plural(names.len()),
                quoted_list(names),
            ),
        }
    }
}

impl std::error::Error for BindError {}

/// A value refused to be copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyError {
    /// The value wraps an external resource that has no copy semantics.
    Uncopyable { type_name: String },
    /// Nesting exceeded the copy depth limit.
    RecursionLimit { limit: u16 },
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uncopyable { type_name } => write!(f, "cannot copy '{type_name}' object"),
            Self::RecursionLimit { limit } => {
                write!(f, "maximum recursion depth exceeded while copying (limit {limit})")
            }
        }
    }
}

impl std::error::Error for CopyError {}

/// A mutable value was used where a hashable one is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhashableError {
    pub type_name: &'static str,
}

impl fmt::Display for UnhashableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unhashable type: '{}'", self.type_name)
    }
}

impl std::error::Error for UnhashableError {}

/// Ready-made error type for callables over [`Object`](crate::Object).
///
/// Any callable error type works with the wrapper as long as it converts from
/// [`BindError`] and the value's copy error; this one also carries free-form
/// failures raised by the function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    Bind(BindError),
    Copy(CopyError),
    Raised(String),
}

impl CallError {
    /// Creates an error raised by the function body itself.
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised(message.into())
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(err) => write!(f, "TypeError: {err}"),
            Self::Copy(err) => write!(f, "TypeError: {err}"),
            Self::Raised(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for CallError {}

impl From<BindError> for CallError {
    fn from(err: BindError) -> Self {
        Self::Bind(err)
    }
}

impl From<CopyError> for CallError {
    fn from(err: CopyError) -> Self {
        Self::Copy(err)
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// Formats names the way CPython lists missing arguments: `'a'`, `'a' and 'b'`,
/// `'a', 'b', and 'c'`.
pub(crate) fn quoted_list(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => format!("'{only}'"),
        [first, second] => format!("'{first}' and '{second}'"),
        [init @ .., last] => {
            let head: Vec<String> = init.iter().map(|n| format!("'{n}'")).collect();
            format!("{}, and '{last}'", head.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_list_matches_cpython_wording() {
        assert_eq!(quoted_list(&[]), "");
        assert_eq!(quoted_list(&["a".to_owned()]), "'a'");
        assert_eq!(quoted_list(&["a".to_owned(), "b".to_owned()]), "'a' and 'b'");
        assert_eq!(
            quoted_list(&["a".to_owned(), "b".to_owned(), "c".to_owned()]),
            "'a', 'b', and 'c'"
        );
    }

    #[test]
    fn too_many_positional_message() {
        let err = BindError::TooManyPositional {
            function: "f".to_owned(),
            min: 1,
            max: 1,
            given: 3,
        };
        assert_eq!(err.to_string(), "f() takes 1 positional argument but 3 were given");
    }

    #[test]
    fn too_many_positional_message_with_defaults() {
        let err = BindError::TooManyPositional {
            function: "f".to_owned(),
            min: 2,
            max: 3,
            given: 4,
        };
        assert_eq!(err.to_string(), "f() takes from 2 to 3 positional arguments but 4 were given");
    }

    #[test]
    fn split_copy_message_mentions_both_copies() {
        let err = ConfigError::SplitCopy {
            group: vec!["a".to_owned(), "b".to_owned()],
            deep: vec!["a".to_owned()],
        };
        assert_eq!(
            err.to_string(),
            "'a' and 'b' share one default object and 'a' can be both shallow and deep copied"
        );
    }

    #[test]
    fn error_kind_names() {
        let kind: &'static str = (&ConfigError::IgnoredAndDeep { name: "x".to_owned() }).into();
        assert_eq!(kind, "IgnoredAndDeep");
    }
}
