//! Call arguments and binding them to a parameter table.
//!
//! Binding is partial: parameters that were not supplied are left unbound so the
//! interceptor can fill them from their defaults. Only after substitution is the result
//! checked for missing required arguments.

use std::{ops::Index, sync::Arc};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    error::BindError,
    signature::{ParamKind, ParamSpec},
};

/// Arguments as supplied by a caller: positional values then `name=value` pairs.
///
/// Most calls pass a handful of positional arguments, so those live inline.
#[derive(Debug, Clone)]
pub struct ArgValues<V> {
    positional: SmallVec<[V; 4]>,
    keywords: Vec<(String, V)>,
}

impl<V> Default for ArgValues<V> {
    fn default() -> Self {
        Self {
            positional: SmallVec::new(),
            keywords: Vec::new(),
        }
    }
}

impl<V> ArgValues<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<V>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Appends a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: &str, value: impl Into<V>) -> Self {
        self.keywords.push((name.to_owned(), value.into()));
        self
    }

    pub fn push_arg(&mut self, value: V) {
        self.positional.push(value);
    }

    pub fn push_kwarg(&mut self, name: String, value: V) {
        self.keywords.push((name, value));
    }

    #[must_use]
    pub fn positional(&self) -> &[V] {
        &self.positional
    }

    #[must_use]
    pub fn keywords(&self) -> &[(String, V)] {
        &self.keywords
    }

    /// Splits into owned positional and keyword parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<V>, Vec<(String, V)>) {
        (self.positional.into_vec(), self.keywords)
    }
}

impl<V> FromIterator<V> for ArgValues<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            positional: iter.into_iter().collect(),
            keywords: Vec::new(),
        }
    }
}

impl<V> From<Vec<V>> for ArgValues<V> {
    fn from(positional: Vec<V>) -> Self {
        Self {
            positional: SmallVec::from_vec(positional),
            keywords: Vec::new(),
        }
    }
}

/// Arguments bound to named parameters.
///
/// Holds one slot per declared parameter (unused for `*args`/`**kwargs`, which collect
/// into [`var_args`](Self::var_args) and [`var_kwargs`](Self::var_kwargs)).
#[derive(Debug, Clone)]
pub struct BoundArguments<V> {
    params: Arc<[ParamSpec<V>]>,
    slots: Vec<Option<V>>,
    var_args: Vec<V>,
    var_kwargs: IndexMap<String, V>,
}

impl<V> BoundArguments<V> {
    /// Value bound to a named parameter, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&V> {
        self.slot_of(name).and_then(|i| self.slots[i].as_ref())
    }

    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        self.slot_of(name).and_then(|i| self.slots[i].as_mut())
    }

    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Excess positional arguments collected by `*args`.
    #[must_use]
    pub fn var_args(&self) -> &[V] {
        &self.var_args
    }

    /// Excess keyword arguments collected by `**kwargs`, in call order.
    #[must_use]
    pub fn var_kwargs(&self) -> &IndexMap<String, V> {
        &self.var_kwargs
    }

    /// Bound named parameters in declaration order.
    pub fn arguments(&self) -> impl Iterator<Item = (&str, &V)> {
        self.params
            .iter()
            .zip(&self.slots)
            .filter_map(|(spec, slot)| slot.as_ref().map(|v| (spec.name(), v)))
    }

    /// Re-assembles positional and keyword arguments for a downstream call.
    ///
    /// Positional parameters are emitted positionally up to the first unbound one;
    /// everything after that, keyword-only parameters, and `**kwargs` go by keyword.
    #[must_use]
    pub fn into_call_args(self) -> (Vec<V>, Vec<(String, V)>) {
        let mut args = Vec::with_capacity(self.slots.len() + self.var_args.len());
        let mut kwargs = Vec::new();
        let mut kwargs_started = false;
        let mut var_args = Some(self.var_args);
        for (spec, slot) in self.params.iter().zip(self.slots) {
            match spec.kind() {
                ParamKind::VarPositional => {
                    if !kwargs_started && let Some(extra) = var_args.take() {
                        args.extend(extra);
                    }
                }
                ParamKind::VarKeyword => {}
                ParamKind::KeywordOnly => {
                    kwargs_started = true;
                    if let Some(value) = slot {
                        kwargs.push((spec.name().to_owned(), value));
                    }
                }
                ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword => match slot {
                    Some(value) if !kwargs_started => args.push(value),
                    Some(value) => kwargs.push((spec.name().to_owned(), value)),
                    None => kwargs_started = true,
                },
            }
        }
        kwargs.extend(self.var_kwargs);
        (args, kwargs)
    }

    #[must_use]
    pub fn into_arg_values(self) -> ArgValues<V> {
        let (args, kwargs) = self.into_call_args();
        ArgValues {
            positional: SmallVec::from_vec(args),
            keywords: kwargs,
        }
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&V> {
        self.slots[index].as_ref()
    }

    pub(crate) fn set_slot(&mut self, index: usize, value: V) {
        self.slots[index] = Some(value);
    }

    /// Fails if a required parameter is still unbound.
    ///
    /// Positional parameters are reported before keyword-only ones, like CPython does.
    pub(crate) fn check_complete(&self, function: &str) -> Result<(), BindError> {
        let missing = |pred: fn(ParamKind) -> bool| -> Vec<String> {
            self.params
                .iter()
                .zip(&self.slots)
                .filter(|(spec, slot)| pred(spec.kind()) && slot.is_none())
                .map(|(spec, _)| spec.name().to_owned())
                .collect()
        };
        let names = missing(ParamKind::is_positional);
        if !names.is_empty() {
            return Err(BindError::MissingPositional {
                function: function.to_owned(),
                names,
            });
        }
        let names = missing(|kind| kind == ParamKind::KeywordOnly);
        if !names.is_empty() {
            return Err(BindError::MissingKeywordOnly {
                function: function.to_owned(),
                names,
            });
        }
        Ok(())
    }

    fn slot_of(&self, name: &str) -> Option<usize> {
        self.params
            .iter()
            .position(|spec| spec.name() == name && !spec.kind().is_variadic())
    }
}

impl<V> Index<&str> for BoundArguments<V> {
    type Output = V;

    fn index(&self, name: &str) -> &V {
        match self.get(name) {
            Some(value) => value,
            None => panic!("no argument bound to '{name}'"),
        }
    }
}

/// Binds call arguments to parameters without requiring that every parameter is bound.
///
/// Fails on the same conditions a Python call would, except for missing arguments:
/// - more positional arguments than positional parameters and no `*args`
/// - a parameter given both by position and by keyword, or twice by keyword
/// - an unknown keyword and no `**kwargs`
/// - a positional-only parameter passed by keyword and no `**kwargs` to absorb it
pub fn bind_partial<V>(
    function: &str,
    params: &Arc<[ParamSpec<V>]>,
    args: ArgValues<V>,
) -> Result<BoundArguments<V>, BindError> {
    let mut slots: Vec<Option<V>> = params.iter().map(|_| None).collect();
    let has_var_args = params.iter().any(|p| p.kind() == ParamKind::VarPositional);
    let has_var_kwargs = params.iter().any(|p| p.kind() == ParamKind::VarKeyword);

    // positional parameters are always declared first
    let max_positional = params.iter().take_while(|p| p.kind().is_positional()).count();
    let given = args.positional.len();
    let mut positional = args.positional.into_iter();
    for slot in slots.iter_mut().take(max_positional) {
        match positional.next() {
            Some(value) => *slot = Some(value),
            None => break,
        }
    }
    let var_args: Vec<V> = positional.collect();
    if !var_args.is_empty() && !has_var_args {
        return Err(BindError::TooManyPositional {
            function: function.to_owned(),
            min: params[..max_positional].iter().filter(|p| !p.has_default()).count(),
            max: max_positional,
            given,
        });
    }

    let mut var_kwargs = IndexMap::new();
    let mut positional_only_as_keyword = Vec::new();
    for (name, value) in args.keywords {
        let target = params
            .iter()
            .position(|p| p.name() == name && !p.kind().is_variadic());
        match target {
            Some(i) if params[i].kind() != ParamKind::PositionalOnly => {
                if slots[i].is_some() {
                    return Err(BindError::MultipleValues {
                        function: function.to_owned(),
                        name,
                    });
                }
                slots[i] = Some(value);
            }
            Some(_) if !has_var_kwargs => positional_only_as_keyword.push(name),
            _ if has_var_kwargs => {
                if var_kwargs.contains_key(&name) {
                    return Err(BindError::MultipleValues {
                        function: function.to_owned(),
                        name,
                    });
                }
                var_kwargs.insert(name, value);
            }
            _ => {
                return Err(BindError::UnexpectedKeyword {
                    function: function.to_owned(),
                    name,
                });
            }
        }
    }
    if !positional_only_as_keyword.is_empty() {
        return Err(BindError::PositionalOnlyAsKeyword {
            function: function.to_owned(),
            names: positional_only_as_keyword,
        });
    }

    Ok(BoundArguments {
        params: Arc::clone(params),
        slots,
        var_args,
        var_kwargs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Object,
        signature::{FunctionDescriptor, Signature, SignatureBuilder},
    };

    fn params(builder: SignatureBuilder<Object>) -> Arc<[ParamSpec<Object>]> {
        let descriptor = FunctionDescriptor::from_signature("f", builder.build().unwrap());
        Arc::clone(descriptor.params())
    }

    fn int(args: &BoundArguments<Object>, name: &str) -> Option<i64> {
        args.get(name).and_then(Object::as_int)
    }

    #[test]
    fn positional_and_keyword_binding() {
        let p = params(Signature::builder().param("a").param("b").param_with_default("c", 0));
        let bound = bind_partial("f", &p, ArgValues::new().arg(1).kwarg("b", 2)).unwrap();
        assert_eq!(int(&bound, "a"), Some(1));
        assert_eq!(int(&bound, "b"), Some(2));
        assert!(!bound.is_bound("c"));
    }

    #[test]
    fn missing_arguments_are_not_an_error_until_checked() {
        let p = params(Signature::builder().param("a").keyword_only("k"));
        let bound = bind_partial("f", &p, ArgValues::new()).unwrap();
        let err = bound.check_complete("f").unwrap_err();
        assert_eq!(err.to_string(), "f() missing 1 required positional argument: 'a'");

        let bound = bind_partial("f", &p, ArgValues::new().arg(1)).unwrap();
        let err = bound.check_complete("f").unwrap_err();
        assert_eq!(err.to_string(), "f() missing 1 required keyword-only argument: 'k'");
    }

    #[test]
    fn too_many_positional() {
        let p = params(Signature::builder().param("a"));
        let err = bind_partial("f", &p, ArgValues::new().arg(1).arg(2)).unwrap_err();
        assert_eq!(err.to_string(), "f() takes 1 positional argument but 2 were given");
    }

    #[test]
    fn excess_goes_to_var_args_and_var_kwargs() {
        let p = params(Signature::builder().param("a").var_positional("args").var_keyword("kwargs"));
        let bound = bind_partial("f", &p, ArgValues::new().arg(1).arg(2).arg(3).kwarg("z", 9)).unwrap();
        assert_eq!(bound.var_args(), &[Object::from(2), Object::from(3)]);
        assert_eq!(bound.var_kwargs().get("z"), Some(&Object::from(9)));
        assert!(bound.get("args").is_none());
    }

    #[test]
    fn multiple_values_for_one_parameter() {
        let p = params(Signature::builder().param("a"));
        let err = bind_partial("f", &p, ArgValues::new().arg(1).kwarg("a", 2)).unwrap_err();
        assert_eq!(err.to_string(), "f() got multiple values for argument 'a'");
    }

    #[test]
    fn unexpected_keyword() {
        let p = params(Signature::builder().param("a"));
        let err = bind_partial("f", &p, ArgValues::new().kwarg("b", 2)).unwrap_err();
        assert_eq!(err.to_string(), "f() got an unexpected keyword argument 'b'");
    }

    #[test]
    fn positional_only_by_keyword() {
        let p = params(Signature::builder().positional_only("a"));
        let err = bind_partial("f", &p, ArgValues::new().kwarg("a", 1)).unwrap_err();
        assert!(matches!(err, BindError::PositionalOnlyAsKeyword { ref names, .. } if names == &["a"]));

        // with **kwargs the name is just another extra keyword
        let p = params(Signature::builder().positional_only("a").var_keyword("kw"));
        let bound = bind_partial("f", &p, ArgValues::new().arg(1).kwarg("a", 2)).unwrap();
        assert_eq!(int(&bound, "a"), Some(1));
        assert_eq!(bound.var_kwargs().get("a"), Some(&Object::from(2)));
    }

    #[test]
    fn call_args_round_trip_preserves_shape() {
        let p = params(
            Signature::builder()
                .param("a")
                .var_positional("args")
                .keyword_only("k")
                .var_keyword("kw"),
        );
        let bound = bind_partial(
            "f",
            &p,
            ArgValues::new().arg(1).arg(2).kwarg("k", 3).kwarg("x", 4),
        )
        .unwrap();
        let (args, kwargs) = bound.into_call_args();
        assert_eq!(args, [Object::from(1), Object::from(2)]);
        let names: Vec<&str> = kwargs.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["k", "x"]);
    }

    #[test]
    fn gap_in_positional_switches_to_keywords() {
        let p = params(Signature::builder().param_with_default("a", 0).param_with_default("b", 0));
        let bound = bind_partial("f", &p, ArgValues::new().kwarg("b", 5)).unwrap();
        let (args, kwargs) = bound.into_call_args();
        assert!(args.is_empty());
        assert_eq!(kwargs, [("b".to_owned(), Object::from(5))]);
    }

    #[test]
    #[should_panic(expected = "no argument bound to 'zz'")]
    fn index_panics_on_unbound_name() {
        let p = params(Signature::builder().param("a"));
        let bound = bind_partial("f", &p, ArgValues::new().arg(1)).unwrap();
        let _ = &bound["zz"];
    }
}
