//! End-to-end scenarios: functions that mutate their defaults, wrapped with various
//! options, called repeatedly.

use immutable_defaults::{
    ArgValues, BindError, BoundArguments, CallError, Function, ImmutableDefaults, Object, Signature, immutable_defaults,
};
use pretty_assertions::assert_eq;

type Body = fn(BoundArguments<Object>) -> Result<Object, CallError>;

/// Appends `"world"` to every list argument and returns all named arguments as a tuple.
fn append_world(args: BoundArguments<Object>) -> Result<Object, CallError> {
    for (_, value) in args.arguments() {
        if let Some(list) = value.as_list() {
            list.push("world");
        }
    }
    Ok(Object::tuple(args.arguments().map(|(_, v)| v.clone())))
}

/// `def f(a, b, c=[])`
fn abc() -> Function<Object, Body> {
    let sig = Signature::<Object>::builder()
        .param("a")
        .param("b")
        .param_with_default("c", Object::empty_list())
        .build()
        .unwrap();
    Function::new("f", sig, append_world as Body)
}

fn call(f: &impl Fn(ArgValues<Object>) -> Result<Object, CallError>, a: i64, b: i64) -> String {
    f(ArgValues::new().arg(a).arg(b)).unwrap().to_string()
}

#[test]
fn repeated_calls_are_not_cumulative() {
    let wrapped = immutable_defaults(abc()).unwrap();
    let f = |args| wrapped.call(args);
    assert_eq!(call(&f, 1, 2), "(1, 2, ['world'])");
    assert_eq!(call(&f, 1, 2), "(1, 2, ['world'])");
}

#[test]
fn ignored_parameter_accumulates() {
    let wrapped = ImmutableDefaults::new().ignore(["c"]).wrap(abc()).unwrap();
    let f = |args| wrapped.call(args);
    assert_eq!(call(&f, 1, 2), "(1, 2, ['world'])");
    assert_eq!(call(&f, 1, 3), "(1, 3, ['world', 'world'])");
    assert_eq!(call(&f, 1, 4), "(1, 4, ['world', 'world', 'world'])");
}

#[test]
fn ignored_and_copied_side_by_side() {
    // def f(a=["hello"], b=[]) with ignore=["b"]
    let sig = Signature::<Object>::builder()
        .param_with_default("a", Object::list([Object::str("hello")]))
        .param_with_default("b", Object::empty_list())
        .build()
        .unwrap();
    let wrapped = ImmutableDefaults::new()
        .ignore(["b"])
        .wrap(Function::new("f", sig, append_world as Body))
        .unwrap();
    let results: Vec<String> = (0..3)
        .map(|_| wrapped.call(ArgValues::new()).unwrap().to_string())
        .collect();
    assert_eq!(
        results,
        [
            "(['hello', 'world'], ['world'])",
            "(['hello', 'world'], ['world', 'world'])",
            "(['hello', 'world'], ['world', 'world', 'world'])",
        ]
    );
}

#[test]
fn explicit_configuration_equals_the_default_one() {
    let explicit = ImmutableDefaults::new().ignore(Vec::<String>::new()).deepcopy(true);
    assert_eq!(explicit, ImmutableDefaults::default());
    let a = explicit.wrap(abc()).unwrap();
    let b = immutable_defaults(abc()).unwrap();
    assert_eq!(a.policy(), b.policy());
    assert_eq!(
        a.call(ArgValues::new().arg(1).arg(2)).unwrap(),
        b.call(ArgValues::new().arg(1).arg(2)).unwrap()
    );
}

// =============================================================================
// Parameter kinds
// =============================================================================

/// `def g(a, /, *args, k=[], **kwargs)`
fn all_kinds() -> Function<Object, Body> {
    fn body(args: BoundArguments<Object>) -> Result<Object, CallError> {
        let k = args["k"].clone();
        if let Some(list) = k.as_list() {
            list.push(i64::try_from(args.var_args().len()).unwrap());
            list.push(i64::try_from(args.var_kwargs().len()).unwrap());
        }
        Ok(k)
    }
    let sig = Signature::<Object>::builder()
        .positional_only("a")
        .var_positional("args")
        .keyword_only_with_default("k", Object::empty_list())
        .var_keyword("kwargs")
        .build()
        .unwrap();
    Function::new("g", sig, body as Body)
}

#[test]
fn keyword_only_default_is_fresh() {
    let wrapped = immutable_defaults(all_kinds()).unwrap();
    let first = wrapped.call(ArgValues::new().arg(0).arg(1).arg(2)).unwrap();
    let second = wrapped.call(ArgValues::new().arg(0).kwarg("x", 1)).unwrap();
    assert_eq!(first.to_string(), "[2, 0]");
    assert_eq!(second.to_string(), "[0, 1]");
}

#[test]
fn positional_only_name_lands_in_kwargs() {
    let wrapped = immutable_defaults(all_kinds()).unwrap();
    let result = wrapped.call(ArgValues::new().arg(0).kwarg("a", 1)).unwrap();
    assert_eq!(result.to_string(), "[0, 1]");
}

#[test]
fn missing_required_argument_is_reported_after_substitution() {
    let wrapped = immutable_defaults(abc()).unwrap();
    let err = wrapped.call(ArgValues::new().arg(1)).unwrap_err();
    assert_eq!(
        err,
        CallError::Bind(BindError::MissingPositional {
            function: "f".to_owned(),
            names: vec!["b".to_owned()],
        })
    );
    assert_eq!(err.to_string(), "TypeError: f() missing 1 required positional argument: 'b'");
}

#[test]
fn binding_errors_fail_before_the_body_runs() {
    let wrapped = immutable_defaults(abc()).unwrap();
    let too_many = wrapped.call(ArgValues::new().arg(1).arg(2).arg(3).arg(4)).unwrap_err();
    assert_eq!(too_many.to_string(), "TypeError: f() takes from 2 to 3 positional arguments but 4 were given");
    let unexpected = wrapped.call(ArgValues::new().arg(1).arg(2).kwarg("d", 0)).unwrap_err();
    assert_eq!(unexpected.to_string(), "TypeError: f() got an unexpected keyword argument 'd'");
}
