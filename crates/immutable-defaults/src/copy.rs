//! Copy policy resolution, plus shallow and deep copy for [`Object`].
//!
//! Shallow copies create new containers but share references to the original items.
//! Deep copies recursively copy all objects, handling shared and circular references
//! through a memo keyed by object identity, the way Python's `copy.deepcopy` does.

use std::collections::BTreeSet;

use ahash::AHashMap;
use serde::de::Error as _;

use crate::{
    error::{ConfigError, CopyError},
    object::{HashKey, MAX_DATA_RECURSION_DEPTH, Object, Shared},
    value::{DefaultValue, ObjectId},
};

/// Which defaults are copied deeply and which shallowly.
///
/// Configured once per wrapped function. `true`/`false` map to `DeepAll`/`ShallowAll`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CopyDirective {
    /// Deep copy every eligible default.
    #[default]
    DeepAll,
    /// Shallow copy every eligible default.
    ShallowAll,
    /// Deep copy the named parameters, shallow copy the rest.
    DeepOnly(BTreeSet<String>),
}

impl CopyDirective {
    pub fn deep_only<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::DeepOnly(names.into_iter().map(Into::into).collect())
    }
}

impl From<bool> for CopyDirective {
    fn from(deep: bool) -> Self {
        if deep { Self::DeepAll } else { Self::ShallowAll }
    }
}

/// Accepts the dynamic forms of the `deepcopy` option: a bool, or a list, tuple, set or
/// frozenset of parameter names.
impl TryFrom<&Object> for CopyDirective {
    type Error = ConfigError;

    fn try_from(obj: &Object) -> Result<Self, Self::Error> {
        let invalid = || ConfigError::InvalidDeepcopy {
            got: format!("{} {obj}", obj.type_name()),
        };
        let names: Vec<Object> = match obj {
            Object::Bool(b) => return Ok(Self::from(*b)),
            Object::List(list) => list.to_vec(),
            Object::Tuple(items) => items.to_vec(),
            Object::Set(set) => set.read().iter().cloned().map(Object::from).collect(),
            Object::FrozenSet(set) => set.iter().cloned().map(Object::from).collect(),
            _ => return Err(invalid()),
        };
        names
            .iter()
            .map(|name| name.as_str().map(str::to_owned).ok_or_else(invalid))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self::DeepOnly)
    }
}

impl<'de> serde::Deserialize<'de> for CopyDirective {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Names(Vec<String>),
        }

        match <Raw as serde::Deserialize>::deserialize(deserializer) {
            Ok(Raw::Flag(deep)) => Ok(Self::from(deep)),
            Ok(Raw::Names(names)) => Ok(Self::DeepOnly(names.into_iter().collect())),
            Err(_) => Err(D::Error::custom(
                "deepcopy must be a bool or a collection of parameter names",
            )),
        }
    }
}

/// How one default is duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum CopyMode {
    Deep,
    Shallow,
}

impl CopyMode {
    pub fn apply<V: DefaultValue>(self, value: &V) -> Result<V, V::Error> {
        match self {
            Self::Deep => value.deep_copy(),
            Self::Shallow => value.shallow_copy(),
        }
    }
}

/// Resolved form of a [`CopyDirective`]: answers "how is parameter `name` copied".
///
/// Pure and stateless; computed once per wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyPolicy {
    directive: CopyDirective,
}

impl CopyPolicy {
    #[must_use]
    pub fn resolve(directive: CopyDirective) -> Self {
        Self { directive }
    }

    #[must_use]
    pub fn mode_for(&self, name: &str) -> CopyMode {
        match &self.directive {
            CopyDirective::DeepAll => CopyMode::Deep,
            CopyDirective::ShallowAll => CopyMode::Shallow,
            CopyDirective::DeepOnly(names) if names.contains(name) => CopyMode::Deep,
            CopyDirective::DeepOnly(_) => CopyMode::Shallow,
        }
    }

    #[must_use]
    pub fn directive(&self) -> &CopyDirective {
        &self.directive
    }
}

impl DefaultValue for Object {
    type Error = CopyError;

    fn identity(&self) -> Option<ObjectId> {
        self.id()
    }

    fn is_immutable(&self) -> bool {
        Self::is_immutable(self)
    }

    fn shallow_copy(&self) -> Result<Self, CopyError> {
        shallow_copy(self)
    }

    fn deep_copy(&self) -> Result<Self, CopyError> {
        let mut memo = AHashMap::new();
        deep_copy(self, &mut memo, 0)
    }
}

/// Implementation of `copy.copy(x)`.
///
/// Immutable values are returned as-is. A tuple that holds mutable members gets a new
/// outer tuple so the result never aliases the original.
fn shallow_copy(obj: &Object) -> Result<Object, CopyError> {
    match obj {
        Object::List(list) => Ok(Object::List(Shared::new(list.to_vec()))),
        Object::Dict(dict) => Ok(Object::Dict(Shared::new(dict.read().clone()))),
        Object::Set(set) => Ok(Object::Set(Shared::new(set.read().clone()))),
        Object::Tuple(items) if !obj.is_immutable() => Ok(Object::Tuple(items.iter().cloned().collect())),
        Object::Resource(r) => Err(CopyError::Uncopyable {
            type_name: r.type_name().to_owned(),
        }),
        immutable => Ok(immutable.clone()),
    }
}

/// Implementation of `copy.deepcopy(x)`.
///
/// Containers are registered in the memo before their members are copied, so a
/// structure that contains itself copies to a structure that contains its copy.
fn deep_copy(obj: &Object, memo: &mut AHashMap<ObjectId, Object>, depth: u16) -> Result<Object, CopyError> {
    if obj.is_immutable() {
        return Ok(obj.clone());
    }
    if let Some(copied) = obj.id().and_then(|id| memo.get(&id)) {
        return Ok(copied.clone());
    }
    if depth >= MAX_DATA_RECURSION_DEPTH {
        return Err(CopyError::RecursionLimit {
            limit: MAX_DATA_RECURSION_DEPTH,
        });
    }

    match obj {
        Object::List(list) => {
            let new_list = Shared::new(Vec::new());
            memo.insert(list.id(), Object::List(new_list.clone()));
            // snapshot first: the list may contain itself
            let items = list.to_vec();
            let mut copied = Vec::with_capacity(items.len());
            for item in &items {
                copied.push(deep_copy(item, memo, depth + 1)?);
            }
            *new_list.write() = copied;
            Ok(Object::List(new_list))
        }
        Object::Dict(dict) => {
            let new_dict = Shared::default();
            memo.insert(dict.id(), Object::Dict(new_dict.clone()));
            let pairs: Vec<(HashKey, Object)> = dict.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            for (key, value) in pairs {
                let value = deep_copy(&value, memo, depth + 1)?;
                new_dict.write().insert(key, value);
            }
            Ok(Object::Dict(new_dict))
        }
        // members are hashable, hence immutable
        Object::Set(set) => {
            let copied = Object::Set(Shared::new(set.read().clone()));
            memo.insert(set.id(), copied.clone());
            Ok(copied)
        }
        Object::Tuple(items) => {
            let mut copied = Vec::with_capacity(items.len());
            for item in items.iter() {
                copied.push(deep_copy(item, memo, depth + 1)?);
            }
            // copying a member may already have copied this tuple through a cycle
            let id = obj.id();
            if let Some(existing) = id.and_then(|id| memo.get(&id)) {
                return Ok(existing.clone());
            }
            let tuple = Object::Tuple(copied.into());
            if let Some(id) = id {
                memo.insert(id, tuple.clone());
            }
            Ok(tuple)
        }
        Object::Resource(r) => Err(CopyError::Uncopyable {
            type_name: r.type_name().to_owned(),
        }),
        immutable => Ok(immutable.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shallow_copy_shares_nested_containers() {
        let inner = Object::list([Object::Int(1)]);
        let outer = Object::list([inner.clone()]);
        let copy = outer.shallow_copy().unwrap();
        assert!(!copy.is_same(&outer));
        assert!(copy.as_list().unwrap().get(0).unwrap().is_same(&inner));
    }

    #[test]
    fn deep_copy_duplicates_nested_containers() {
        let inner = Object::list([Object::Int(1)]);
        let outer = Object::dict([(HashKey::from("k"), inner.clone())]);
        let copy = outer.deep_copy().unwrap();
        assert_eq!(copy, outer);
        let copied_inner = copy.as_dict().unwrap().get(&HashKey::from("k")).unwrap();
        assert!(!copied_inner.is_same(&inner));
    }

    #[test]
    fn deep_copy_preserves_internal_aliasing() {
        let shared = Object::empty_list();
        let outer = Object::list([shared.clone(), shared]);
        let copy = outer.deep_copy().unwrap();
        let list = copy.as_list().unwrap();
        assert!(list.get(0).unwrap().is_same(&list.get(1).unwrap()));
    }

    #[test]
    fn deep_copy_handles_cycles() {
        let list = Object::empty_list();
        list.as_list().unwrap().push(list.clone());
        let copy = list.deep_copy().unwrap();
        let inner = copy.as_list().unwrap().get(0).unwrap();
        assert!(inner.is_same(&copy));
        assert!(!inner.is_same(&list));
    }

    #[test]
    fn deep_copy_of_cycle_through_tuple() {
        let list = Object::empty_list();
        let tuple = Object::tuple([list.clone()]);
        list.as_list().unwrap().push(tuple.clone());
        let copy = tuple.deep_copy().unwrap();
        let copied_list = copy.as_tuple().unwrap()[0].clone();
        assert!(!copied_list.is_same(&list));
        let back = copied_list.as_list().unwrap().get(0).unwrap();
        assert!(back.is_same(&copy));
    }

    #[test]
    fn immutable_values_copy_to_themselves() {
        let s = Object::str("hello");
        assert!(s.deep_copy().unwrap().is_same(&s));
        assert!(s.shallow_copy().unwrap().is_same(&s));
        let t = Object::tuple([Object::Int(1)]);
        assert!(t.deep_copy().unwrap().is_same(&t));
    }

    #[test]
    fn tuple_with_mutable_member_gets_new_identity() {
        let t = Object::tuple([Object::empty_list()]);
        assert!(!t.shallow_copy().unwrap().is_same(&t));
        assert!(!t.deep_copy().unwrap().is_same(&t));
    }

    #[test]
    fn resources_refuse_to_be_copied() {
        let lock = Object::resource("lock");
        assert_eq!(
            lock.deep_copy().unwrap_err(),
            CopyError::Uncopyable {
                type_name: "lock".to_owned()
            }
        );
        assert!(lock.shallow_copy().is_err());
    }

    #[test]
    fn deep_copy_stops_at_recursion_limit() {
        let mut value = Object::empty_list();
        for _ in 0..=MAX_DATA_RECURSION_DEPTH {
            value = Object::list([value]);
        }
        assert_eq!(
            value.deep_copy().unwrap_err(),
            CopyError::RecursionLimit {
                limit: MAX_DATA_RECURSION_DEPTH
            }
        );
    }

    #[test]
    fn policy_resolves_named_subset() {
        let policy = CopyPolicy::resolve(CopyDirective::deep_only(["a"]));
        assert_eq!(policy.mode_for("a"), CopyMode::Deep);
        assert_eq!(policy.mode_for("b"), CopyMode::Shallow);
        assert_eq!(CopyPolicy::resolve(true.into()).mode_for("b"), CopyMode::Deep);
        assert_eq!(CopyPolicy::resolve(false.into()).mode_for("a"), CopyMode::Shallow);
    }

    #[test]
    fn directive_from_dynamic_values() {
        assert_eq!(CopyDirective::try_from(&Object::Bool(false)), Ok(CopyDirective::ShallowAll));
        assert_eq!(
            CopyDirective::try_from(&Object::list([Object::str("a"), Object::str("b")])),
            Ok(CopyDirective::deep_only(["a", "b"]))
        );
        let err = CopyDirective::try_from(&Object::Int(3)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "deepcopy must be a bool or a collection of parameter names, got int 3"
        );
        assert!(CopyDirective::try_from(&Object::list([Object::Int(1)])).is_err());
    }

    #[test]
    fn directive_from_json() {
        let deep: CopyDirective = serde_json::from_str("true").unwrap();
        assert_eq!(deep, CopyDirective::DeepAll);
        let subset: CopyDirective = serde_json::from_str(r#"["x"]"#).unwrap();
        assert_eq!(subset, CopyDirective::deep_only(["x"]));
        let err = serde_json::from_str::<CopyDirective>("3").unwrap_err();
        assert!(err.to_string().contains("deepcopy must be a bool"));
    }
}
