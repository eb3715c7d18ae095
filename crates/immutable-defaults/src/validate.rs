//! Wrap-time consistency checks between the adapter options and a function's defaults.
//!
//! Several parameters can share one default object (`def f(a=xs, b=xs)`). Copying such
//! a group inconsistently would break the aliasing the function was written against,
//! so the whole group must be treated alike: all ignored or none, all deep or all
//! shallow.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::{
    copy::CopyDirective,
    error::ConfigError,
    signature::FunctionDescriptor,
    value::{DefaultValue, ObjectId},
};

/// Parameters whose defaults are one and the same object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityGroup {
    pub id: ObjectId,
    pub names: SmallVec<[String; 2]>,
}

impl IdentityGroup {
    fn names_vec(&self) -> Vec<String> {
        self.names.to_vec()
    }
}

/// Groups mutable defaults by identity, keeping only groups with more than one member.
///
/// Groups are ordered by their first parameter.
pub fn identity_groups<V: DefaultValue>(descriptor: &FunctionDescriptor<V>) -> Vec<IdentityGroup> {
    let mut by_id: IndexMap<ObjectId, SmallVec<[String; 2]>, ahash::RandomState> = IndexMap::default();
    for spec in descriptor.params().iter() {
        if spec.is_immutable() {
            continue;
        }
        if let Some(id) = spec.default().and_then(DefaultValue::identity) {
            by_id.entry(id).or_default().push(spec.name().to_owned());
        }
    }
    by_id
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(id, names)| IdentityGroup { id, names })
        .collect()
}

/// Rejects option combinations that cannot be honored for this function.
///
/// Checks run in a fixed order and the first failure wins:
/// 1. every name in `ignore` and in a deep-copy subset is a parameter with a default
/// 2. no name is both ignored and deep-copied
/// 3. no identity group is split between deep and shallow copying
/// 4. no identity group is split between ignored and copied
pub fn validate<V: DefaultValue>(
    descriptor: &FunctionDescriptor<V>,
    ignore: &BTreeSet<String>,
    directive: &CopyDirective,
) -> Result<(), ConfigError> {
    let deep_subset = match directive {
        CopyDirective::DeepOnly(names) => Some(names),
        CopyDirective::DeepAll | CopyDirective::ShallowAll => None,
    };

    let known = |name: &str| descriptor.param(name).is_some_and(|spec| spec.has_default());
    let named = ignore
        .iter()
        .map(|name| ("ignore", name))
        .chain(deep_subset.into_iter().flatten().map(|name| ("deepcopy", name)));
    for (option, name) in named {
        if !known(name) {
            return Err(ConfigError::UnknownParameter {
                function: descriptor.name().to_owned(),
                option,
                name: name.clone(),
            });
        }
    }

    if let Some(deep) = deep_subset
        && let Some(name) = ignore.intersection(deep).next()
    {
        return Err(ConfigError::IgnoredAndDeep { name: name.clone() });
    }

    let groups = identity_groups(descriptor);
    if let Some(deep) = deep_subset {
        for group in &groups {
            let in_deep: Vec<String> = group.names.iter().filter(|n| deep.contains(*n)).cloned().collect();
            if !in_deep.is_empty() && in_deep.len() < group.names.len() {
                return Err(ConfigError::SplitCopy {
                    group: group.names_vec(),
                    deep: in_deep,
                });
            }
        }
    }
    for group in &groups {
        let ignored: Vec<String> = group.names.iter().filter(|n| ignore.contains(*n)).cloned().collect();
        if !ignored.is_empty() && ignored.len() < group.names.len() {
            return Err(ConfigError::SplitIgnore {
                group: group.names_vec(),
                ignored,
            });
        }
    }
    Ok(())
}
