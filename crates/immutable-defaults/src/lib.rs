#![doc = include_str!("../../../README.md")]

mod args;
mod copy;
mod error;
mod object;
mod signature;
mod validate;
mod value;
mod wrapper;

pub use crate::{
    args::{ArgValues, BoundArguments, bind_partial},
    copy::{CopyDirective, CopyMode, CopyPolicy},
    error::{
        BindError, CallError, ConfigError, CopyError, SignatureError, UnhashableError, WrapError, WrapResult,
    },
    object::{Dict, DictMap, FloatKey, HashKey, List, MAX_DATA_RECURSION_DEPTH, Object, Resource, Set, SetItems, Shared},
    signature::{Callable, Function, FunctionDescriptor, Param, ParamKind, ParamSpec, Signature, SignatureBuilder},
    validate::{IdentityGroup, identity_groups, validate},
    value::{DefaultValue, ObjectId},
    wrapper::{AdapterConfig, ImmutableDefaults, Wrapped, immutable_defaults},
};
