use std::{
    fmt::{self, Write},
    hash::{Hash, Hasher},
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use indexmap::{IndexMap, IndexSet};
use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use smallvec::SmallVec;

use crate::{error::UnhashableError, value::ObjectId};

/// Maximum nesting depth for structural operations (equality, repr, copy).
///
/// Protects against stack overflow when traversing deeply nested values such as a list
/// wrapped in itself a thousand times. Lower in debug builds, which use more stack per
/// frame.
#[cfg(debug_assertions)]
pub const MAX_DATA_RECURSION_DEPTH: u16 = 100;

/// Maximum nesting depth for structural operations (equality, repr, copy).
#[cfg(not(debug_assertions))]
pub const MAX_DATA_RECURSION_DEPTH: u16 = 500;

/// Insertion-ordered storage behind a dict.
pub type DictMap = IndexMap<HashKey, Object, ahash::RandomState>;

/// Insertion-ordered storage behind a set or frozenset.
pub type SetItems = IndexSet<HashKey, ahash::RandomState>;

/// A mutable container shared by reference.
///
/// Cloning a `Shared` aliases the container, just like binding a second Python name to
/// the same list. Each container has a stable identity for as long as any alias lives.
pub struct Shared<T>(Arc<RwLock<T>>);

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Locks the container for reading. A poisoned lock is recovered: values hold no
    /// invariants that a panicking writer could break halfway.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks the container for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Identity of the shared storage.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        ObjectId::from_addr(Arc::as_ptr(&self.0).cast::<()>() as usize)
    }

    /// Whether both handles alias the same container.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Default> Default for Shared<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_read() {
            Ok(guard) => fmt::Debug::fmt(&*guard, f),
            Err(_) => write!(f, "<locked {}>", self.id()),
        }
    }
}

/// Python list: a mutable sequence.
pub type List = Shared<Vec<Object>>;

/// Python dict: a mutable, insertion-ordered mapping.
pub type Dict = Shared<DictMap>;

/// Python set: a mutable collection of unique hashable members.
pub type Set = Shared<SetItems>;

impl Shared<Vec<Object>> {
    pub fn push(&self, item: impl Into<Object>) {
        self.write().push(item.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Returns an alias of the item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Object> {
        self.read().get(index).cloned()
    }

    /// Snapshot of the items; containers inside stay aliased.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Object> {
        self.read().clone()
    }
}

impl Shared<DictMap> {
    pub fn insert(&self, key: impl Into<HashKey>, value: impl Into<Object>) -> Option<Object> {
        self.write().insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &HashKey) -> Option<Object> {
        self.read().get(key).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl Shared<SetItems> {
    /// Adds a member, returning whether it was new.
    pub fn add(&self, item: impl Into<HashKey>) -> bool {
        self.write().insert(item.into())
    }

    #[must_use]
    pub fn contains(&self, item: &HashKey) -> bool {
        self.read().contains(item)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Handle to something outside the value model: an open file, a lock, a socket.
///
/// Resources have identity but no copy semantics, so copying one fails, the way
/// `copy.deepcopy` refuses a `threading.Lock`.
#[derive(Clone)]
pub struct Resource(Arc<str>);

impl Resource {
    pub fn new(type_name: &str) -> Self {
        Self(Arc::from(type_name))
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        ObjectId::from_addr(Arc::as_ptr(&self.0).cast::<u8>() as usize)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} object at {}>", self.0, self.id())
    }
}

/// A dynamically typed value with Python reference semantics.
///
/// Immediates and immutable containers are plain values. `List`, `Dict` and `Set` are
/// references: cloning an `Object` that holds one aliases the container rather than
/// duplicating it, which is exactly the behavior that makes mutable defaults dangerous
/// and that the wrapper neutralizes.
///
/// # Equality
///
/// `PartialEq` is Python's `==` (value equality, numbers compare across int/float/bool).
/// Identity is [`Object::is_same`].
#[derive(Clone)]
pub enum Object {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex { real: f64, imag: f64 },
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    Tuple(Arc<[Object]>),
    FrozenSet(Arc<SetItems>),
    List(List),
    Dict(Dict),
    Set(Set),
    Resource(Resource),
}

impl Object {
    /// Creates a new list; every call produces a distinct object.
    pub fn list(items: impl IntoIterator<Item = Self>) -> Self {
        Self::List(Shared::new(items.into_iter().collect()))
    }

    pub fn empty_list() -> Self {
        Self::List(List::default())
    }

    pub fn dict(pairs: impl IntoIterator<Item = (HashKey, Self)>) -> Self {
        Self::Dict(Shared::new(pairs.into_iter().collect()))
    }

    pub fn empty_dict() -> Self {
        Self::Dict(Dict::default())
    }

    pub fn set(items: impl IntoIterator<Item = HashKey>) -> Self {
        Self::Set(Shared::new(items.into_iter().collect()))
    }

    pub fn tuple(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    pub fn frozenset(items: impl IntoIterator<Item = HashKey>) -> Self {
        Self::FrozenSet(Arc::new(items.into_iter().collect()))
    }

    pub fn str(s: &str) -> Self {
        Self::String(Arc::from(s))
    }

    pub fn bytes(b: &[u8]) -> Self {
        Self::Bytes(Arc::from(b))
    }

    pub fn resource(type_name: &str) -> Self {
        Self::Resource(Resource::new(type_name))
    }

    /// Python type name, as reported by `type(x).__name__`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Complex { .. } => "complex",
            Self::String(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::Tuple(_) => "tuple",
            Self::FrozenSet(_) => "frozenset",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
            Self::Resource(r) => r.type_name(),
        }
    }

    /// Identity of the underlying object. Immediates have none.
    #[must_use]
    pub fn id(&self) -> Option<ObjectId> {
        match self {
            Self::None | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Complex { .. } => None,
            Self::String(s) => Some(ObjectId::from_addr(Arc::as_ptr(s).cast::<u8>() as usize)),
            Self::Bytes(b) => Some(ObjectId::from_addr(Arc::as_ptr(b).cast::<u8>() as usize)),
            Self::Tuple(t) => Some(ObjectId::from_addr(Arc::as_ptr(t).cast::<Self>() as usize)),
            Self::FrozenSet(s) => Some(ObjectId::from_addr(Arc::as_ptr(s) as usize)),
            Self::List(l) => Some(l.id()),
            Self::Dict(d) => Some(d.id()),
            Self::Set(s) => Some(s.id()),
            Self::Resource(r) => Some(r.id()),
        }
    }

    /// Python's `is`.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        matches!((self.id(), other.id()), (Some(a), Some(b)) if a == b)
    }

    /// Whether the value can never change after creation.
    ///
    /// Tuples only qualify when every member does: a tuple holding a list can still
    /// observe mutations through that list.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.is_immutable_depth(0)
    }

    fn is_immutable_depth(&self, depth: u16) -> bool {
        match self {
            Self::None
            | Self::Bool(_)
            | Self::Int(_)
            | Self::Float(_)
            | Self::Complex { .. }
            | Self::String(_)
            | Self::Bytes(_)
            | Self::FrozenSet(_) => true,
            Self::Tuple(items) => {
                depth < MAX_DATA_RECURSION_DEPTH && items.iter().all(|item| item.is_immutable_depth(depth + 1))
            }
            Self::List(_) | Self::Dict(_) | Self::Set(_) | Self::Resource(_) => false,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Self::Set(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_tuple(&self) -> Option<&[Self]> {
        match self {
            Self::Tuple(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Python truth value testing.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Complex { real, imag } => *real != 0.0 || *imag != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Bytes(b) => !b.is_empty(),
            Self::Tuple(t) => !t.is_empty(),
            Self::FrozenSet(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Dict(d) => !d.is_empty(),
            Self::Set(s) => !s.is_empty(),
            Self::Resource(_) => true,
        }
    }

    fn py_eq(&self, other: &Self, depth: u16) -> bool {
        if self.is_same(other) {
            return true;
        }
        if depth >= MAX_DATA_RECURSION_DEPTH {
            return false;
        }
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Float(f), other) | (other, Self::Float(f)) => other.as_int().is_some_and(|i| i as f64 == *f),
            (Self::Bool(_) | Self::Int(_), Self::Bool(_) | Self::Int(_)) => self.as_int() == other.as_int(),
            (Self::Complex { real: ar, imag: ai }, Self::Complex { real: br, imag: bi }) => ar == br && ai == bi,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => seq_eq(a, b, depth),
            (Self::List(a), Self::List(b)) => seq_eq(&a.read(), &b.read(), depth),
            (Self::Dict(a), Self::Dict(b)) => {
                let (a, b) = (a.read(), b.read());
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.py_eq(other, depth + 1)))
            }
            (Self::Set(a), Self::Set(b)) => *a.read() == *b.read(),
            (Self::Set(a), Self::FrozenSet(b)) | (Self::FrozenSet(b), Self::Set(a)) => *a.read() == **b,
            (Self::FrozenSet(a), Self::FrozenSet(b)) => a == b,
            _ => false,
        }
    }
}

fn seq_eq(a: &[Object], b: &[Object], depth: u16) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.py_eq(y, depth + 1))
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.py_eq(other, 0)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// `Display` renders Python's `repr()`, including `[...]` for self-references.
impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        let mut active = SmallVec::<[ObjectId; 8]>::new();
        self.repr_into(&mut out, &mut active)?;
        f.write_str(&out)
    }
}

impl Object {
    fn repr_into(&self, out: &mut String, active: &mut SmallVec<[ObjectId; 8]>) -> fmt::Result {
        if let Some(id) = self.id()
            && active.contains(&id)
        {
            return out.write_str(match self {
                Self::Dict(_) => "{...}",
                _ => "[...]",
            });
        }
        if active.len() >= usize::from(MAX_DATA_RECURSION_DEPTH) {
            return out.write_str("...");
        }
        match self {
            Self::None => out.write_str("None"),
            Self::Bool(true) => out.write_str("True"),
            Self::Bool(false) => out.write_str("False"),
            Self::Int(i) => write!(out, "{i}"),
            Self::Float(v) => write_float(out, *v),
            Self::Complex { real, imag } => {
                if *real == 0.0 {
                    write_float(out, *imag)?;
                    out.write_char('j')
                } else {
                    out.write_char('(')?;
                    write_float(out, *real)?;
                    if *imag >= 0.0 || imag.is_nan() {
                        out.write_char('+')?;
                    }
                    write_float(out, *imag)?;
                    out.write_str("j)")
                }
            }
            Self::String(s) => write_str_repr(out, s),
            Self::Bytes(b) => {
                out.write_str("b'")?;
                for &byte in b.iter() {
                    match byte {
                        b'\'' => out.write_str("\\'")?,
                        b'\\' => out.write_str("\\\\")?,
                        b'\n' => out.write_str("\\n")?,
                        0x20..=0x7e => out.write_char(char::from(byte))?,
                        _ => write!(out, "\\x{byte:02x}")?,
                    }
                }
                out.write_char('\'')
            }
            Self::Tuple(items) => {
                out.write_char('(')?;
                self.repr_seq(out, active, items.iter())?;
                if items.len() == 1 {
                    out.write_char(',')?;
                }
                out.write_char(')')
            }
            Self::List(list) => {
                out.write_char('[')?;
                let items = list.to_vec();
                self.repr_seq(out, active, items.iter())?;
                out.write_char(']')
            }
            Self::Dict(dict) => {
                let pairs: Vec<(HashKey, Self)> = dict.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                out.write_char('{')?;
                if let Some(id) = self.id() {
                    active.push(id);
                }
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    Self::from(key.clone()).repr_into(out, active)?;
                    out.write_str(": ")?;
                    value.repr_into(out, active)?;
                }
                active.pop();
                out.write_char('}')
            }
            Self::Set(set) => {
                let items: Vec<Self> = set.read().iter().cloned().map(Self::from).collect();
                if items.is_empty() {
                    return out.write_str("set()");
                }
                out.write_char('{')?;
                self.repr_seq(out, active, items.iter())?;
                out.write_char('}')
            }
            Self::FrozenSet(set) => {
                if set.is_empty() {
                    return out.write_str("frozenset()");
                }
                let items: Vec<Self> = set.iter().cloned().map(Self::from).collect();
                out.write_str("frozenset({")?;
                self.repr_seq(out, active, items.iter())?;
                out.write_str("})")
            }
            Self::Resource(r) => write!(out, "{r:?}"),
        }
    }

    fn repr_seq<'a>(
        &self,
        out: &mut String,
        active: &mut SmallVec<[ObjectId; 8]>,
        items: impl Iterator<Item = &'a Self>,
    ) -> fmt::Result {
        if let Some(id) = self.id() {
            active.push(id);
        }
        for (i, item) in items.enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            item.repr_into(out, active)?;
        }
        if self.id().is_some() {
            active.pop();
        }
        Ok(())
    }
}

fn write_float(out: &mut String, v: f64) -> fmt::Result {
    if v.is_nan() {
        out.write_str("nan")
    } else if v.is_infinite() {
        out.write_str(if v > 0.0 { "inf" } else { "-inf" })
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        write!(out, "{v:.1}")
    } else {
        write!(out, "{v}")
    }
}

fn write_str_repr(out: &mut String, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    out.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\t' => out.write_str("\\t")?,
            c if c == quote => {
                out.write_char('\\')?;
                out.write_char(c)?;
            }
            c => out.write_char(c)?,
        }
    }
    out.write_char(quote)
}

/// A hashable, immutable value: a set member or a dict key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    None,
    Bool(bool),
    Int(i64),
    Float(FloatKey),
    String(Arc<str>),
    Bytes(Arc<[u8]>),
    Tuple(Arc<[HashKey]>),
}

/// An `f64` usable as a hash key; `-0.0` and `0.0` are the same key.
#[derive(Debug, Clone, Copy)]
pub struct FloatKey(f64);

impl FloatKey {
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }

    fn bits(self) -> u64 {
        if self.0 == 0.0 { 0 } else { self.0.to_bits() }
    }
}

impl PartialEq for FloatKey {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for FloatKey {}

impl Hash for FloatKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl From<&str> for HashKey {
    fn from(s: &str) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<String> for HashKey {
    fn from(s: String) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<i64> for HashKey {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for HashKey {
    fn from(f: f64) -> Self {
        Self::Float(FloatKey(f))
    }
}

impl From<bool> for HashKey {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<HashKey> for Object {
    fn from(key: HashKey) -> Self {
        match key {
            HashKey::None => Self::None,
            HashKey::Bool(b) => Self::Bool(b),
            HashKey::Int(i) => Self::Int(i),
            HashKey::Float(f) => Self::Float(f.get()),
            HashKey::String(s) => Self::String(s),
            HashKey::Bytes(b) => Self::Bytes(b),
            HashKey::Tuple(items) => Self::Tuple(items.iter().cloned().map(Self::from).collect()),
        }
    }
}

impl TryFrom<&Object> for HashKey {
    type Error = UnhashableError;

    fn try_from(obj: &Object) -> Result<Self, Self::Error> {
        match obj {
            Object::None => Ok(Self::None),
            Object::Bool(b) => Ok(Self::Bool(*b)),
            Object::Int(i) => Ok(Self::Int(*i)),
            Object::Float(f) => Ok(Self::Float(FloatKey(*f))),
            Object::String(s) => Ok(Self::String(Arc::clone(s))),
            Object::Bytes(b) => Ok(Self::Bytes(Arc::clone(b))),
            Object::Tuple(items) => items
                .iter()
                .map(Self::try_from)
                .collect::<Result<Arc<[Self]>, _>>()
                .map(Self::Tuple),
            other => Err(UnhashableError {
                type_name: match other {
                    Object::List(_) => "list",
                    Object::Dict(_) => "dict",
                    Object::Set(_) => "set",
                    Object::FrozenSet(_) => "frozenset",
                    Object::Complex { .. } => "complex",
                    _ => "object",
                },
            }),
        }
    }
}

impl TryFrom<Object> for HashKey {
    type Error = UnhashableError;

    fn try_from(obj: Object) -> Result<Self, Self::Error> {
        Self::try_from(&obj)
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Object {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Object {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Object {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Object {
    fn from(s: &str) -> Self {
        Self::str(s)
    }
}

impl From<String> for Object {
    fn from(s: String) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<Vec<Self>> for Object {
    fn from(items: Vec<Self>) -> Self {
        Self::List(Shared::new(items))
    }
}

/// Builds objects from JSON literals: arrays become fresh lists, objects fresh dicts.
impl From<serde_json::Value> for Object {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::from(s),
            serde_json::Value::Array(items) => Self::list(items.into_iter().map(Self::from)),
            serde_json::Value::Object(map) => {
                Self::dict(map.into_iter().map(|(k, v)| (HashKey::from(k), Self::from(v))))
            }
        }
    }
}

/// Natural JSON mapping; types JSON cannot express are tagged (`{"$tuple": [...]}`).
impl serde::Serialize for Object {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Complex { real, imag } => {
                let mut s = serializer.serialize_struct("$complex", 2)?;
                s.serialize_field("real", real)?;
                s.serialize_field("imag", imag)?;
                s.end()
            }
            Self::String(s) => serializer.serialize_str(s),
            Self::Bytes(b) => tagged(serializer, "$bytes", &**b),
            Self::Tuple(items) => tagged(serializer, "$tuple", &**items),
            Self::FrozenSet(items) => tagged(serializer, "$frozenset", &keys_to_objects(items.iter())),
            Self::List(list) => {
                let items = list.to_vec();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in &items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Dict(dict) => {
                let pairs: Vec<(HashKey, Self)> = dict.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (key, value) in &pairs {
                    match key {
                        HashKey::String(s) => map.serialize_entry(&**s, value)?,
                        other => map.serialize_entry(&Self::from(other.clone()).to_string(), value)?,
                    }
                }
                map.end()
            }
            Self::Set(set) => {
                let items = keys_to_objects(set.read().iter());
                tagged(serializer, "$set", &items)
            }
            Self::Resource(r) => tagged(serializer, "$resource", r.type_name()),
        }
    }
}

fn keys_to_objects<'a>(keys: impl Iterator<Item = &'a HashKey>) -> Vec<Object> {
    keys.cloned().map(Object::from).collect()
}

fn tagged<S: serde::Serializer, T: serde::Serialize + ?Sized>(
    serializer: S,
    tag: &'static str,
    value: &T,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(tag, value)?;
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_alias_containers() {
        let list = Object::empty_list();
        let alias = list.clone();
        alias.as_list().unwrap().push(1);
        assert!(list.is_same(&alias));
        assert_eq!(list.as_list().unwrap().len(), 1);
    }

    #[test]
    fn equal_lists_are_not_the_same_object() {
        let a = Object::list([Object::Int(1)]);
        let b = Object::list([Object::Int(1)]);
        assert_eq!(a, b);
        assert!(!a.is_same(&b));
    }

    #[test]
    fn numbers_compare_across_kinds() {
        assert_eq!(Object::Int(1), Object::Float(1.0));
        assert_eq!(Object::Bool(true), Object::Int(1));
        assert_ne!(Object::Int(2), Object::Float(2.5));
    }

    #[test]
    fn immediates_have_no_identity() {
        assert_eq!(Object::Int(3).id(), None);
        assert!(Object::str("a").id().is_some());
    }

    #[test]
    fn tuple_immutability_is_recursive() {
        assert!(Object::tuple([Object::Int(1), Object::str("a")]).is_immutable());
        assert!(!Object::tuple([Object::empty_list()]).is_immutable());
        assert!(Object::frozenset([HashKey::Int(1)]).is_immutable());
        assert!(!Object::empty_dict().is_immutable());
    }

    #[test]
    fn repr_matches_python() {
        let obj = Object::tuple([
            Object::Int(1),
            Object::list([Object::str("world"), Object::Float(2.0)]),
            Object::None,
        ]);
        assert_eq!(obj.to_string(), "(1, ['world', 2.0], None)");
        assert_eq!(Object::tuple([Object::Int(1)]).to_string(), "(1,)");
        assert_eq!(Object::set([]).to_string(), "set()");
        assert_eq!(
            Object::dict([(HashKey::from("k"), Object::Bool(true))]).to_string(),
            "{'k': True}"
        );
    }

    #[test]
    fn repr_of_self_containing_list() {
        let list = Object::empty_list();
        list.as_list().unwrap().push(list.clone());
        assert_eq!(list.to_string(), "[[...]]");
    }

    #[test]
    fn unhashable_values_are_rejected() {
        let err = HashKey::try_from(&Object::empty_list()).unwrap_err();
        assert_eq!(err.to_string(), "unhashable type: 'list'");
        assert!(HashKey::try_from(&Object::tuple([Object::Int(1)])).is_ok());
    }

    #[test]
    fn float_keys_treat_signed_zero_as_one_key() {
        let set = Object::set([HashKey::Float(FloatKey(0.0)), HashKey::Float(FloatKey(-0.0))]);
        assert_eq!(set.as_set().unwrap().len(), 1);
    }

    #[test]
    fn json_round_trip_uses_natural_mapping() {
        let obj = Object::from(serde_json::json!({"a": [1, 2.5, null], "b": "x"}));
        let back = serde_json::to_value(&obj).unwrap();
        assert_eq!(back, serde_json::json!({"a": [1, 2.5, null], "b": "x"}));
        let tagged = serde_json::to_value(Object::tuple([Object::Int(1)])).unwrap();
        assert_eq!(tagged, serde_json::json!({"$tuple": [1]}));
    }
}
