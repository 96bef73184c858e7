use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use bzlweave_syntax::syntax::ast::nodes::Body;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::attr::Attr;
use crate::error::{BzlResult, Error};
use crate::eval::{Ctx, FileKind, Globals, Source};
use crate::rule::RuleClass;
use crate::select::Lazy;

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    String(String),
    List(Rc<ListValue>),
    Dict(Rc<DictValue>),
    Builtin(Rc<Builtin>),
    Function(Rc<Function>),
    Struct(Rc<StructValue>),
    RuleClass(Rc<RuleClass>),
    Attr(Rc<Attr>),
    Lazy(Rc<Lazy>),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(ListValue::new(items)))
    }

    pub fn dict(entries: IndexMap<Key, Value>) -> Value {
        Value::Dict(Rc::new(DictValue::new(entries)))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::Function(_) => "function",
            Value::Struct(_) => "struct",
            Value::RuleClass(_) => "rule",
            Value::Attr(_) => "Attribute",
            Value::Lazy(_) => "select",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Makes lists and dicts reachable from this value immutable.
    pub fn freeze(&self) {
        match self {
            Value::List(list) => {
                if !list.frozen.replace(true) {
                    list.items.borrow().iter().for_each(Value::freeze);
                }
            }
            Value::Dict(dict) => {
                if !dict.frozen.replace(true) {
                    dict.entries.borrow().values().for_each(Value::freeze);
                }
            }
            Value::Lazy(lazy) => lazy.freeze(),
            _ => {}
        }
    }

    /// Whether the list or dict at `container` can be reached from this value.
    fn reaches(&self, container: *const ()) -> bool {
        match self {
            Value::List(list) => {
                std::ptr::eq(Rc::as_ptr(list).cast(), container)
                    || list.items().iter().any(|v| v.reaches(container))
            }
            Value::Dict(dict) => {
                std::ptr::eq(Rc::as_ptr(dict).cast(), container)
                    || dict.entries().values().any(|v| v.reaches(container))
            }
            Value::Lazy(lazy) => lazy.any_value(&mut |v: &Value| v.reaches(container)),
            _ => false,
        }
    }

    pub fn add(&self, rhs: &Value) -> BzlResult<Value> {
        match (self, rhs) {
            (Value::Lazy(_), _) | (_, Value::Lazy(_)) => Ok(Lazy::sum(self, rhs)),
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(*b)
                .map(Value::Int)
                .ok_or_else(|| Error::invalid_value(format!("integer overflow in {a} + {b}"))),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => Ok(Value::list(
                a.items().iter().chain(b.items().iter()).cloned().collect(),
            )),
            _ => Err(Error::invalid_value(format!(
                "unsupported operand types for +: '{}' and '{}'",
                self.type_name(),
                rhs.type_name()
            ))),
        }
    }

    pub fn expect_string(&self, what: &str) -> BzlResult<String> {
        match self {
            Value::String(s) => Ok(s.clone()),
            other => Err(unexpected_type(what, "a string", other)),
        }
    }

    pub fn expect_bool(&self, what: &str) -> BzlResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(unexpected_type(what, "a bool", other)),
        }
    }

    pub fn expect_int(&self, what: &str) -> BzlResult<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(unexpected_type(what, "an int", other)),
        }
    }

    pub fn expect_string_list(&self, what: &str) -> BzlResult<Vec<String>> {
        match self {
            Value::List(list) => list
                .items()
                .iter()
                .map(|item| item.expect_string(&format!("element of {what}")))
                .collect(),
            other => Err(unexpected_type(what, "a list of strings", other)),
        }
    }

    pub fn expect_string_dict(&self, what: &str) -> BzlResult<IndexMap<String, String>> {
        match self {
            Value::Dict(dict) => dict
                .entries()
                .iter()
                .map(|(k, v)| {
                    let key = k.to_value().expect_string(&format!("key of {what}"))?;
                    let value = v.expect_string(&format!("value of {what}"))?;
                    Ok((key, value))
                })
                .collect(),
            other => Err(unexpected_type(what, "a dict of strings", other)),
        }
    }
}

fn unexpected_type(what: &str, expected: &str, got: &Value) -> Error {
    Error::invalid_value(format!(
        "{what} must be {expected}, got {} {got}",
        got.type_name()
    ))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => *a.items() == *b.items(),
            (Value::Dict(a), Value::Dict(b)) => *a.entries() == *b.entries(),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Struct(a), Value::Struct(b)) => Rc::ptr_eq(a, b),
            (Value::RuleClass(a), Value::RuleClass(b)) => Rc::ptr_eq(a, b),
            (Value::Attr(a), Value::Attr(b)) => Rc::ptr_eq(a, b),
            (Value::Lazy(a), Value::Lazy(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(list) => write!(f, "[{}]", list.items().iter().join(", ")),
            Value::Dict(dict) => write!(
                f,
                "{{{}}}",
                dict.entries()
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .join(", ")
            ),
            Value::Builtin(b) => write!(f, "<built-in function {}>", b.name),
            Value::Function(func) => write!(f, "<function {}>", func.name),
            Value::Struct(s) => write!(f, "<{} struct>", s.name),
            Value::RuleClass(class) => match class.kind() {
                Some(kind) => write!(f, "<rule {kind}>"),
                None => f.write_str("<rule>"),
            },
            Value::Attr(_) => f.write_str("<attr>"),
            Value::Lazy(lazy) => write!(f, "{lazy}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Dict keys. Only immutable scalars are hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    None,
    Bool(bool),
    Int(i64),
    String(String),
}

impl Key {
    pub fn from_value(value: &Value) -> BzlResult<Key> {
        match value {
            Value::None => Ok(Key::None),
            Value::Bool(b) => Ok(Key::Bool(*b)),
            Value::Int(i) => Ok(Key::Int(*i)),
            Value::String(s) => Ok(Key::String(s.clone())),
            other => Err(Error::invalid_value(format!(
                "unhashable type: '{}'",
                other.type_name()
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::None => Value::None,
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(i) => Value::Int(*i),
            Key::String(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

#[derive(Debug, Default)]
pub struct ListValue {
    items: RefCell<Vec<Value>>,
    frozen: Cell<bool>,
}

impl ListValue {
    pub fn new(items: Vec<Value>) -> ListValue {
        ListValue {
            items: RefCell::new(items),
            frozen: Cell::new(false),
        }
    }

    pub fn items(&self) -> Ref<'_, Vec<Value>> {
        self.items.borrow()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    pub fn get(&self, index: i64) -> BzlResult<Value> {
        let items = self.items.borrow();
        let idx = normalize_index(index, items.len())?;
        Ok(items[idx].clone())
    }

    pub fn set(&self, index: i64, value: Value) -> BzlResult<()> {
        if self.is_frozen() {
            return Err(Error::invalid_value("cannot modify a frozen list"));
        }
        if value.reaches((self as *const ListValue).cast()) {
            return Err(Error::StoreLocation(String::from(
                "a list cannot contain itself",
            )));
        }
        let mut items = self.items.borrow_mut();
        let idx = normalize_index(index, items.len())?;
        items[idx] = value;
        Ok(())
    }
}

/// Python-style index, negative values count from the end.
pub(crate) fn normalize_index(index: i64, len: usize) -> BzlResult<usize> {
    let len_i = len as i64;
    let idx = if index < 0 { index + len_i } else { index };
    if (0..len_i).contains(&idx) {
        Ok(idx as usize)
    } else {
        Err(Error::invalid_value(format!(
            "index {index} out of range for length {len}"
        )))
    }
}

#[derive(Debug, Default)]
pub struct DictValue {
    entries: RefCell<IndexMap<Key, Value>>,
    frozen: Cell<bool>,
}

impl DictValue {
    pub fn new(entries: IndexMap<Key, Value>) -> DictValue {
        DictValue {
            entries: RefCell::new(entries),
            frozen: Cell::new(false),
        }
    }

    pub fn entries(&self) -> Ref<'_, IndexMap<Key, Value>> {
        self.entries.borrow()
    }

    pub fn get(&self, key: &Key) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn to_vec(&self) -> Vec<(Key, Value)> {
        self.entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    pub fn insert(&self, key: Key, value: Value) -> BzlResult<()> {
        if self.is_frozen() {
            return Err(Error::invalid_value("cannot modify a frozen dict"));
        }
        if value.reaches((self as *const DictValue).cast()) {
            return Err(Error::StoreLocation(String::from(
                "a dict cannot contain itself",
            )));
        }
        self.entries.borrow_mut().insert(key, value);
        Ok(())
    }
}

pub type BuiltinFn = fn(&Ctx, Arguments) -> BzlResult<Value>;

pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

/// A function declared with `def`.
pub struct Function {
    pub name: String,
    pub params: Vec<(String, Option<Value>)>,
    pub body: Body,
    pub source: Rc<Source>,
    /// Globals of the declaring file. Owned by the module cache, so this stays alive for
    /// as long as the function can be reached from another file.
    pub globals: Weak<Globals>,
    pub kind: FileKind,
}

/// Read-only namespace such as `attr` or `native`.
pub struct StructValue {
    pub name: &'static str,
    pub fields: IndexMap<&'static str, Value>,
}

impl StructValue {
    pub fn field(&self, name: &str) -> BzlResult<Value> {
        self.fields.get(name).cloned().ok_or_else(|| {
            Error::invalid_value(format!("'{}' has no field '{name}'", self.name))
        })
    }
}

/// Evaluated call arguments.
#[derive(Debug, Default)]
pub struct Arguments {
    pub positional: Vec<Value>,
    pub named: IndexMap<String, Value>,
}

impl Arguments {
    /// Binds the arguments to `params`, positionally first and then by keyword. The first
    /// `required` parameters must be bound.
    pub fn bind<const N: usize>(
        self,
        function: &str,
        params: [&str; N],
        required: usize,
    ) -> BzlResult<[Option<Value>; N]> {
        let mut ret: [Option<Value>; N] = std::array::from_fn(|_| None);

        if self.positional.len() > N {
            return Err(Error::Call(format!(
                "{function}() takes at most {N} positional arguments but {} were given",
                self.positional.len()
            )));
        }
        for (slot, value) in ret.iter_mut().zip(self.positional) {
            *slot = Some(value);
        }

        for (name, value) in self.named {
            let idx = params.iter().position(|p| *p == name).ok_or_else(|| {
                Error::Call(format!(
                    "{function}() got an unexpected keyword argument '{name}'"
                ))
            })?;
            if ret[idx].is_some() {
                return Err(Error::Call(format!(
                    "{function}() got multiple values for argument '{name}'"
                )));
            }
            ret[idx] = Some(value);
        }

        if let Some((_, missing)) = ret
            .iter()
            .zip(params)
            .take(required)
            .find(|(slot, _)| slot.is_none())
        {
            return Err(Error::Call(format!(
                "{function}() missing required argument '{missing}'"
            )));
        }

        Ok(ret)
    }
}

#[cfg(test)]
mod test {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::{Arguments, Key, Value};
    use crate::error::Error;

    fn strings(items: &[&str]) -> Value {
        Value::list(items.iter().map(|s| Value::string(*s)).collect())
    }

    #[test]
    fn addition() {
        assert_eq!(Value::Int(2).add(&Value::Int(3)), Ok(Value::Int(5)));
        assert_eq!(
            Value::string("a").add(&Value::string("b")),
            Ok(Value::string("ab"))
        );
        assert_eq!(
            strings(&["a"]).add(&strings(&["b", "c"])),
            Ok(strings(&["a", "b", "c"]))
        );
        assert!(matches!(
            Value::Int(i64::MAX).add(&Value::Int(1)),
            Err(Error::InvalidValue(_))
        ));
        assert!(matches!(
            Value::Int(1).add(&Value::string("a")),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn freezing() {
        let inner = strings(&["x"]);
        let outer = Value::list(vec![inner.clone()]);
        outer.freeze();

        let Value::List(inner) = inner else {
            unreachable!()
        };
        assert!(inner.is_frozen());
        assert!(matches!(
            inner.set(0, Value::None),
            Err(Error::InvalidValue(_))
        ));
    }

    #[test]
    fn indexing() {
        let Value::List(list) = strings(&["a", "b"]) else {
            unreachable!()
        };
        assert_eq!(list.get(-1), Ok(Value::string("b")));
        assert!(list.get(2).is_err());
        list.set(0, Value::Int(1)).unwrap();
        assert_eq!(list.get(0), Ok(Value::Int(1)));
    }

    #[test]
    fn no_self_reference() {
        let outer = strings(&["a"]);
        let Value::List(list) = outer.clone() else {
            unreachable!()
        };
        let wrapper = Value::list(vec![outer.clone()]);
        assert!(matches!(list.set(0, wrapper), Err(Error::StoreLocation(_))));
        assert!(matches!(list.set(0, outer), Err(Error::StoreLocation(_))));
        assert!(list.set(0, strings(&["b"])).is_ok());
    }

    #[test]
    fn dict_keys() {
        assert_eq!(Key::from_value(&Value::Int(3)), Ok(Key::Int(3)));
        assert!(Key::from_value(&strings(&[])).is_err());

        let mut entries = IndexMap::new();
        entries.insert(Key::String(String::from("k")), Value::Bool(true));
        assert_eq!(Value::dict(entries).to_string(), "{\"k\": True}");
    }

    #[test]
    fn binding() {
        let mut args = Arguments {
            positional: vec![Value::string("n")],
            ..Default::default()
        };
        args.named.insert(String::from("path"), Value::string("p"));

        let [name, path, other] = args.bind("f", ["name", "path", "other"], 2).unwrap();
        assert_eq!(name, Some(Value::string("n")));
        assert_eq!(path, Some(Value::string("p")));
        assert_eq!(other, None);

        let err = Arguments::default().bind("f", ["name"], 1).unwrap_err();
        assert_eq!(
            err,
            Error::Call(String::from("f() missing required argument 'name'"))
        );

        let mut args = Arguments {
            positional: vec![Value::Int(1)],
            ..Default::default()
        };
        args.named.insert(String::from("a"), Value::Int(2));
        assert!(args.bind("f", ["a"], 0).is_err());
    }
}
