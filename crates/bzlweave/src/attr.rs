//! Attribute schemas and the parsers that turn raw values into resolved ones.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use itertools::Itertools;

use crate::error::{BzlResult, Error, ResultExt};
use crate::eval::value::{Arguments, Builtin, BuiltinFn, StructValue, Value};
use crate::eval::Ctx;
use crate::label::Label;
use crate::package::Package;
use crate::target::Target;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleType {
    Bool,
    Int,
    String,
}

impl fmt::Display for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SimpleType::Bool => "bool",
            SimpleType::Int => "int",
            SimpleType::String => "string",
        })
    }
}

#[derive(Debug, Clone)]
pub enum AttrParser {
    /// A scalar, optionally restricted to `values`.
    Simple { ty: SimpleType, values: Vec<Value> },
    /// A label, resolved to the target it names.
    Label,
    /// A label that is only checked for syntax, like the entries of `visibility`.
    LabelName,
    List {
        allow_empty: bool,
        item: Box<AttrParser>,
    },
    Dict {
        allow_empty: bool,
        key: Box<AttrParser>,
        value: Box<AttrParser>,
    },
}

impl AttrParser {
    pub fn simple(ty: SimpleType) -> AttrParser {
        AttrParser::Simple {
            ty,
            values: Vec::new(),
        }
    }

    pub fn list_of(item: AttrParser, allow_empty: bool) -> AttrParser {
        AttrParser::List {
            allow_empty,
            item: Box::new(item),
        }
    }

    pub fn label_list() -> AttrParser {
        AttrParser::list_of(AttrParser::Label, true)
    }

    pub fn string_list() -> AttrParser {
        AttrParser::list_of(AttrParser::simple(SimpleType::String), true)
    }

    pub fn string_dict(allow_empty: bool) -> AttrParser {
        AttrParser::Dict {
            allow_empty,
            key: Box::new(AttrParser::simple(SimpleType::String)),
            value: Box::new(AttrParser::simple(SimpleType::String)),
        }
    }

    /// Checks the shape of `value` and resolves any labels in it relative to `package`.
    pub fn parse(
        &self,
        value: &Value,
        workspace: &Workspace,
        package: &Package,
    ) -> BzlResult<AttrValue> {
        match self {
            AttrParser::Simple { ty, values } => {
                let parsed = match (ty, value) {
                    (SimpleType::Bool, Value::Bool(b)) => AttrValue::Bool(*b),
                    (SimpleType::Int, Value::Int(i)) => AttrValue::Int(*i),
                    (SimpleType::String, Value::String(s)) => AttrValue::String(s.clone()),
                    _ => {
                        return Err(Error::invalid_value(format!(
                            "expected {ty}, got {} {value}",
                            value.type_name()
                        )))
                    }
                };
                if !values.is_empty() && !values.contains(value) {
                    return Err(Error::invalid_value(format!(
                        "{value} is not one of {}",
                        values.iter().join(", ")
                    )));
                }
                Ok(parsed)
            }
            AttrParser::Label => {
                let text = value.expect_string("label")?;
                let label = Label::parse(&text, Some(package.repository()), Some(package.path()))?
                    .resolve(package.repository(), Some(package.path()))?;
                workspace
                    .target(&label)
                    .map(AttrValue::Target)
                    .with_context(|| format!("resolving '{text}'"))
            }
            AttrParser::LabelName => {
                let text = value.expect_string("label")?;
                let label = Label::parse(&text, Some(package.repository()), Some(package.path()))?
                    .resolve(package.repository(), Some(package.path()))?;
                Ok(AttrValue::String(label.to_string()))
            }
            AttrParser::List { allow_empty, item } => {
                let Value::List(list) = value else {
                    return Err(Error::invalid_value(format!(
                        "expected a list, got {} {value}",
                        value.type_name()
                    )));
                };
                let items = list.to_vec();
                if items.is_empty() && !allow_empty {
                    return Err(Error::EmptyList("list"));
                }
                items
                    .iter()
                    .map(|item_value| item.parse(item_value, workspace, package))
                    .collect::<BzlResult<Vec<_>>>()
                    .map(AttrValue::List)
            }
            AttrParser::Dict {
                allow_empty,
                key,
                value: value_parser,
            } => {
                let Value::Dict(dict) = value else {
                    return Err(Error::invalid_value(format!(
                        "expected a dict, got {} {value}",
                        value.type_name()
                    )));
                };
                let entries = dict.to_vec();
                if entries.is_empty() && !allow_empty {
                    return Err(Error::EmptyList("dict"));
                }
                entries
                    .iter()
                    .map(|(k, v)| {
                        Ok((
                            key.parse(&k.to_value(), workspace, package)?,
                            value_parser.parse(v, workspace, package)?,
                        ))
                    })
                    .collect::<BzlResult<Vec<_>>>()
                    .map(AttrValue::Dict)
            }
        }
    }
}

/// One entry of a rule's attribute schema.
#[derive(Debug, Clone)]
pub struct Attr {
    pub default: Value,
    pub doc: String,
    pub mandatory: bool,
    pub parser: AttrParser,
}

impl Attr {
    pub fn new(parser: AttrParser, default: Value) -> Attr {
        default.freeze();
        Attr {
            default,
            doc: String::new(),
            mandatory: false,
            parser,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Attr {
        self.doc = doc.into();
        self
    }

    pub fn with_mandatory(mut self, mandatory: bool) -> Attr {
        self.mandatory = mandatory;
        self
    }
}

/// A resolved attribute value. Labels have been replaced by the targets they name.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    None,
    Bool(bool),
    Int(i64),
    String(String),
    Target(Target),
    List(Vec<AttrValue>),
    Dict(Vec<(AttrValue, AttrValue)>),
}

impl AttrValue {
    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_target(&self) -> Option<&Target> {
        match self {
            AttrValue::Target(target) => Some(target),
            _ => None,
        }
    }

    /// Every target referenced from this value, in order.
    pub fn targets(&self) -> Vec<Target> {
        match self {
            AttrValue::Target(target) => vec![target.clone()],
            AttrValue::List(items) => items.iter().flat_map(AttrValue::targets).collect(),
            AttrValue::Dict(entries) => entries
                .iter()
                .flat_map(|(k, v)| k.targets().into_iter().chain(v.targets()))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::None => f.write_str("None"),
            AttrValue::Bool(true) => f.write_str("True"),
            AttrValue::Bool(false) => f.write_str("False"),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::String(s) => write!(f, "{s:?}"),
            AttrValue::Target(target) => write!(f, "{target}"),
            AttrValue::List(items) => write!(f, "[{}]", items.iter().join(", ")),
            AttrValue::Dict(entries) => write!(
                f,
                "{{{}}}",
                entries.iter().map(|(k, v)| format!("{k}: {v}")).join(", ")
            ),
        }
    }
}

/// Attributes every rule has, whatever its kind.
pub fn common_attrs() -> IndexMap<String, Attr> {
    let mut ret = IndexMap::new();

    for name in ["deps", "data", "compatible_with", "restricted_to"] {
        ret.insert(
            name.to_string(),
            Attr::new(AttrParser::label_list(), Value::list(Vec::new())),
        );
    }
    ret.insert(
        String::from("visibility"),
        Attr::new(
            AttrParser::list_of(AttrParser::LabelName, true),
            Value::list(Vec::new()),
        ),
    );
    for name in ["tags", "features", "licenses", "distribs"] {
        ret.insert(
            name.to_string(),
            Attr::new(AttrParser::string_list(), Value::list(Vec::new())),
        );
    }
    ret.insert(
        String::from("deprecation"),
        Attr::new(AttrParser::simple(SimpleType::String), Value::string("")),
    );
    ret.insert(
        String::from("testonly"),
        Attr::new(AttrParser::simple(SimpleType::Bool), Value::Bool(false)),
    );

    ret
}

/// The `attr` struct of `.bzl` files.
pub(crate) fn attr_module() -> Value {
    let fields: [(&'static str, BuiltinFn); 8] = [
        ("bool", attr_bool),
        ("int", attr_int),
        ("string", attr_string),
        ("label", attr_label),
        ("int_list", attr_int_list),
        ("string_list", attr_string_list),
        ("label_list", attr_label_list),
        ("string_dict", attr_string_dict),
    ];

    Value::Struct(Rc::new(StructValue {
        name: "attr",
        fields: fields
            .into_iter()
            .map(|(name, func)| (name, Value::Builtin(Rc::new(Builtin { name, func }))))
            .collect(),
    }))
}

fn make_attr(
    parser: AttrParser,
    default: Value,
    doc: Option<Value>,
    mandatory: Option<Value>,
) -> BzlResult<Value> {
    let doc = doc.map(|d| d.expect_string("doc")).transpose()?;
    let mandatory = mandatory.map(|m| m.expect_bool("mandatory")).transpose()?;

    Ok(Value::Attr(Rc::new(
        Attr::new(parser, default)
            .with_doc(doc.unwrap_or_default())
            .with_mandatory(mandatory.unwrap_or(false)),
    )))
}

fn simple_attr(ty: SimpleType, default: Value, args: Arguments, name: &str) -> BzlResult<Value> {
    let [default_arg, doc, mandatory, values] =
        args.bind(name, ["default", "doc", "mandatory", "values"], 0)?;

    let values = match values {
        None => Vec::new(),
        Some(Value::List(list)) => list.to_vec(),
        Some(other) => {
            return Err(Error::invalid_value(format!(
                "values must be a list, got {} {other}",
                other.type_name()
            )))
        }
    };

    make_attr(
        AttrParser::Simple { ty, values },
        default_arg.unwrap_or(default),
        doc,
        mandatory,
    )
}

/// `allow_empty` wins over `non_empty` when both are given.
fn allow_empty(non_empty: Option<Value>, allow_empty: Option<Value>) -> BzlResult<bool> {
    match (non_empty, allow_empty) {
        (_, Some(allow)) => allow.expect_bool("allow_empty"),
        (Some(non_empty), None) => Ok(!non_empty.expect_bool("non_empty")?),
        (None, None) => Ok(true),
    }
}

fn attr_bool(_ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    simple_attr(SimpleType::Bool, Value::Bool(false), args, "attr.bool")
}

fn attr_int(_ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    simple_attr(SimpleType::Int, Value::Int(0), args, "attr.int")
}

fn attr_string(_ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    simple_attr(SimpleType::String, Value::string(""), args, "attr.string")
}

fn attr_label(_ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    let [default, doc, mandatory, ..] = args.bind(
        "attr.label",
        [
            "default",
            "doc",
            "mandatory",
            "executable",
            "allow_files",
            "allow_single_file",
            "allow_rules",
            "providers",
            "cfg",
            "aspects",
        ],
        0,
    )?;

    make_attr(
        AttrParser::Label,
        default.unwrap_or(Value::None),
        doc,
        mandatory,
    )
}

fn list_attr(item: AttrParser, args: Arguments, name: &str) -> BzlResult<Value> {
    let [default, doc, mandatory, non_empty, allow, ..] = args.bind(
        name,
        [
            "default",
            "doc",
            "mandatory",
            "non_empty",
            "allow_empty",
            "allow_files",
            "allow_rules",
            "providers",
            "flags",
            "cfg",
            "aspects",
        ],
        0,
    )?;

    make_attr(
        AttrParser::list_of(item, allow_empty(non_empty, allow)?),
        default.unwrap_or_else(|| Value::list(Vec::new())),
        doc,
        mandatory,
    )
}

fn attr_int_list(_ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    list_attr(AttrParser::simple(SimpleType::Int), args, "attr.int_list")
}

fn attr_string_list(_ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    list_attr(
        AttrParser::simple(SimpleType::String),
        args,
        "attr.string_list",
    )
}

fn attr_label_list(_ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    list_attr(AttrParser::Label, args, "attr.label_list")
}

fn attr_string_dict(_ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    let [default, doc, mandatory, non_empty, allow] = args.bind(
        "attr.string_dict",
        ["default", "doc", "mandatory", "non_empty", "allow_empty"],
        0,
    )?;

    make_attr(
        AttrParser::string_dict(allow_empty(non_empty, allow)?),
        default.unwrap_or_else(|| Value::dict(IndexMap::new())),
        doc,
        mandatory,
    )
}
