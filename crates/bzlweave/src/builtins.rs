//! The global names each kind of file starts out with.

use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::attr::{attr_module, Attr, AttrParser, SimpleType};
use crate::error::{BzlResult, Error};
use crate::eval::value::{Arguments, Builtin, BuiltinFn, StructValue, Value};
use crate::eval::Ctx;
use crate::package::PackageDefaults;
use crate::rule::{rule, RuleClass};
use crate::select::{select, MatchSet};
use crate::workspace::{http_archive, local_repository, workspace};

pub type Builtins = IndexMap<&'static str, Value>;

fn builtin(name: &'static str, func: BuiltinFn) -> Value {
    Value::Builtin(Rc::new(Builtin { name, func }))
}

fn rule_class(kind: &str, attrs: IndexMap<String, Attr>, doc: &str) -> Value {
    Value::RuleClass(Rc::new(RuleClass::new(Some(kind), attrs, doc)))
}

fn empty_list() -> Value {
    Value::list(Vec::new())
}

/// Attributes shared by the `cc_*` rules.
fn cc_attrs() -> IndexMap<String, Attr> {
    let mut ret = IndexMap::new();
    for name in ["srcs", "hdrs"] {
        ret.insert(
            name.to_string(),
            Attr::new(AttrParser::label_list(), empty_list()),
        );
    }
    for name in ["copts", "defines", "linkopts"] {
        ret.insert(
            name.to_string(),
            Attr::new(AttrParser::string_list(), empty_list()),
        );
    }
    ret
}

fn cc_library() -> Value {
    let mut attrs = cc_attrs();
    attrs.insert(
        String::from("alwayslink"),
        Attr::new(AttrParser::simple(SimpleType::Bool), Value::Bool(false)),
    );
    attrs.insert(
        String::from("textual_hdrs"),
        Attr::new(AttrParser::label_list(), empty_list()),
    );
    rule_class("cc_library", attrs, "A C++ library.")
}

fn cc_binary() -> Value {
    rule_class("cc_binary", cc_attrs(), "A C++ executable.")
}

fn cc_test() -> Value {
    let mut attrs = cc_attrs();
    attrs.insert(
        String::from("size"),
        Attr::new(
            AttrParser::Simple {
                ty: SimpleType::String,
                values: ["enormous", "large", "medium", "small"]
                    .into_iter()
                    .map(Value::string)
                    .collect(),
            },
            Value::string("medium"),
        ),
    );
    rule_class("cc_test", attrs, "A C++ test executable.")
}

fn filegroup() -> Value {
    let mut attrs = IndexMap::new();
    attrs.insert(
        String::from("srcs"),
        Attr::new(AttrParser::label_list(), empty_list()),
    );
    rule_class("filegroup", attrs, "Gives a name to a collection of targets.")
}

pub fn build_builtins() -> Builtins {
    let mut ret = Builtins::new();
    ret.insert("package", builtin("package", package));
    ret.insert("licenses", builtin("licenses", licenses));
    ret.insert("select", builtin("select", select));
    ret.insert("config_setting", builtin("config_setting", config_setting));
    ret.insert("cc_library", cc_library());
    ret.insert("cc_binary", cc_binary());
    ret.insert("cc_test", cc_test());
    ret.insert("filegroup", filegroup());
    ret
}

pub fn bzl_builtins() -> Builtins {
    let mut native = build_builtins();
    native.shift_remove("select");
    native.insert("package_name", builtin("package_name", package_name));
    native.insert("repository_name", builtin("repository_name", repository_name));

    let mut ret = Builtins::new();
    ret.insert("select", builtin("select", select));
    ret.insert("rule", builtin("rule", rule));
    ret.insert("attr", attr_module());
    ret.insert(
        "native",
        Value::Struct(Rc::new(StructValue {
            name: "native",
            fields: native,
        })),
    );
    ret
}

pub fn workspace_builtins() -> Builtins {
    let mut ret = Builtins::new();
    ret.insert("workspace", builtin("workspace", workspace));
    ret.insert("local_repository", builtin("local_repository", local_repository));
    ret.insert("http_archive", builtin("http_archive", http_archive));
    ret
}

/// `package(default_visibility, default_testonly, default_deprecation, features)`
fn package(ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    let builder = ctx.package_builder("package")?;
    let [visibility, testonly, deprecation, features] = args.bind(
        "package",
        [
            "default_visibility",
            "default_testonly",
            "default_deprecation",
            "features",
        ],
        0,
    )?;

    if let Some(visibility) = &visibility {
        visibility.expect_string_list("default_visibility")?;
    }
    if let Some(testonly) = &testonly {
        testonly.expect_bool("default_testonly")?;
    }
    if let Some(deprecation) = &deprecation {
        deprecation.expect_string("default_deprecation")?;
    }
    let features = features
        .map(|f| f.expect_string_list("features"))
        .transpose()?
        .unwrap_or_default();

    for value in [&visibility, &testonly, &deprecation].into_iter().flatten() {
        value.freeze();
    }
    builder.set_defaults(PackageDefaults {
        visibility,
        testonly,
        deprecation,
        features,
    })?;
    Ok(Value::None)
}

/// `licenses(license_types)`. Checked, then ignored.
fn licenses(_ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    let [license_types] = args.bind("licenses", ["license_types"], 1)?;
    if let Some(license_types) = license_types {
        license_types.expect_string_list("license_types")?;
    }
    Ok(Value::None)
}

/// `config_setting(name, values, visibility)`. Matched against the configuration right
/// away; only the outcome is kept.
fn config_setting(ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    let builder = ctx.package_builder("config_setting")?;
    let [name, values, _visibility] =
        args.bind("config_setting", ["name", "values", "visibility"], 0)?;

    let name = name
        .ok_or_else(|| Error::MissingAttribute(String::from("name")))?
        .expect_string("name")?;
    let values: MatchSet = values
        .ok_or_else(|| Error::MissingAttribute(String::from("values")))?
        .expect_string_dict("values")?
        .into_iter()
        .collect();
    if values.is_empty() {
        return Err(Error::EmptyList("dict"));
    }

    let matched = ctx.workspace.is_config_matching(&values);
    debug!(config_setting = %builder.label(&name), matched, "declared config_setting");

    builder.add_config_setting(&name, matched.then_some(values))?;
    Ok(Value::None)
}

/// `native.package_name()`
fn package_name(ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    args.bind("package_name", [], 0)?;
    let builder = ctx.package_builder("native.package_name")?;
    Ok(Value::string(builder.path()))
}

/// `native.repository_name()`, `@` for the main repository.
fn repository_name(ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    args.bind("repository_name", [], 0)?;
    let builder = ctx.package_builder("native.repository_name")?;
    Ok(Value::string(format!("@{}", builder.repository())))
}

#[cfg(test)]
mod test {
    use super::{build_builtins, bzl_builtins, workspace_builtins};
    use crate::eval::value::Value;

    #[test]
    fn tables() {
        let build = build_builtins();
        assert_eq!(
            build.keys().copied().collect::<Vec<_>>(),
            [
                "package",
                "licenses",
                "select",
                "config_setting",
                "cc_library",
                "cc_binary",
                "cc_test",
                "filegroup"
            ]
        );

        let bzl = bzl_builtins();
        let Some(Value::Struct(native)) = bzl.get("native") else {
            panic!("native is not a struct");
        };
        assert!(native.field("cc_library").is_ok());
        assert!(native.field("package_name").is_ok());
        assert!(native.field("select").is_err());
        assert!(bzl.get("cc_library").is_none());

        assert_eq!(workspace_builtins().len(), 3);
    }

    #[test]
    fn rule_schemas() {
        let build = build_builtins();
        let Some(Value::RuleClass(cc_test)) = build.get("cc_test") else {
            panic!("cc_test is not a rule");
        };
        assert_eq!(cc_test.kind().as_deref(), Some("cc_test"));
        assert_eq!(cc_test.attrs()["size"].default, Value::string("medium"));
        assert!(cc_test.attrs().contains_key("deps"));
        assert!(!cc_test.attrs().contains_key("alwayslink"));
    }
}
