mod common;

use std::rc::Rc;

use bzlweave::attr::AttrValue;
use bzlweave::target::File;
use bzlweave::{CanonicalLabel, Error, Target};
use pretty_assertions::assert_eq;

use common::{labels, resolve, resolve_err, rule, workspace};

#[test_log::test]
fn single_cc_library() {
    let (_fs, ws) = workspace(&[("BUILD", r#"cc_library(name = "a", srcs = ["a.cc"])"#)]);

    let package = ws.load_pkg("", "").unwrap();
    assert_eq!(package.rules().count(), 1);

    let a = rule(&ws, "//:a");
    assert_eq!(a.kind(), "cc_library");
    assert_eq!(a.name(), "a");
    assert_eq!(
        a.attr("srcs"),
        Some(AttrValue::List(vec![AttrValue::Target(Target::File(
            Rc::new(File::new(CanonicalLabel::new("", "", "a.cc")))
        ))]))
    );
    assert_eq!(a.attr("deps"), Some(AttrValue::List(Vec::new())));
    assert_eq!(a.attr("alwayslink"), Some(AttrValue::Bool(false)));
    assert_eq!(a.attr("deprecation"), Some(AttrValue::String(String::new())));
}

#[test_log::test]
fn packages_are_loaded_once() {
    let (fs, ws) = workspace(&[
        ("BUILD", "cc_library(name = 'a', deps = ['//lib:b', '//lib:c'])\n"),
        (
            "lib/BUILD",
            r#"
cc_library(name = "b")
cc_library(name = "c", deps = [":b"])
"#,
        ),
    ]);

    let first = ws.load_pkg("", "lib").unwrap();
    let second = ws.load_pkg("", "lib").unwrap();
    assert!(Rc::ptr_eq(&first, &second));

    rule(&ws, "//:a");
    rule(&ws, "//lib:c");
    assert_eq!(fs.read_count("ws/lib/BUILD"), 1);
    assert_eq!(fs.read_count("ws/BUILD"), 1);
}

#[test_log::test]
fn resolve_attrs_is_idempotent() {
    let (fs, ws) = workspace(&[
        ("BUILD", "cc_library(name = 'a', deps = ['//lib:b'])\n"),
        ("lib/BUILD", "cc_library(name = 'b')\n"),
    ]);

    let package = ws.load_pkg("", "").unwrap();
    let a = package.rule("a").unwrap();
    assert!(!a.is_resolved());

    let first = a.resolve_attrs(&ws, &package).unwrap();
    let second = a.resolve_attrs(&ws, &package).unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(first, second);
    assert!(a.is_resolved());
    assert_eq!(fs.read_count("ws/lib/BUILD"), 1);
    assert_eq!(labels(a, "deps"), ["//lib:b"]);
}

#[test_log::test]
fn build_bazel_wins() {
    let (fs, ws) = workspace(&[
        ("p/BUILD.bazel", "filegroup(name = 'from_bazel')\n"),
        ("p/BUILD", "filegroup(name = 'from_build')\n"),
    ]);

    assert!(ws.load_pkg("", "p").unwrap().rule("from_bazel").is_some());
    assert_eq!(fs.read_count("ws/p/BUILD"), 0);
}

#[test_log::test]
fn labels_are_relative_to_their_package() {
    let (_fs, ws) = workspace(&[
        (
            "a/BUILD",
            r#"
cc_binary(
    name = "bin",
    srcs = ["main.cc", "sub/util.cc"],
    deps = [":lib", "//b", "//b:other"],
)
cc_library(name = "lib")
"#,
        ),
        (
            "b/BUILD",
            r#"
cc_library(name = "b")
cc_library(name = "other")
"#,
        ),
    ]);

    let bin = rule(&ws, "//a:bin");
    assert_eq!(labels(&bin, "srcs"), ["//a:main.cc", "//a:sub/util.cc"]);
    assert_eq!(labels(&bin, "deps"), ["//a:lib", "//b:b", "//b:other"]);

    let lib = bin.attr("deps").unwrap().as_list().unwrap()[0].clone();
    assert_eq!(lib.as_target().unwrap().kind(), "cc_library");
}

#[test_log::test]
fn files_are_not_checked() {
    let (_fs, ws) = workspace(&[("BUILD", "")]);

    let target = resolve(&ws, "//:does/not/exist.h").unwrap();
    assert_eq!(target.kind(), "source file");
    assert_eq!(target.as_file().unwrap().path(), "does/not/exist.h");
}

#[test_log::test]
fn package_not_found() {
    let (_fs, ws) = workspace(&[("BUILD", "cc_library(name = 'a', deps = ['//missing:x'])\n")]);

    assert_eq!(
        resolve_err(&ws, "//nothing:x"),
        Error::PackageNotFound(String::from("//nothing"))
    );
    assert_eq!(
        resolve_err(&ws, "//:a"),
        Error::PackageNotFound(String::from("//missing"))
    );
}

#[test_log::test]
fn schema_violations() {
    let (_fs, ws) = workspace(&[
        ("unknown/BUILD", "cc_library(name = 'a', sources = [])\n"),
        ("type/BUILD", "cc_library(name = 'a', srcs = 'a.cc')\n"),
        ("size/BUILD", "cc_test(name = 't', size = 'huge')\n"),
        ("noname/BUILD", "cc_library(srcs = [])\n"),
        ("badname/BUILD", "cc_library(name = 'a:b')\n"),
        ("dup/BUILD", "cc_library(name = 'a')\nfilegroup(name = 'a')\n"),
    ]);

    assert_eq!(
        ws.load_pkg("", "unknown").unwrap_err().root(),
        &Error::UnknownAttribute(String::from("sources"))
    );
    assert!(matches!(resolve_err(&ws, "//type:a"), Error::InvalidValue(_)));
    assert!(matches!(resolve_err(&ws, "//size:t"), Error::InvalidValue(_)));
    assert_eq!(
        ws.load_pkg("", "noname").unwrap_err().root(),
        &Error::MissingAttribute(String::from("name"))
    );
    assert!(matches!(
        ws.load_pkg("", "badname").unwrap_err().root(),
        Error::LabelSyntax { .. }
    ));
    assert_eq!(
        ws.load_pkg("", "dup").unwrap_err().root(),
        &Error::DuplicateTarget(String::from("//dup:a"))
    );
}

#[test_log::test]
fn errors_name_their_location() {
    let (_fs, ws) = workspace(&[(
        "p/BUILD",
        "cc_library(name = 'a')\ncc_library(name = 'b', hdrs = [1])\n",
    )]);

    let message = resolve(&ws, "//p:b").unwrap_err().to_string();
    assert!(message.contains("in cc_library rule //p:b"), "{message}");
    assert!(message.contains("attribute 'hdrs'"), "{message}");

    let (_fs, ws) = workspace(&[("p/BUILD", "cc_library(name = 'a')\nundefined_rule(name = 'b')\n")]);
    let message = ws.load_pkg("", "p").unwrap_err().to_string();
    assert!(message.contains("in package //p"), "{message}");
    assert!(message.contains("//p:BUILD:2"), "{message}");
}

#[test_log::test]
fn failures_are_cached() {
    let (fs, ws) = workspace(&[
        ("BUILD", "cc_library(name = 'a', deps = ['//broken'])\n"),
        ("broken/BUILD", "cc_library(name = 'broken', srcs = [True])\n"),
    ]);

    let first = resolve(&ws, "//:a").unwrap_err();
    let second = resolve(&ws, "//:a").unwrap_err();
    assert_eq!(first, second);
    assert!(matches!(first.root(), Error::InvalidValue(_)));

    let package = ws.load_pkg("", "").unwrap();
    let a = package.rule("a").unwrap();
    assert!(!a.is_resolved());
    assert!(a.attrs().is_none());
    assert_eq!(a.resolve_attrs(&ws, &package).unwrap_err().root(), first.root());
    assert_eq!(fs.read_count("ws/broken/BUILD"), 1);
}

#[test_log::test]
fn broken_packages_stay_broken() {
    let (fs, ws) = workspace(&[("p/BUILD", "cc_library(name = 'a')\nx = [1\n")]);

    let first = ws.load_pkg("", "p").unwrap_err();
    assert!(matches!(first.root(), Error::Syntax(_)));
    assert_eq!(ws.load_pkg("", "p").unwrap_err(), first);
    assert_eq!(fs.read_count("ws/p/BUILD"), 1);
}

#[test_log::test]
fn dependency_cycles() {
    let (_fs, ws) = workspace(&[
        ("a/BUILD", "cc_library(name = 'a', deps = ['//b'])\n"),
        ("b/BUILD", "cc_library(name = 'b', deps = ['//a'])\n"),
        ("self/BUILD", "filegroup(name = 'self', srcs = [':self'])\n"),
    ]);

    assert_eq!(
        resolve_err(&ws, "//a"),
        Error::CyclicDependency(vec![
            String::from("rule //a:a"),
            String::from("rule //b:b"),
            String::from("rule //a:a"),
        ])
    );
    assert!(matches!(resolve_err(&ws, "//self"), Error::CyclicDependency(_)));
}

#[test_log::test]
fn package_defaults() {
    let (_fs, ws) = workspace(&[
        (
            "p/BUILD",
            r#"
package(
    default_visibility = ["//visibility:public"],
    default_testonly = True,
    features = ["-layering_check"],
)
licenses(["notice"])
cc_library(name = "a")
cc_library(name = "b", testonly = False, visibility = [":__pkg__"])
"#,
        ),
        ("late/BUILD", "cc_library(name = 'a')\npackage(default_testonly = True)\n"),
        ("twice/BUILD", "package()\npackage()\n"),
    ]);

    let a = rule(&ws, "//p:a");
    assert_eq!(a.attr("testonly"), Some(AttrValue::Bool(true)));
    assert_eq!(
        a.attr("visibility"),
        Some(AttrValue::List(vec![AttrValue::String(String::from(
            "//visibility:public"
        ))]))
    );

    let b = rule(&ws, "//p:b");
    assert_eq!(b.attr("testonly"), Some(AttrValue::Bool(false)));
    assert_eq!(
        b.attr("visibility"),
        Some(AttrValue::List(vec![AttrValue::String(String::from(
            "//p:__pkg__"
        ))]))
    );

    assert_eq!(ws.load_pkg("", "p").unwrap().features(), ["-layering_check"]);
    assert!(matches!(ws.load_pkg("", "late").unwrap_err().root(), Error::Call(_)));
    assert!(matches!(ws.load_pkg("", "twice").unwrap_err().root(), Error::Call(_)));
}

#[test_log::test]
fn evaluation_rules() {
    let (_fs, ws) = workspace(&[
        (
            "ok/BUILD",
            r#"
"""Docstrings are fine."""
SRCS = ["a.cc"]
SRCS[0] = "b.cc"
OPTS = {"x": ["-O2"]}
OPTS["y"] = OPTS["x"] + ["-g"]
cc_library(name = "a", srcs = SRCS + ["c.cc"], copts = OPTS["y"])
"#,
        ),
        ("unbound/BUILD", "cc_library(name = 'a', srcs = SOURCES)\n"),
        ("stmt/BUILD", "1 + 2\n"),
        ("store/BUILD", "x = 1\nx[0] = 2\n"),
        ("frozen/BUILD", "X = ['a.cc']\ncc_library(name = 'a', srcs = X)\nX[0] = 'b.cc'\n"),
        ("multi/BUILD", "a = b = 1\n"),
        ("loop/BUILD", "for x in []:\n    pass\n"),
    ]);

    let a = rule(&ws, "//ok:a");
    assert_eq!(labels(&a, "srcs"), ["//ok:b.cc", "//ok:c.cc"]);
    assert_eq!(
        a.attr("copts"),
        Some(AttrValue::List(vec![
            AttrValue::String(String::from("-O2")),
            AttrValue::String(String::from("-g")),
        ]))
    );

    let root = |pkg: &str| ws.load_pkg("", pkg).unwrap_err().root().clone();
    assert_eq!(root("unbound"), Error::UnboundName(String::from("SOURCES")));
    assert!(matches!(root("stmt"), Error::UnsupportedExpression(_)));
    assert!(matches!(root("store"), Error::StoreLocation(_)));
    assert!(matches!(root("frozen"), Error::InvalidValue(_)));
    assert!(matches!(root("multi"), Error::StoreLocation(_)));
    assert!(matches!(root("loop"), Error::Syntax(_)));
}

#[test_log::test]
fn containers_cannot_contain_themselves() {
    let (_fs, ws) = workspace(&[
        ("list/BUILD", "x = [1]\nx[0] = x\ncc_library(name = 'a', srcs = x)\n"),
        ("dict/BUILD", "d = {}\nd['self'] = [d]\n"),
        (
            "select/BUILD",
            "x = ['a.cc']\nx[0] = x + select({'//conditions:default': []})\n",
        ),
        (
            "shared/BUILD",
            "x = ['a.cc']\ny = [x, x]\ncc_library(name = 'a', srcs = x, data = y[0])\n",
        ),
    ]);

    let root = |pkg: &str| ws.load_pkg("", pkg).unwrap_err().root().clone();
    assert!(matches!(root("list"), Error::StoreLocation(_)));
    assert!(matches!(root("dict"), Error::StoreLocation(_)));
    assert!(matches!(root("select"), Error::StoreLocation(_)));

    let a = rule(&ws, "//shared:a");
    assert_eq!(labels(&a, "srcs"), ["//shared:a.cc"]);
    assert_eq!(labels(&a, "data"), ["//shared:a.cc"]);
}
