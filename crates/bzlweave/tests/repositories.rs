mod common;

use std::rc::Rc;

use bzlweave::repository::RepositoryKind;
use bzlweave::{Config, Error, TargetGraph, Workspace};
use bzlweave_util::fs::MemoryFs;
use pretty_assertions::assert_eq;

use common::{labels, resolve, resolve_err, rule, workspace};

const WORKSPACE: &str = r#"
workspace(name = "main")

load("//:repositories.bzl", "EXT_PATH")

local_repository(
    name = "ext",
    path = EXT_PATH,
)

http_archive(
    name = "zlib",
    urls = ["https://example.com/zlib-1.3.tar.gz"],
    sha256 = "0123456789abcdef",
    strip_prefix = "zlib-1.3",
)
"#;

fn files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("WORKSPACE", WORKSPACE),
        ("repositories.bzl", "EXT_PATH = 'third_party/ext'\n"),
        (
            "BUILD",
            r#"
cc_binary(name = "app", srcs = ["main.cc"], deps = ["@ext//lib", ":util"])
cc_library(name = "util", deps = ["@ext//lib:helper"])
cc_library(name = "zlib_user", deps = ["@zlib"])
"#,
        ),
        (
            "third_party/ext/lib/BUILD",
            r#"
cc_library(name = "lib", hdrs = ["lib.h"], deps = [":helper", "//other"])
cc_library(name = "helper")
"#,
        ),
        ("third_party/ext/other/BUILD", "cc_library(name = 'other')\n"),
    ]
}

#[test_log::test]
fn local_repositories() {
    let (_fs, ws) = workspace(&files());

    assert_eq!(ws.name().as_deref(), Some("main"));
    let ext = ws.repository("ext").unwrap();
    assert_eq!(
        ext.kind(),
        &RepositoryKind::Local {
            root: "/ws/third_party/ext".into()
        }
    );

    let lib = rule(&ws, "@ext//lib");
    assert_eq!(lib.label().to_string(), "@ext//lib:lib");
    assert_eq!(labels(&lib, "hdrs"), ["@ext//lib:lib.h"]);
    assert_eq!(labels(&lib, "deps"), ["@ext//lib:helper", "@ext//other:other"]);

    let app = rule(&ws, "//:app");
    assert_eq!(labels(&app, "deps"), ["@ext//lib:lib", "//:util"]);
    assert_eq!(ext.loaded_packages(), ["lib", "other"]);
}

#[test_log::test]
fn main_repository_by_name() {
    let (_fs, ws) = workspace(&files());

    assert_eq!(rule(&ws, "@main//:util").label().to_string(), "//:util");
    assert_eq!(
        resolve(&ws, "@ext").unwrap_err().root(),
        &Error::PackageNotFound(String::from("@ext//"))
    );
}

#[test_log::test]
fn unknown_and_unfetched_repositories() {
    let (_fs, ws) = workspace(&files());

    assert_eq!(
        resolve_err(&ws, "@nope//x:y"),
        Error::UnknownRepository(String::from("nope"))
    );
    assert_eq!(
        resolve_err(&ws, "//:zlib_user"),
        Error::RepositoryNotMaterialized(String::from("zlib"))
    );
    assert!(matches!(
        ws.repository("zlib").unwrap().kind(),
        RepositoryKind::Archive { urls, sha256: Some(_), .. } if urls.len() == 1
    ));
}

#[test_log::test]
fn workspace_file_errors() {
    let fs = Rc::new(MemoryFs::new().with_file(
        "ws/WORKSPACE",
        "local_repository(name = 'a', path = 'a')\nlocal_repository(name = 'a', path = 'b')\n",
    ));
    assert_eq!(
        Workspace::new("/ws", Config::new(), fs).err().map(|e| e.root().clone()),
        Some(Error::DuplicateRepository(String::from("a")))
    );

    let fs = Rc::new(MemoryFs::new().with_file("ws/WORKSPACE", "cc_library(name = 'a')\n"));
    assert_eq!(
        Workspace::new("/ws", Config::new(), fs).err().map(|e| e.root().clone()),
        Some(Error::UnboundName(String::from("cc_library")))
    );

    let fs = Rc::new(MemoryFs::new().with_file("ws/BUILD", ""));
    assert!(matches!(
        Workspace::new("/ws", Config::new(), fs),
        Err(Error::RootNotFound(_))
    ));
}

#[test_log::test]
fn repository_rules_only_in_workspace() {
    let (_fs, ws) = workspace(&[("p/BUILD", "local_repository(name = 'x', path = 'x')\n")]);

    assert_eq!(
        ws.load_pkg("", "p").unwrap_err().root(),
        &Error::UnboundName(String::from("local_repository"))
    );
}

#[test_log::test]
fn dependency_order() {
    let (_fs, ws) = workspace(&files());

    let app = resolve(&ws, "//:app").unwrap();
    let graph = TargetGraph::build(&ws, &[app.clone()]).unwrap();

    let order: Vec<String> = graph
        .dependency_order()
        .unwrap()
        .iter()
        .map(|t| t.label().to_string())
        .collect();
    assert_eq!(order.len(), graph.len());
    assert_eq!(order.len(), 7);

    let position = |label: &str| order.iter().position(|l| l == label).unwrap();
    assert!(position("@ext//lib:helper") < position("@ext//lib:lib"));
    assert!(position("@ext//other:other") < position("@ext//lib:lib"));
    assert!(position("@ext//lib:lib") < position("//:app"));
    assert!(position("//:util") < position("//:app"));
    assert!(position("//:main.cc") < position("//:app"));
    assert_eq!(order.last().map(String::as_str), Some("//:app"));

    let direct: Vec<String> = graph
        .dependencies(app.label())
        .iter()
        .map(|t| t.label().to_string())
        .collect();
    assert_eq!(direct, ["//:main.cc", "//:util", "@ext//lib:lib"]);
}
