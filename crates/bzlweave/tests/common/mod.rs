#![allow(dead_code)]

use std::rc::Rc;

use bzlweave::rule::Rule;
use bzlweave::{Config, Error, Target, Workspace};
use bzlweave_util::fs::MemoryFs;

/// Builds an in-memory workspace rooted at `/ws`. An empty `WORKSPACE` is added unless
/// `files` has one.
pub fn workspace_with_config(config: Config, files: &[(&str, &str)]) -> (Rc<MemoryFs>, Workspace) {
    let fs = Rc::new(MemoryFs::new());
    for (path, contents) in files {
        fs.add_file(format!("ws/{path}"), *contents);
    }
    if !files.iter().any(|(path, _)| path.starts_with("WORKSPACE")) {
        fs.add_file("ws/WORKSPACE", "");
    }

    let ws = Workspace::new("/ws", config, fs.clone()).unwrap();
    (fs, ws)
}

pub fn workspace(files: &[(&str, &str)]) -> (Rc<MemoryFs>, Workspace) {
    workspace_with_config(Config::new(), files)
}

pub fn resolve(ws: &Workspace, label: &str) -> Result<Target, Error> {
    ws.resolve_target(label, None, Some(""))
}

pub fn rule(ws: &Workspace, label: &str) -> Rc<Rule> {
    let target = resolve(ws, label).unwrap();
    match target.as_rule() {
        Some(rule) => rule.clone(),
        None => panic!("{} is a file", target.label()),
    }
}

/// Labels of the targets in a resolved label-list attribute.
pub fn labels(rule: &Rule, attr: &str) -> Vec<String> {
    rule.attr(attr)
        .unwrap()
        .as_list()
        .unwrap()
        .iter()
        .map(|v| v.as_target().unwrap().label().to_string())
        .collect()
}

/// Resolving `label` fails; returns the underlying error.
pub fn resolve_err(ws: &Workspace, label: &str) -> Error {
    resolve(ws, label).unwrap_err().root().clone()
}
