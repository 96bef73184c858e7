//!
//! ## Introduction
//! This crate reads Bazel-style workspaces: a `WORKSPACE` file at the root, `BUILD` files
//! declaring targets, and `.bzl` files sharing definitions between them. It does not build
//! anything. What it produces is the resolved target graph: for each label you ask for,
//! the rule behind it with every attribute checked against its schema, `select()`s
//! decided for the active configuration, and labels replaced by the targets they name.
//! That's what an IDE project generator needs, and that's who this is for.
//!
//! The description language is a small subset of Starlark. See [`eval`] for what is
//! accepted; anything else is rejected when the file is parsed.
//!
//! ## Terminology
//!
//! ### Labels
//! A **label** names a target: `@repo//path/to/package:target`. The repository and
//! package parts may be left out, in which case they are taken from wherever the label
//! is written. [`label::Label`] is a label as written; [`label::CanonicalLabel`] has all
//! three parts filled in.
//!
//! ### Packages, rules and files
//! A **package** is a directory with a `BUILD` file. Evaluating the `BUILD` file declares
//! **rules**, such as `cc_library(name = "a", ...)`. A label pointing into a package that
//! does not name one of its rules is a **file**; nobody checks that it exists.
//!
//! A rule is declared *unresolved*: its attribute values are stored exactly as they were
//! written, `select()`s and all. The first time somebody looks at the rule its attributes
//! are **resolved** ([`rule::Rule::resolve_attrs`]), which may load more packages. I do it
//! this way because the config settings a `select()` refers to, and the targets a label
//! refers to, can live in packages that haven't been loaded yet.
//!
//! ### Modules
//! A **module** is a `.bzl` file, pulled in with `load()`. Its public globals (the ones not
//! starting with `_`) are its **exports**, and they are frozen once the module is done.
//!
//! ### Configuration and specificity
//! The **configuration** is a fixed set of `key=value` pairs given up front. A
//! `config_setting` **matches** when every one of its pairs is in the configuration. When
//! several conditions of a `select()` match, the **most specific** one wins: the one whose
//! pairs include every pair of the other matches. If there is no such condition the
//! `select()` is ambiguous and that's an error; see [`select`].
//!
//! ### Caching
//! Packages, modules and resolved attributes are each computed at most once. Failures are
//! cached too, so asking again gets you the same error rather than a second attempt. While
//! something is being computed its key sits on the workspace's in-progress stack, which is
//! how a package that (indirectly) needs itself is reported as a cycle instead of
//! recursing forever.

pub mod attr;
pub mod builtins;
pub mod error;
pub mod eval;
pub mod graph;
pub mod label;
pub mod options;
pub mod package;
pub mod repository;
pub mod rule;
pub mod select;
pub mod target;
pub mod workspace;

pub use error::{BzlResult, Error, ResultExt};
pub use graph::TargetGraph;
pub use label::{CanonicalLabel, Label};
pub use options::{WorkspaceOptions, WorkspaceOptionsBuilder};
pub use target::Target;
pub use workspace::{Config, Workspace};
