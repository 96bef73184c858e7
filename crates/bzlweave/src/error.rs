use std::path::PathBuf;

use bzlweave_syntax::{ParseError, ParseErrorKind};
use bzlweave_util::fs::FsError;
use itertools::Itertools;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid label '{label}': {reason}")]
    LabelSyntax { label: String, reason: String },

    #[error("label '{0}' cannot be resolved without a current package")]
    LabelContext(String),

    #[error("name '{0}' is not defined")]
    UnboundName(String),

    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("invalid load statement: {0}")]
    LoadSyntax(String),

    #[error("cannot assign to {0}")]
    StoreLocation(String),

    #[error(transparent)]
    Syntax(ParseError),

    #[error("{0}")]
    Call(String),

    #[error("function '{0}' calls itself")]
    Recursion(String),

    #[error("'{name}' cannot be used {context}")]
    WrongContext { name: String, context: String },

    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    #[error("missing mandatory attribute '{0}'")]
    MissingAttribute(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("expected a non-empty {0}")]
    EmptyList(&'static str),

    #[error("no condition in select() matched and there is no default")]
    NoMatchingCondition,

    #[error("select() is ambiguous: neither '{0}' nor '{1}' is more specific")]
    AmbiguousSelect(String, String),

    #[error("'{0}' does not name a config_setting")]
    UnknownConfigSetting(String),

    #[error("unknown repository '@{0}'")]
    UnknownRepository(String),

    #[error("repository '@{0}' is declared more than once")]
    DuplicateRepository(String),

    #[error("no BUILD file for package '{0}'")]
    PackageNotFound(String),

    #[error("file '{0}' does not exist")]
    ModuleNotFound(String),

    #[error("no WORKSPACE file in {} or any of its parents", .0.display())]
    RootNotFound(PathBuf),

    #[error("dependency cycle: {}", .0.iter().join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("target '{0}' is declared more than once")]
    DuplicateTarget(String),

    #[error("repository '@{0}' has not been fetched")]
    RepositoryNotMaterialized(String),

    #[error(transparent)]
    Io(#[from] FsError),

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<Error>,
    },
}

impl Error {
    pub fn context(self, context: impl Into<String>) -> Error {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The condition underneath any number of [`Error::Context`] layers.
    pub fn root(&self) -> &Error {
        let mut ret = self;
        while let Error::Context { source, .. } = ret {
            ret = source;
        }
        ret
    }

    pub(crate) fn invalid_value(message: impl Into<String>) -> Error {
        Error::InvalidValue(message.into())
    }
}

/// Assignments to something other than a single name or subscript are reported the same
/// way whether the parser or the evaluator catches them.
impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        match err.kind {
            ParseErrorKind::MultipleAssignmentTargets | ParseErrorKind::InvalidAssignmentTarget => {
                Error::StoreLocation(err.to_string())
            }
            _ => Error::Syntax(err),
        }
    }
}

pub type BzlResult<T> = Result<T, Error>;

/// `anyhow::Context`, but keeping the typed [`Error`].
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> BzlResult<T>;

    fn with_context<C, F>(self, f: F) -> BzlResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> ResultExt<T> for BzlResult<T> {
    fn context(self, context: impl Into<String>) -> BzlResult<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<C, F>(self, f: F) -> BzlResult<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.context(f()))
    }
}

#[cfg(test)]
mod test {
    use bzlweave_syntax::{ParseError, ParseErrorKind};

    use super::{BzlResult, Error, ResultExt};

    #[test]
    fn context_chain() {
        let res: BzlResult<()> = Err(Error::UnknownAttribute(String::from("srcz")));
        let err = res
            .context("in rule //a:b")
            .with_context(|| format!("in package {}", "//a"))
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "in package //a: in rule //a:b: unknown attribute 'srcz'"
        );
        assert_eq!(err.root(), &Error::UnknownAttribute(String::from("srcz")));
    }

    #[test]
    fn assignment_errors_are_store_errors() {
        let err = Error::from(ParseError {
            line_no: 3,
            kind: ParseErrorKind::MultipleAssignmentTargets,
        });
        assert!(matches!(err, Error::StoreLocation(message) if message.starts_with("line 3")));
    }

    #[test]
    fn cycle_message() {
        let err = Error::CyclicDependency(vec![
            String::from("module //:a.bzl"),
            String::from("module //:b.bzl"),
            String::from("module //:a.bzl"),
        ]);
        assert_eq!(
            err.to_string(),
            "dependency cycle: module //:a.bzl -> module //:b.bzl -> module //:a.bzl"
        );
    }
}
