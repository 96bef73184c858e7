use std::fmt;
use std::rc::Rc;

use derive_more::From;

use crate::label::CanonicalLabel;
use crate::rule::Rule;

/// What a label resolves to: a declared rule, or otherwise a file of the package.
#[derive(Debug, Clone, From)]
pub enum Target {
    Rule(Rc<Rule>),
    File(Rc<File>),
}

impl Target {
    pub fn label(&self) -> &CanonicalLabel {
        match self {
            Target::Rule(rule) => rule.label(),
            Target::File(file) => file.label(),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Target::Rule(rule) => rule.kind(),
            Target::File(_) => "source file",
        }
    }

    pub fn as_rule(&self) -> Option<&Rc<Rule>> {
        match self {
            Target::Rule(rule) => Some(rule),
            Target::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&Rc<File>> {
        match self {
            Target::File(file) => Some(file),
            Target::Rule(_) => None,
        }
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Target::Rule(a), Target::Rule(b)) => Rc::ptr_eq(a, b) || a.label() == b.label(),
            (Target::File(a), Target::File(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.label(), f)
    }
}

/// A path inside a package. Whether it exists on disk is not checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct File {
    label: CanonicalLabel,
}

impl File {
    pub fn new(label: CanonicalLabel) -> File {
        File { label }
    }

    pub fn label(&self) -> &CanonicalLabel {
        &self.label
    }

    /// Path relative to the package directory.
    pub fn name(&self) -> &str {
        &self.label.name
    }

    /// Path relative to the repository root.
    pub fn path(&self) -> String {
        self.label.path()
    }
}
