//! Label parsing.
//!
//! A label has up to three parts: `@repo//some/package:target`. Any of them may be
//! omitted, in which case the caller's context fills in the blanks; see [`Label::parse`].

use std::fmt;

use bzlweave_util::split::last_segment;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{BzlResult, Error};

static LABEL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:@(?P<repo>[a-zA-Z0-9._\-]+))?//(?P<pkg>(?:[a-zA-Z0-9._\-]+(?:/[a-zA-Z0-9._\-]+)*)?))?(?P<colon>:)?(?P<tgt>[a-zA-Z0-9_.+\-=,@~]+(?:/[a-zA-Z0-9_.+\-=,@~]+)*)?$",
    )
    .unwrap()
});

static REPOSITORY_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._\-]+$").unwrap());

/// A label as written, with the parts that were not written left as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub repository: Option<String>,
    pub package: Option<String>,
    pub target: String,
}

impl Label {
    /// Parses `text`, taking the repository and package from `current_repository` and
    /// `current_package` when the label does not name them.
    pub fn parse(
        text: &str,
        current_repository: Option<&str>,
        current_package: Option<&str>,
    ) -> BzlResult<Label> {
        let syntax_error = |reason: &str| Error::LabelSyntax {
            label: text.to_string(),
            reason: reason.to_string(),
        };

        // `@repo` is short for `@repo//:repo`
        if let Some(name) = text.strip_prefix('@').filter(|rest| !rest.contains("//")) {
            if !REPOSITORY_NAME_REGEX.is_match(name) {
                return Err(syntax_error("invalid repository name"));
            }
            return Ok(Label {
                repository: Some(name.to_string()),
                package: Some(String::new()),
                target: name.to_string(),
            });
        }

        let captures = LABEL_REGEX
            .captures(text)
            .ok_or_else(|| syntax_error("does not match the label grammar"))?;

        let repository = captures.name("repo").map(|m| m.as_str().to_string());
        let package = captures.name("pkg").map(|m| m.as_str().to_string());
        let target = match captures.name("tgt") {
            Some(_) if package.is_some() && captures.name("colon").is_none() => {
                return Err(syntax_error("the target name must follow ':'"))
            }
            Some(m) => m.as_str().to_string(),
            None => match package.as_deref() {
                Some("") => {
                    return Err(syntax_error(
                        "the target name cannot be omitted for the root package",
                    ))
                }
                Some(pkg) => last_segment(pkg).to_string(),
                None => return Err(Error::LabelContext(text.to_string())),
            },
        };

        if let Some(pkg) = &package {
            if has_relative_segment(pkg) {
                return Err(syntax_error("package contains '.' or '..'"));
            }
        }
        if target != "." && has_relative_segment(&target) {
            return Err(syntax_error("target contains '.' or '..'"));
        }

        Ok(Label {
            repository: repository.or_else(|| current_repository.map(str::to_string)),
            package: package.or_else(|| current_package.map(str::to_string)),
            target,
        })
    }

    /// Canonical form of the label, using `repository` and `package` for the parts it
    /// does not name itself.
    pub fn resolve(&self, repository: &str, package: Option<&str>) -> BzlResult<CanonicalLabel> {
        let package = self
            .package
            .as_deref()
            .or(package)
            .ok_or_else(|| Error::LabelContext(self.to_string()))?;

        Ok(CanonicalLabel {
            repository: self.repository.as_deref().unwrap_or(repository).to_string(),
            package: package.to_string(),
            name: self.target.clone(),
        })
    }

    /// Whether this is the reserved `//conditions:default` key of `select()`.
    pub fn is_default_condition(&self) -> bool {
        self.repository.is_none()
            && self.package.as_deref() == Some("conditions")
            && self.target == "default"
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => f.write_str(&format(
                self.repository.as_deref(),
                package,
                &self.target,
            )),
            None => write!(f, ":{}", self.target),
        }
    }
}

/// Formats a label for diagnostics. The main repository is written without `@`.
pub fn format(repository: Option<&str>, package: &str, target: &str) -> String {
    match repository {
        Some(repo) if !repo.is_empty() => format!("@{repo}//{package}:{target}"),
        _ => format!("//{package}:{target}"),
    }
}

/// `//package`, or `@repository//package` outside the main repository.
pub fn format_package(repository: &str, package: &str) -> String {
    if repository.is_empty() {
        format!("//{package}")
    } else {
        format!("@{repository}//{package}")
    }
}

/// Checks that `name` could be the target part of a label.
pub fn validate_target_name(name: &str) -> BzlResult<()> {
    match Label::parse(&format!(":{name}"), None, None) {
        Ok(label) if label.target == name && name != "." => Ok(()),
        Ok(_) => Err(Error::LabelSyntax {
            label: name.to_string(),
            reason: String::from("not a valid target name"),
        }),
        Err(e) => Err(e),
    }
}

pub fn validate_repository_name(name: &str) -> BzlResult<()> {
    if REPOSITORY_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(Error::LabelSyntax {
            label: format!("@{name}"),
            reason: String::from("invalid repository name"),
        })
    }
}

fn has_relative_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "." || segment == "..")
}

/// A fully qualified target identity. The main repository is `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalLabel {
    pub repository: String,
    pub package: String,
    pub name: String,
}

impl CanonicalLabel {
    pub fn new(
        repository: impl Into<String>,
        package: impl Into<String>,
        name: impl Into<String>,
    ) -> CanonicalLabel {
        CanonicalLabel {
            repository: repository.into(),
            package: package.into(),
            name: name.into(),
        }
    }

    /// Path of the file this label points at, relative to its repository root.
    pub fn path(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.package, self.name)
        }
    }
}

impl fmt::Display for CanonicalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(Some(&self.repository), &self.package, &self.name))
    }
}
