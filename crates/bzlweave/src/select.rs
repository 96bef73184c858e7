//! `select()` and deferred `+`.
//!
//! A `select()` cannot be resolved while its BUILD file is being evaluated: the config
//! settings it refers to may live in packages that have not been loaded yet. It is kept
//! as a [`Lazy`] value and resolved together with the attributes of the rule it was
//! passed to.
//!
//! When more than one condition matches, the most specific one wins. A condition is more
//! specific than another when its `values` contain every key/value pair of the other
//! and at least one more. If no matching condition is more specific than all the others
//! the select is ambiguous; iteration order never decides.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use itertools::Itertools;
use tracing::{debug, trace};

use crate::error::{BzlResult, Error, ResultExt};
use crate::eval::value::{Arguments, Key, Value};
use crate::eval::Ctx;
use crate::label::Label;
use crate::package::Package;
use crate::workspace::Workspace;

/// The key/value pairs a `config_setting` requires.
pub type MatchSet = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub enum Lazy {
    Literal(Value),
    Select(Select),
    Sum(Box<Lazy>, Box<Lazy>),
}

impl Lazy {
    /// `lhs + rhs` where at least one side is deferred.
    pub fn sum(lhs: &Value, rhs: &Value) -> Value {
        let operand = |value: &Value| match value {
            Value::Lazy(lazy) => Box::new((**lazy).clone()),
            other => Box::new(Lazy::Literal(other.clone())),
        };
        Value::Lazy(Rc::new(Lazy::Sum(operand(lhs), operand(rhs))))
    }

    pub fn resolve(&self, workspace: &Workspace, package: &Package) -> BzlResult<Value> {
        match self {
            Lazy::Literal(value) => Ok(value.clone()),
            Lazy::Select(select) => match select.resolve(workspace, package)? {
                Value::Lazy(inner) => inner.resolve(workspace, package),
                value => Ok(value),
            },
            Lazy::Sum(lhs, rhs) => {
                let lhs = lhs.resolve(workspace, package)?;
                let rhs = rhs.resolve(workspace, package)?;
                lhs.add(&rhs)
            }
        }
    }

    /// Whether `f` holds for any value this composition may produce.
    pub(crate) fn any_value(&self, f: &mut dyn FnMut(&Value) -> bool) -> bool {
        match self {
            Lazy::Literal(value) => f(value),
            Lazy::Select(select) => select.conditions.iter().any(|(_, v)| f(v)),
            Lazy::Sum(lhs, rhs) => lhs.any_value(f) || rhs.any_value(f),
        }
    }

    pub fn freeze(&self) {
        match self {
            Lazy::Literal(value) => value.freeze(),
            Lazy::Select(select) => select.conditions.iter().for_each(|(_, v)| v.freeze()),
            Lazy::Sum(lhs, rhs) => {
                lhs.freeze();
                rhs.freeze();
            }
        }
    }
}

impl fmt::Display for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lazy::Literal(value) => write!(f, "{value}"),
            Lazy::Select(select) => write!(
                f,
                "select({{{}}})",
                select
                    .conditions
                    .iter()
                    .map(|(k, v)| format!("{k:?}: {v}"))
                    .join(", ")
            ),
            Lazy::Sum(lhs, rhs) => write!(f, "{lhs} + {rhs}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Select {
    conditions: Vec<(String, Value)>,
    no_match_error: Option<String>,
}

struct Candidate {
    key: String,
    values: MatchSet,
    value: Value,
}

impl Select {
    pub fn new(conditions: Vec<(String, Value)>) -> Select {
        Select {
            conditions,
            no_match_error: None,
        }
    }

    /// Picks the value of the most specific matching condition. Condition labels are
    /// relative to `package`.
    pub fn resolve(&self, workspace: &Workspace, package: &Package) -> BzlResult<Value> {
        let mut default = None;
        let mut matched = Vec::new();

        for (key, value) in &self.conditions {
            let label = Label::parse(key, None, None)?;
            if label.is_default_condition() {
                default = Some(value.clone());
                continue;
            }

            let label = label.resolve(package.repository(), Some(package.path()))?;
            let owner = workspace
                .load_pkg(&label.repository, &label.package)
                .with_context(|| format!("resolving condition '{key}'"))?;

            match owner.config_setting(&label.name) {
                None => return Err(Error::UnknownConfigSetting(key.clone())),
                Some(None) => trace!(condition = %key, "condition does not match"),
                Some(Some(values)) => matched.push(Candidate {
                    key: key.clone(),
                    values: values.clone(),
                    value: value.clone(),
                }),
            }
        }

        if matched.is_empty() {
            return default.ok_or(Error::NoMatchingCondition).map_err(|e| {
                match &self.no_match_error {
                    Some(message) => e.context(message.clone()),
                    None => e,
                }
            });
        }

        let winner = most_specific(&matched)?;
        debug!(condition = %winner.key, "select() resolved");
        Ok(winner.value.clone())
    }
}

/// Whether `a` requires everything `b` does, and more.
fn dominates(a: &MatchSet, b: &MatchSet) -> bool {
    a.len() > b.len() && b.iter().all(|(k, v)| a.get(k) == Some(v))
}

fn most_specific(matched: &[Candidate]) -> BzlResult<&Candidate> {
    if let Some(winner) = matched.iter().find(|candidate| {
        matched
            .iter()
            .filter(|other| !std::ptr::eq(*other, *candidate))
            .all(|other| dominates(&candidate.values, &other.values))
    }) {
        return Ok(winner);
    }

    // Without a winner there is always a pair where neither side dominates
    let (a, b) = matched
        .iter()
        .tuple_combinations()
        .find(|(a, b)| !dominates(&a.values, &b.values) && !dominates(&b.values, &a.values))
        .map(|(a, b)| (a.key.clone(), b.key.clone()))
        .unwrap_or_default();
    Err(Error::AmbiguousSelect(a, b))
}

/// `select(x, no_match_error = "")`
pub(crate) fn select(_ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    let [x, no_match_error] = args.bind("select", ["x", "no_match_error"], 1)?;

    let conditions = match x {
        Some(Value::Dict(dict)) => dict
            .to_vec()
            .into_iter()
            .map(|(key, value)| match key {
                Key::String(key) => {
                    value.freeze();
                    Ok((key, value))
                }
                other => Err(Error::invalid_value(format!(
                    "select() keys must be label strings, got {other}"
                ))),
            })
            .collect::<BzlResult<Vec<_>>>()?,
        Some(other) => {
            return Err(Error::invalid_value(format!(
                "select() expects a dict, got {} {other}",
                other.type_name()
            )))
        }
        None => Vec::new(),
    };

    let no_match_error = no_match_error
        .map(|m| m.expect_string("no_match_error"))
        .transpose()?
        .filter(|m| !m.is_empty());

    Ok(Value::Lazy(Rc::new(Lazy::Select(Select {
        conditions,
        no_match_error,
    }))))
}

#[cfg(test)]
mod test {
    use maplit::btreemap;

    use super::{dominates, most_specific, Candidate, MatchSet};
    use crate::error::Error;
    use crate::eval::value::Value;

    fn candidate(key: &str, values: MatchSet) -> Candidate {
        Candidate {
            key: key.to_string(),
            values,
            value: Value::string(key),
        }
    }

    #[test]
    fn dominance_is_on_pairs() {
        let opt = btreemap! { String::from("mode") => String::from("opt") };
        let opt_arm = btreemap! {
            String::from("mode") => String::from("opt"),
            String::from("cpu") => String::from("arm"),
        };
        let dbg_arm = btreemap! {
            String::from("mode") => String::from("dbg"),
            String::from("cpu") => String::from("arm"),
        };

        assert!(dominates(&opt_arm, &opt));
        assert!(!dominates(&opt, &opt_arm));
        assert!(!dominates(&opt, &opt));
        assert!(!dominates(&dbg_arm, &opt));
    }

    #[test]
    fn winner_does_not_depend_on_order() {
        let general = candidate("general", btreemap! { String::from("a") => String::from("1") });
        let specific = candidate(
            "specific",
            btreemap! {
                String::from("a") => String::from("1"),
                String::from("b") => String::from("2"),
            },
        );

        let forward = [
            candidate("general", general.values.clone()),
            candidate("specific", specific.values.clone()),
        ];
        let backward = [specific, general];

        assert_eq!(most_specific(&forward).unwrap().key, "specific");
        assert_eq!(most_specific(&backward).unwrap().key, "specific");
    }

    #[test]
    fn incomparable_is_ambiguous() {
        let matched = [
            candidate("x", btreemap! { String::from("a") => String::from("1") }),
            candidate("y", btreemap! { String::from("b") => String::from("2") }),
        ];
        assert!(matches!(
            most_specific(&matched),
            Err(Error::AmbiguousSelect(a, b)) if a == "x" && b == "y"
        ));

        let same = [
            candidate("x", btreemap! { String::from("a") => String::from("1") }),
            candidate("y", btreemap! { String::from("a") => String::from("1") }),
        ];
        assert!(most_specific(&same).is_err());
    }
}
