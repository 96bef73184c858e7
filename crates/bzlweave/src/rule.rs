use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use crate::attr::{common_attrs, Attr, AttrValue};
use crate::error::{BzlResult, Error, ResultExt};
use crate::eval::value::{Arguments, Key, Value};
use crate::eval::Ctx;
use crate::label::{validate_target_name, CanonicalLabel};
use crate::package::Package;
use crate::workspace::Workspace;

pub type ResolvedAttrs = IndexMap<String, AttrValue>;

/// A kind of rule, such as `cc_library`: a schema plus the callable that declares rules
/// of that kind.
pub struct RuleClass {
    kind: RefCell<Option<String>>,
    attrs: IndexMap<String, Rc<Attr>>,
    doc: String,
}

impl RuleClass {
    /// Builds a class from a rule-specific schema. The common attributes are merged in
    /// and take precedence.
    pub fn new(
        kind: Option<&str>,
        attrs: IndexMap<String, Attr>,
        doc: impl Into<String>,
    ) -> RuleClass {
        let attrs = attrs
            .into_iter()
            .chain(common_attrs())
            .map(|(name, attr)| (name, Rc::new(attr)))
            .collect();

        RuleClass {
            kind: RefCell::new(kind.map(str::to_string)),
            attrs,
            doc: doc.into(),
        }
    }

    pub fn kind(&self) -> Option<String> {
        self.kind.borrow().clone()
    }

    /// Names a class created by `rule()` after the global it was first assigned to.
    pub(crate) fn export(&self, name: &str) {
        let mut kind = self.kind.borrow_mut();
        if kind.is_none() {
            *kind = Some(name.to_string());
        }
    }

    pub fn attrs(&self) -> &IndexMap<String, Rc<Attr>> {
        &self.attrs
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// Declares a rule of this class in the package being evaluated.
    pub fn instantiate(self: &Rc<Self>, ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
        let kind = self.kind().ok_or_else(|| {
            Error::Call(String::from(
                "a rule class must be assigned to a global in a .bzl file before it is used",
            ))
        })?;
        let builder = ctx.package_builder(&kind)?;

        if !args.positional.is_empty() {
            return Err(Error::Call(format!(
                "{kind}() only accepts keyword arguments"
            )));
        }

        let mut attrs = args.named;
        let name = attrs
            .shift_remove("name")
            .ok_or_else(|| Error::MissingAttribute(String::from("name")))
            .and_then(|name| name.expect_string("name"))
            .with_context(|| format!("in {kind} rule"))?;

        let declare = || -> BzlResult<()> {
            validate_target_name(&name)?;

            if let Some(unknown) = attrs.keys().find(|key| !self.attrs.contains_key(*key)) {
                return Err(Error::UnknownAttribute(unknown.clone()));
            }

            let mut attrs = attrs.clone();
            builder.apply_defaults(&mut attrs);

            if let Some((missing, _)) = self.attrs.iter().find(|(key, attr)| {
                attr.mandatory && matches!(attrs.get(*key), None | Some(Value::None))
            }) {
                return Err(Error::MissingAttribute(missing.clone()));
            }

            attrs.values().for_each(Value::freeze);
            builder.add_rule(Rule {
                label: builder.label(&name),
                kind: kind.clone(),
                class: self.clone(),
                raw: attrs,
                state: RefCell::new(RuleState::Unresolved),
            })
        };
        declare().with_context(|| format!("in {kind} rule '{name}'"))?;

        Ok(Value::None)
    }
}

enum RuleState {
    Unresolved,
    Resolved(Rc<ResolvedAttrs>),
    /// Resolution is not retried; the error is returned to every caller.
    Failed(Error),
}

/// A declared target. Attribute values are stored as written and resolved once, on first
/// access through [`Rule::resolve_attrs`].
pub struct Rule {
    label: CanonicalLabel,
    kind: String,
    class: Rc<RuleClass>,
    raw: IndexMap<String, Value>,
    state: RefCell<RuleState>,
}

impl Rule {
    pub fn label(&self) -> &CanonicalLabel {
        &self.label
    }

    pub fn name(&self) -> &str {
        &self.label.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn class(&self) -> &Rc<RuleClass> {
        &self.class
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.borrow(), RuleState::Resolved(_))
    }

    /// The resolved attributes, if [`Rule::resolve_attrs`] has succeeded.
    pub fn attrs(&self) -> Option<Rc<ResolvedAttrs>> {
        match &*self.state.borrow() {
            RuleState::Resolved(attrs) => Some(attrs.clone()),
            _ => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<AttrValue> {
        self.attrs()?.get(name).cloned()
    }

    /// Resolves every attribute of the schema against `package`, the package the rule
    /// was declared in. Runs at most once; later calls return the cached outcome.
    pub fn resolve_attrs(
        &self,
        workspace: &Workspace,
        package: &Package,
    ) -> BzlResult<Rc<ResolvedAttrs>> {
        match &*self.state.borrow() {
            RuleState::Resolved(attrs) => return Ok(attrs.clone()),
            RuleState::Failed(e) => return Err(e.clone()),
            RuleState::Unresolved => {}
        }

        let _guard = workspace.enter(format!("rule {}", self.label))?;
        trace!(rule = %self.label, "resolving attributes");

        let result = self
            .compute_attrs(workspace, package)
            .map(Rc::new)
            .with_context(|| format!("in {} rule {}", self.kind, self.label));

        *self.state.borrow_mut() = match &result {
            Ok(attrs) => RuleState::Resolved(attrs.clone()),
            Err(e) => RuleState::Failed(e.clone()),
        };
        result
    }

    fn compute_attrs(&self, workspace: &Workspace, package: &Package) -> BzlResult<ResolvedAttrs> {
        let mut ret = ResolvedAttrs::new();

        for (name, attr) in &self.class.attrs {
            let raw = match self.raw.get(name) {
                None | Some(Value::None) => &attr.default,
                Some(value) => value,
            };

            let resolved = match raw {
                Value::Lazy(lazy) => lazy.resolve(workspace, package),
                other => Ok(other.clone()),
            };
            let value = resolved
                .and_then(|value| match value {
                    Value::None => Ok(AttrValue::None),
                    value => attr.parser.parse(&value, workspace, package),
                })
                .with_context(|| format!("attribute '{name}'"))?;

            ret.insert(name.clone(), value);
        }

        Ok(ret)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// `rule(implementation, attrs = {}, doc = "", ...)` in `.bzl` files.
pub(crate) fn rule(_ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    let [implementation, attrs, doc, ..] = args.bind(
        "rule",
        [
            "implementation",
            "attrs",
            "doc",
            "executable",
            "test",
            "outputs",
            "output_to_genfiles",
            "fragments",
            "host_fragments",
            "toolchains",
            "provides",
        ],
        0,
    )?;

    if let Some(implementation) = &implementation {
        if !matches!(implementation, Value::Function(_) | Value::None) {
            return Err(Error::invalid_value(format!(
                "implementation must be a function, got {}",
                implementation.type_name()
            )));
        }
    }

    let mut schema = IndexMap::new();
    if let Some(attrs) = attrs {
        let Value::Dict(attrs) = attrs else {
            return Err(Error::invalid_value(format!(
                "attrs must be a dict, got {}",
                attrs.type_name()
            )));
        };
        for (key, value) in attrs.to_vec() {
            let (Key::String(name), Value::Attr(attr)) = (key, value) else {
                return Err(Error::invalid_value(String::from(
                    "attrs must map names to attr.* values",
                )));
            };
            if name == "name" {
                return Err(Error::invalid_value(String::from(
                    "'name' is implicitly declared by every rule",
                )));
            }
            schema.insert(name, (*attr).clone());
        }
    }

    let doc = doc.map(|d| d.expect_string("doc")).transpose()?;
    Ok(Value::RuleClass(Rc::new(RuleClass::new(
        None,
        schema,
        doc.unwrap_or_default(),
    ))))
}
