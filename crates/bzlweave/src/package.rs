use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{BzlResult, Error};
use crate::eval::value::Value;
use crate::label::{format_package, CanonicalLabel};
use crate::rule::Rule;
use crate::select::MatchSet;
use crate::target::{File, Target};
use crate::workspace::Workspace;

/// Values given to `package()`, applied to every rule declared after it.
#[derive(Debug, Clone, Default)]
pub struct PackageDefaults {
    pub visibility: Option<Value>,
    pub testonly: Option<Value>,
    pub deprecation: Option<Value>,
    pub features: Vec<String>,
}

/// Collects the declarations of a BUILD file while it is being evaluated.
pub struct PackageBuilder {
    repository: String,
    path: String,
    rules: RefCell<IndexMap<String, Rc<Rule>>>,
    config_settings: RefCell<IndexMap<String, Option<MatchSet>>>,
    defaults: RefCell<Option<PackageDefaults>>,
}

impl PackageBuilder {
    pub fn new(repository: impl Into<String>, path: impl Into<String>) -> PackageBuilder {
        PackageBuilder {
            repository: repository.into(),
            path: path.into(),
            rules: RefCell::new(IndexMap::new()),
            config_settings: RefCell::new(IndexMap::new()),
            defaults: RefCell::new(None),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn label(&self, name: &str) -> CanonicalLabel {
        CanonicalLabel::new(&self.repository, &self.path, name)
    }

    pub fn set_defaults(&self, defaults: PackageDefaults) -> BzlResult<()> {
        if self.defaults.borrow().is_some() {
            return Err(Error::Call(String::from(
                "package() can only be called once per BUILD file",
            )));
        }
        if !self.rules.borrow().is_empty() || !self.config_settings.borrow().is_empty() {
            return Err(Error::Call(String::from(
                "package() must be called before any target is declared",
            )));
        }
        *self.defaults.borrow_mut() = Some(defaults);
        Ok(())
    }

    /// Fills in the `package()` defaults for attributes the rule call did not set.
    pub fn apply_defaults(&self, attrs: &mut IndexMap<String, Value>) {
        let defaults = self.defaults.borrow();
        let Some(defaults) = defaults.as_ref() else {
            return;
        };

        for (name, value) in [
            ("visibility", &defaults.visibility),
            ("testonly", &defaults.testonly),
            ("deprecation", &defaults.deprecation),
        ] {
            if let Some(value) = value {
                attrs
                    .entry(name.to_string())
                    .or_insert_with(|| value.clone());
            }
        }
    }

    fn check_unique(&self, name: &str) -> BzlResult<()> {
        if self.rules.borrow().contains_key(name)
            || self.config_settings.borrow().contains_key(name)
        {
            return Err(Error::DuplicateTarget(self.label(name).to_string()));
        }
        Ok(())
    }

    pub fn add_rule(&self, rule: Rule) -> BzlResult<()> {
        self.check_unique(rule.name())?;
        self.rules
            .borrow_mut()
            .insert(rule.name().to_string(), Rc::new(rule));
        Ok(())
    }

    /// `values` is `None` when the setting does not match the active configuration.
    pub fn add_config_setting(&self, name: &str, values: Option<MatchSet>) -> BzlResult<()> {
        self.check_unique(name)?;
        self.config_settings
            .borrow_mut()
            .insert(name.to_string(), values);
        Ok(())
    }

    pub fn finish(self) -> Package {
        Package {
            features: self
                .defaults
                .into_inner()
                .map(|d| d.features)
                .unwrap_or_default(),
            repository: self.repository,
            path: self.path,
            rules: self.rules.into_inner(),
            config_settings: self.config_settings.into_inner(),
        }
    }
}

/// A loaded BUILD file. Its set of targets never changes after loading; only the
/// attributes of its rules are resolved later, on demand.
#[derive(Debug)]
pub struct Package {
    repository: String,
    path: String,
    rules: IndexMap<String, Rc<Rule>>,
    config_settings: IndexMap<String, Option<MatchSet>>,
    features: Vec<String>,
}

impl Package {
    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// `//path` or `@repo//path`.
    pub fn name(&self) -> String {
        format_package(&self.repository, &self.path)
    }

    pub fn rule(&self, name: &str) -> Option<&Rc<Rule>> {
        self.rules.get(name)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rc<Rule>> {
        self.rules.values()
    }

    /// `None` if there is no such setting, `Some(None)` if it does not match.
    pub fn config_setting(&self, name: &str) -> Option<Option<&MatchSet>> {
        self.config_settings.get(name).map(Option::as_ref)
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Looks `name` up. Rules get their attributes resolved; anything else is taken to
    /// be a file of this package.
    pub fn get_target(&self, workspace: &Workspace, name: &str) -> BzlResult<Target> {
        match self.rules.get(name) {
            Some(rule) => {
                rule.resolve_attrs(workspace, self)?;
                Ok(Target::Rule(rule.clone()))
            }
            None => Ok(Target::File(Rc::new(File::new(CanonicalLabel::new(
                &self.repository,
                &self.path,
                name,
            ))))),
        }
    }
}
