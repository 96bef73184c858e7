use std::rc::Rc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::BzlResult;
use crate::eval::value::Value;
use crate::eval::{evaluate_file, Ctx, FileKind, Globals, Scope};
use crate::label::CanonicalLabel;
use crate::workspace::Workspace;

/// An evaluated `.bzl` file.
pub struct Module {
    label: CanonicalLabel,
    // Functions declared in the file only hold a weak reference to its globals.
    globals: Rc<Globals>,
    exports: IndexMap<String, Value>,
}

impl Module {
    pub fn evaluate(
        workspace: &Workspace,
        label: &CanonicalLabel,
        text: &str,
    ) -> BzlResult<Module> {
        let ctx = Ctx::new(workspace, &label.repository, &label.package, Scope::Module);
        let globals = evaluate_file(&ctx, &label.to_string(), text, FileKind::Bzl)?;

        let exports: IndexMap<String, Value> = {
            let table = globals.borrow();
            for (name, value) in table.iter() {
                if let Value::RuleClass(class) = value {
                    class.export(name);
                }
                value.freeze();
            }

            table
                .iter()
                .filter(|(name, _)| !name.starts_with('_'))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        };

        debug!(module = %label, exports = exports.len(), "evaluated module");

        Ok(Module {
            label: label.clone(),
            globals,
            exports,
        })
    }

    pub fn label(&self) -> &CanonicalLabel {
        &self.label
    }

    /// An exported binding. Names starting with `_` are private to the file.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.exports.get(name).cloned()
    }
}
