//! The restricted evaluator.
//!
//! Files are evaluated statement by statement against a table of globals. There are no
//! loops or conditionals; the only way to run code is to call a builtin, a rule, or a
//! function declared with `def` (whose body is straight-line code as well).

use std::cell::RefCell;
use std::rc::Rc;

use bzlweave_syntax::syntax::ast::AstNode;
use bzlweave_syntax::syntax::syntax_node::SyntaxNode;
use bzlweave_syntax::LineIndex;
use indexmap::IndexMap;
use scopeguard::ScopeGuard;

use crate::error::{BzlResult, Error, ResultExt};
use crate::eval::evaluate::{Env, Evaluate};
use crate::eval::value::{Arguments, Function, Value};
use crate::label::{CanonicalLabel, Label};
use crate::package::PackageBuilder;
use crate::workspace::Workspace;

pub mod evaluate;
pub mod module;
pub mod value;

pub type Globals = RefCell<IndexMap<String, Value>>;

/// Which set of builtins a file sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Build,
    Bzl,
    Workspace,
}

/// What the file currently being evaluated is allowed to declare.
pub enum Scope<'a> {
    /// A BUILD file; rules and config settings go into the builder.
    Build(&'a PackageBuilder),
    Module,
    WorkspaceFile,
}

/// Name and line table of an evaluated file, for error messages.
#[derive(Debug)]
pub struct Source {
    pub name: String,
    index: LineIndex,
}

impl Source {
    pub fn new(name: impl Into<String>, text: &str) -> Source {
        Source {
            name: name.into(),
            index: LineIndex::new(text),
        }
    }

    pub fn line(&self, node: &SyntaxNode) -> usize {
        self.index.line(node.text_range().start())
    }

    pub fn location(&self, node: &SyntaxNode) -> String {
        format!("{}:{}", self.name, self.line(node))
    }
}

/// State threaded through one evaluation: the workspace, where in it we are, and the
/// functions currently on the call stack.
pub struct Ctx<'a> {
    pub workspace: &'a Workspace,
    pub repository: &'a str,
    pub package: &'a str,
    pub scope: Scope<'a>,
    call_stack: RefCell<Vec<Rc<Function>>>,
}

impl<'a> Ctx<'a> {
    pub fn new(
        workspace: &'a Workspace,
        repository: &'a str,
        package: &'a str,
        scope: Scope<'a>,
    ) -> Ctx<'a> {
        Ctx {
            workspace,
            repository,
            package,
            scope,
            call_stack: RefCell::new(Vec::new()),
        }
    }

    /// The package being declared, if `name` is being called from a BUILD file.
    pub fn package_builder(&self, name: &str) -> BzlResult<&'a PackageBuilder> {
        match self.scope {
            Scope::Build(builder) => Ok(builder),
            Scope::Module => Err(Error::WrongContext {
                name: name.to_string(),
                context: String::from("while loading a .bzl file"),
            }),
            Scope::WorkspaceFile => Err(Error::WrongContext {
                name: name.to_string(),
                context: String::from("in the WORKSPACE file"),
            }),
        }
    }

    /// Resolves a `load()` label relative to the current file and loads it.
    pub fn load_module(&self, text: &str) -> BzlResult<Rc<module::Module>> {
        let label = Label::parse(text, Some(self.repository), Some(self.package))?
            .resolve(self.repository, Some(self.package))?;
        self.workspace.load_module(&label)
    }

    pub fn label(&self, name: &str) -> CanonicalLabel {
        CanonicalLabel::new(self.repository, self.package, name)
    }

    fn enter_call(
        &self,
        function: &Rc<Function>,
    ) -> BzlResult<ScopeGuard<(), impl FnOnce(()) + '_>> {
        let stack = &self.call_stack;
        if stack.borrow().iter().any(|f| Rc::ptr_eq(f, function)) {
            return Err(Error::Recursion(function.name.clone()));
        }

        stack.borrow_mut().push(function.clone());
        Ok(scopeguard::guard((), move |_| {
            stack.borrow_mut().pop();
        }))
    }
}

/// Parses and evaluates `text`, returning the resulting globals.
pub fn evaluate_file(ctx: &Ctx, name: &str, text: &str, kind: FileKind) -> BzlResult<Rc<Globals>> {
    let root = bzlweave_syntax::parse(text)
        .ok()
        .map_err(Error::from)
        .context(name)?;

    let globals = Rc::new(Globals::default());
    let env = Env::new(ctx, Rc::new(Source::new(name, text)), globals.clone(), kind);
    root.evaluate(&env)?;

    Ok(globals)
}

pub fn call_value(ctx: &Ctx, callee: &Value, args: Arguments) -> BzlResult<Value> {
    match callee {
        Value::Builtin(builtin) => (builtin.func)(ctx, args),
        Value::Function(function) => call_function(ctx, function, args),
        Value::RuleClass(class) => class.instantiate(ctx, args),
        other => Err(Error::Call(format!(
            "'{}' object is not callable",
            other.type_name()
        ))),
    }
}

fn call_function(ctx: &Ctx, function: &Rc<Function>, args: Arguments) -> BzlResult<Value> {
    let _guard = ctx.enter_call(function)?;
    let name = &function.name;

    let globals = function.globals.upgrade().ok_or_else(|| {
        Error::Call(format!("the file declaring '{name}' is no longer loaded"))
    })?;

    let Arguments { positional, named } = args;
    if positional.len() > function.params.len() {
        return Err(Error::Call(format!(
            "{name}() takes {} positional arguments but {} were given",
            function.params.len(),
            positional.len()
        )));
    }

    let mut locals: IndexMap<String, Value> = function
        .params
        .iter()
        .zip(positional)
        .map(|((param, _), value)| (param.clone(), value))
        .collect();

    for (key, value) in named {
        if !function.params.iter().any(|(param, _)| *param == key) {
            return Err(Error::Call(format!(
                "{name}() got an unexpected keyword argument '{key}'"
            )));
        }
        if locals.insert(key.clone(), value).is_some() {
            return Err(Error::Call(format!(
                "{name}() got multiple values for argument '{key}'"
            )));
        }
    }

    for (param, default) in &function.params {
        if locals.contains_key(param) {
            continue;
        }
        match default {
            Some(default) => {
                locals.insert(param.clone(), default.clone());
            }
            None => {
                return Err(Error::Call(format!(
                    "{name}() missing required argument '{param}'"
                )))
            }
        }
    }

    let env = Env::with_locals(
        ctx,
        function.source.clone(),
        globals,
        locals,
        function.kind,
    );
    env.call_body(&function.body)
}

/// Node text, for error messages.
pub(crate) fn describe(node: &impl AstNode) -> String {
    node.syntax().text().to_string()
}
