use std::rc::Rc;

use bzlweave_syntax::syntax::ast::nodes::{
    Arg, Assign, Binary, Body, Call, Def, Dict, Dot, Expr, ExprStmt, Index, List, Literal,
    LiteralValue, Name, Return, Root, Stmt,
};
use bzlweave_syntax::syntax::ast::{AstNode, AstToken};
use indexmap::IndexMap;

use crate::error::{BzlResult, Error, ResultExt};
use crate::eval::value::{normalize_index, Arguments, Function, Key, Value};
use crate::eval::{call_value, describe, Ctx, FileKind, Globals, Source};

pub trait Evaluate {
    type Output;

    fn evaluate(&self, env: &Env) -> BzlResult<Self::Output>;
}

pub enum Flow {
    Continue,
    Return(Value),
}

/// Name resolution for one file or one function call: locals (inside a function), then
/// the file's globals, then the builtins for the kind of file.
pub struct Env<'a> {
    pub ctx: &'a Ctx<'a>,
    pub source: Rc<Source>,
    globals: Rc<Globals>,
    locals: Option<Globals>,
    kind: FileKind,
}

impl<'a> Env<'a> {
    pub fn new(
        ctx: &'a Ctx<'a>,
        source: Rc<Source>,
        globals: Rc<Globals>,
        kind: FileKind,
    ) -> Self {
        Env {
            ctx,
            source,
            globals,
            locals: None,
            kind,
        }
    }

    pub fn with_locals(
        ctx: &'a Ctx<'a>,
        source: Rc<Source>,
        globals: Rc<Globals>,
        locals: IndexMap<String, Value>,
        kind: FileKind,
    ) -> Self {
        Env {
            ctx,
            source,
            globals,
            locals: Some(Globals::new(locals)),
            kind,
        }
    }

    pub fn lookup(&self, name: &str) -> BzlResult<Value> {
        if let Some(value) = self.locals.as_ref().and_then(|l| l.borrow().get(name).cloned()) {
            return Ok(value);
        }
        if let Some(value) = self.globals.borrow().get(name) {
            return Ok(value.clone());
        }
        self.ctx
            .workspace
            .builtins(self.kind)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnboundName(name.to_string()))
    }

    pub fn store(&self, name: impl Into<String>, value: Value) {
        let table = self.locals.as_ref().unwrap_or(&*self.globals);
        table.borrow_mut().insert(name.into(), value);
    }

    pub(crate) fn call_body(&self, body: &Body) -> BzlResult<Value> {
        for stmt in body.statements() {
            let flow = stmt
                .evaluate(self)
                .with_context(|| self.source.location(stmt.syntax()))?;
            if let Flow::Return(value) = flow {
                return Ok(value);
            }
        }
        Ok(Value::None)
    }

    fn load(&self, call: &Call) -> BzlResult<()> {
        let mut args = call.args();

        let module_label = match args.next() {
            Some(Arg::Positional(arg)) => arg
                .value()
                .and_then(|v| v.as_string_literal())
                .ok_or_else(|| {
                    Error::LoadSyntax(String::from("the module label must be a string literal"))
                })?,
            Some(Arg::Keyword(_)) => {
                return Err(Error::LoadSyntax(String::from(
                    "the first argument must be the module label",
                )))
            }
            None => {
                return Err(Error::LoadSyntax(String::from(
                    "load() needs at least a module label",
                )))
            }
        };

        let module = self.ctx.load_module(&module_label)?;

        for arg in args {
            let (local, exported) = match &arg {
                Arg::Positional(arg) => {
                    let name = arg.value().and_then(|v| v.as_string_literal());
                    (name.clone(), name)
                }
                Arg::Keyword(arg) => (
                    arg.keyword().map(|k| k.text().to_string()),
                    arg.value().and_then(|v| v.as_string_literal()),
                ),
            };
            let (Some(local), Some(exported)) = (local, exported) else {
                return Err(Error::LoadSyntax(format!(
                    "symbols must be string literals, got `{}`",
                    describe(&arg)
                )));
            };

            let value = module
                .get(&exported)
                .ok_or_else(|| Error::UnboundName(exported.clone()))
                .with_context(|| format!("loading from {module_label}"))?;
            self.store(local, value);
        }

        Ok(())
    }
}

fn missing(what: &str, node: &impl AstNode) -> Error {
    Error::UnsupportedExpression(format!("incomplete {what}: `{}`", describe(node)))
}

/// `load("...")` written as a statement of its own.
fn as_load(stmt: &Stmt) -> Option<Call> {
    match stmt {
        Stmt::Expr(expr) => match expr.expr()? {
            Expr::Call(call) if call.callee_name().as_deref() == Some("load") => Some(call),
            _ => None,
        },
        _ => None,
    }
}

impl Evaluate for Root {
    type Output = ();

    fn evaluate(&self, env: &Env) -> BzlResult<()> {
        for stmt in self.statements() {
            let res = match as_load(&stmt) {
                Some(call) => env.load(&call),
                None => stmt.evaluate(env).map(|_| ()),
            };
            res.with_context(|| env.source.location(stmt.syntax()))?;
        }
        Ok(())
    }
}

impl Evaluate for Stmt {
    type Output = Flow;

    fn evaluate(&self, env: &Env) -> BzlResult<Flow> {
        match self {
            Stmt::Assign(assign) => assign.evaluate(env).map(|_| Flow::Continue),
            Stmt::Expr(expr) => expr.evaluate(env).map(|_| Flow::Continue),
            Stmt::Def(def) => def.evaluate(env).map(|_| Flow::Continue),
            Stmt::Return(ret) => ret.evaluate(env).map(Flow::Return),
        }
    }
}

impl Evaluate for Assign {
    type Output = ();

    fn evaluate(&self, env: &Env) -> BzlResult<()> {
        let target = self.target().ok_or_else(|| missing("assignment", self))?;
        let value = self
            .value()
            .ok_or_else(|| missing("assignment", self))?
            .evaluate(env)?;

        match target {
            Expr::Name(name) => {
                env.store(name.text(), value);
                Ok(())
            }
            Expr::Index(index) => {
                let base = index
                    .base()
                    .ok_or_else(|| missing("subscript", &index))?
                    .evaluate(env)?;
                let key = index
                    .index()
                    .ok_or_else(|| missing("subscript", &index))?
                    .evaluate(env)?;

                match base {
                    Value::List(list) => list.set(key.expect_int("list index")?, value),
                    Value::Dict(dict) => dict.insert(Key::from_value(&key)?, value),
                    other => Err(Error::StoreLocation(format!(
                        "an item of a {} value",
                        other.type_name()
                    ))),
                }
            }
            other => Err(Error::StoreLocation(format!("`{}`", describe(&other)))),
        }
    }
}

impl Evaluate for ExprStmt {
    type Output = ();

    fn evaluate(&self, env: &Env) -> BzlResult<()> {
        match self.expr() {
            Some(Expr::Call(call)) => call.evaluate(env).map(|_| ()),
            // Docstring
            Some(Expr::Literal(literal)) if literal.is_string() => Ok(()),
            Some(other) => Err(Error::UnsupportedExpression(format!(
                "expression statements must be calls, got `{}`",
                describe(&other)
            ))),
            None => Err(missing("statement", self)),
        }
    }
}

impl Evaluate for Def {
    type Output = ();

    fn evaluate(&self, env: &Env) -> BzlResult<()> {
        let name = self
            .name()
            .ok_or_else(|| missing("function definition", self))?
            .text()
            .to_string();

        let mut params: Vec<(String, Option<Value>)> = Vec::new();
        for param in self.params() {
            let param_name = param
                .name()
                .ok_or_else(|| missing("parameter", &param))?
                .text()
                .to_string();
            if params.iter().any(|(p, _)| *p == param_name) {
                return Err(Error::Call(format!(
                    "duplicate parameter '{param_name}' in {name}()"
                )));
            }

            let default = param.default().map(|e| e.evaluate(env)).transpose()?;
            if let Some(default) = &default {
                default.freeze();
            }
            params.push((param_name, default));
        }

        let function = Function {
            name: name.clone(),
            params,
            body: self.body().ok_or_else(|| missing("function definition", self))?,
            source: env.source.clone(),
            globals: Rc::downgrade(&env.globals),
            kind: env.kind,
        };
        env.store(name, Value::Function(Rc::new(function)));

        Ok(())
    }
}

impl Evaluate for Return {
    type Output = Value;

    fn evaluate(&self, env: &Env) -> BzlResult<Value> {
        match self.value() {
            Some(expr) => expr.evaluate(env),
            None => Ok(Value::None),
        }
    }
}

impl Evaluate for Expr {
    type Output = Value;

    fn evaluate(&self, env: &Env) -> BzlResult<Value> {
        match self {
            Expr::Name(name) => name.evaluate(env),
            Expr::Literal(literal) => literal.evaluate(env),
            Expr::List(list) => list.evaluate(env),
            Expr::Dict(dict) => dict.evaluate(env),
            Expr::Call(call) => call.evaluate(env),
            Expr::Dot(dot) => dot.evaluate(env),
            Expr::Index(index) => index.evaluate(env),
            Expr::Binary(binary) => binary.evaluate(env),
            Expr::Paren(paren) => paren
                .inner()
                .ok_or_else(|| missing("parenthesized expression", paren))?
                .evaluate(env),
        }
    }
}

impl Evaluate for Name {
    type Output = Value;

    fn evaluate(&self, env: &Env) -> BzlResult<Value> {
        env.lookup(&self.text())
    }
}

impl Evaluate for Literal {
    type Output = Value;

    fn evaluate(&self, _env: &Env) -> BzlResult<Value> {
        Ok(match self.value().ok_or_else(|| missing("literal", self))? {
            LiteralValue::None => Value::None,
            LiteralValue::Bool(b) => Value::Bool(b),
            LiteralValue::Int(i) => Value::Int(i),
            LiteralValue::String(s) => Value::String(s),
        })
    }
}

impl Evaluate for List {
    type Output = Value;

    fn evaluate(&self, env: &Env) -> BzlResult<Value> {
        let items = self
            .elements()
            .map(|e| e.evaluate(env))
            .collect::<BzlResult<Vec<_>>>()?;
        Ok(Value::list(items))
    }
}

impl Evaluate for Dict {
    type Output = Value;

    fn evaluate(&self, env: &Env) -> BzlResult<Value> {
        let mut entries = IndexMap::new();
        for entry in self.entries() {
            let key = entry
                .key()
                .ok_or_else(|| missing("dict entry", &entry))?
                .evaluate(env)?;
            let value = entry
                .value()
                .ok_or_else(|| missing("dict entry", &entry))?
                .evaluate(env)?;
            entries.insert(Key::from_value(&key)?, value);
        }
        Ok(Value::dict(entries))
    }
}

impl Evaluate for Call {
    type Output = Value;

    fn evaluate(&self, env: &Env) -> BzlResult<Value> {
        let callee = self.callee().ok_or_else(|| missing("call", self))?;
        if matches!(&callee, Expr::Name(name) if name.text() == "load") {
            return Err(Error::LoadSyntax(String::from(
                "load() must be a top-level statement",
            )));
        }
        let callee = callee.evaluate(env)?;

        let mut args = Arguments::default();
        for arg in self.args() {
            let value = arg
                .value()
                .ok_or_else(|| missing("argument", &arg))?
                .evaluate(env)?;
            match &arg {
                Arg::Positional(_) => args.positional.push(value),
                Arg::Keyword(kw) => {
                    let key = kw
                        .keyword()
                        .ok_or_else(|| missing("keyword argument", kw))?
                        .text()
                        .to_string();
                    if args.named.contains_key(&key) {
                        return Err(Error::Call(format!(
                            "keyword argument '{key}' given more than once"
                        )));
                    }
                    args.named.insert(key, value);
                }
            }
        }

        call_value(env.ctx, &callee, args)
    }
}

impl Evaluate for Dot {
    type Output = Value;

    fn evaluate(&self, env: &Env) -> BzlResult<Value> {
        let receiver = self
            .receiver()
            .ok_or_else(|| missing("attribute access", self))?
            .evaluate(env)?;
        let attribute = self
            .attribute()
            .ok_or_else(|| missing("attribute access", self))?;

        match receiver {
            Value::Struct(s) => s.field(attribute.text()),
            other => Err(Error::invalid_value(format!(
                "'{}' value has no field '{}'",
                other.type_name(),
                attribute.text()
            ))),
        }
    }
}

impl Evaluate for Index {
    type Output = Value;

    fn evaluate(&self, env: &Env) -> BzlResult<Value> {
        let base = self
            .base()
            .ok_or_else(|| missing("subscript", self))?
            .evaluate(env)?;
        let key = self
            .index()
            .ok_or_else(|| missing("subscript", self))?
            .evaluate(env)?;

        match &base {
            Value::List(list) => list.get(key.expect_int("list index")?),
            Value::Dict(dict) => dict
                .get(&Key::from_value(&key)?)
                .ok_or_else(|| Error::invalid_value(format!("key {key} not found in dict"))),
            Value::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = normalize_index(key.expect_int("string index")?, chars.len())?;
                Ok(Value::String(chars[idx].to_string()))
            }
            other => Err(Error::invalid_value(format!(
                "'{}' value is not subscriptable",
                other.type_name()
            ))),
        }
    }
}

impl Evaluate for Binary {
    type Output = Value;

    fn evaluate(&self, env: &Env) -> BzlResult<Value> {
        let lhs = self
            .lhs()
            .ok_or_else(|| missing("binary expression", self))?
            .evaluate(env)?;
        let rhs = self
            .rhs()
            .ok_or_else(|| missing("binary expression", self))?
            .evaluate(env)?;
        lhs.add(&rhs)
    }
}
