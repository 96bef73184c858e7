use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fxhash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{BzlResult, Error, ResultExt};
use crate::eval::module::Module;
use crate::eval::{evaluate_file, Ctx, FileKind, Scope};
use crate::label::{format_package, CanonicalLabel};
use crate::package::{Package, PackageBuilder};
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryKind {
    /// A directory on disk, known up front.
    Local { root: PathBuf },
    /// Declared with `http_archive`. Fetching is left to an external tool, so until then
    /// none of its packages can be loaded.
    Archive {
        urls: Vec<String>,
        sha256: Option<String>,
        strip_prefix: Option<String>,
    },
}

/// Populate-once cache entry.
enum Slot<T> {
    Loaded(T),
    Failed(Error),
}

impl<T: Clone> Slot<T> {
    fn new(result: &BzlResult<T>) -> Slot<T> {
        match result {
            Ok(value) => Slot::Loaded(value.clone()),
            Err(e) => Slot::Failed(e.clone()),
        }
    }

    fn get(&self) -> BzlResult<T> {
        match self {
            Slot::Loaded(value) => Ok(value.clone()),
            Slot::Failed(e) => Err(e.clone()),
        }
    }
}

type Cache<T> = RefCell<FxHashMap<String, Slot<T>>>;

/// Returns the cached outcome for `key`, or runs `load` once and caches what it returns.
/// `stack_key` is pushed on the workspace's in-progress stack while `load` runs.
fn cached<T: Clone>(
    cache: &Cache<T>,
    key: &str,
    workspace: &Workspace,
    stack_key: String,
    load: impl FnOnce() -> BzlResult<T>,
) -> BzlResult<T> {
    if let Some(slot) = cache.borrow().get(key) {
        return slot.get();
    }

    let _guard = workspace.enter(stack_key)?;
    let result = load();
    cache.borrow_mut().insert(key.to_string(), Slot::new(&result));
    result
}

pub struct Repository {
    name: String,
    kind: RepositoryKind,
    packages: Cache<Rc<Package>>,
    modules: Cache<Rc<Module>>,
}

impl Repository {
    pub fn new(name: impl Into<String>, kind: RepositoryKind) -> Repository {
        Repository {
            name: name.into(),
            kind,
            packages: RefCell::new(FxHashMap::default()),
            modules: RefCell::new(FxHashMap::default()),
        }
    }

    /// `""` for the main repository.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &RepositoryKind {
        &self.kind
    }

    pub fn root(&self) -> BzlResult<&Path> {
        match &self.kind {
            RepositoryKind::Local { root } => Ok(root),
            RepositoryKind::Archive { urls, .. } => {
                warn!(
                    repository = %self.name,
                    urls = ?urls,
                    "archive repository has not been fetched"
                );
                Err(Error::RepositoryNotMaterialized(self.name.clone()))
            }
        }
    }

    /// Loads the package at `path`, evaluating its BUILD file the first time.
    pub fn load_pkg(&self, workspace: &Workspace, path: &str) -> BzlResult<Rc<Package>> {
        let name = format_package(&self.name, path);
        cached(
            &self.packages,
            path,
            workspace,
            format!("package {name}"),
            || {
                self.evaluate_package(workspace, path)
                    .map(Rc::new)
                    .with_context(|| format!("in package {name}"))
            },
        )
    }

    fn evaluate_package(&self, workspace: &Workspace, path: &str) -> BzlResult<Package> {
        let dir = self.root()?.join(path);
        let name = format_package(&self.name, path);

        let Some((file_name, text)) = workspace.read_first(&dir, &workspace.options().build_files)?
        else {
            return Err(Error::PackageNotFound(name));
        };
        debug!(package = %name, file = %file_name, "loading package");

        let builder = PackageBuilder::new(&self.name, path);
        {
            let ctx = Ctx::new(workspace, &self.name, path, Scope::Build(&builder));
            let source_name = CanonicalLabel::new(&self.name, path, &file_name).to_string();
            evaluate_file(&ctx, &source_name, &text, FileKind::Build)?;
        }

        Ok(builder.finish())
    }

    /// Loads a `.bzl` file. The BUILD file of its package is not evaluated.
    pub fn load_module(
        &self,
        workspace: &Workspace,
        label: &CanonicalLabel,
    ) -> BzlResult<Rc<Module>> {
        cached(
            &self.modules,
            &label.path(),
            workspace,
            format!("module {label}"),
            || {
                let path = self.root()?.join(label.path());
                let text = workspace.fs().read_to_string(&path).map_err(|e| {
                    if e.is_not_found() {
                        Error::ModuleNotFound(label.to_string())
                    } else {
                        Error::Io(e)
                    }
                })?;
                debug!(module = %label, "loading module");

                Module::evaluate(workspace, label, &text)
                    .map(Rc::new)
                    .with_context(|| format!("in module {label}"))
            },
        )
    }

    /// Paths of the packages loaded so far, sorted.
    pub fn loaded_packages(&self) -> Vec<String> {
        let mut ret: Vec<String> = self
            .packages
            .borrow()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Loaded(_)))
            .map(|(path, _)| path.clone())
            .collect();
        ret.sort();
        ret
    }
}
