use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use bzlweave_util::fs::{normalize, FileSystem};
use indexmap::IndexMap;
use scopeguard::ScopeGuard;
use tracing::{debug, info, warn};

use crate::builtins::{self, Builtins};
use crate::error::{BzlResult, Error, ResultExt};
use crate::eval::module::Module;
use crate::eval::value::{Arguments, Value};
use crate::eval::{evaluate_file, Ctx, FileKind, Scope};
use crate::label::{validate_repository_name, CanonicalLabel, Label};
use crate::options::WorkspaceOptions;
use crate::package::Package;
use crate::repository::{Repository, RepositoryKind};
use crate::select::MatchSet;
use crate::target::Target;

/// The active build configuration, e.g. `compilation_mode=opt`.
pub type Config = BTreeMap<String, String>;

/// Root of everything loaded during one run. Owns the repositories (and through them
/// every package and module cache) and the configuration, which never changes after
/// construction.
pub struct Workspace {
    fs: Rc<dyn FileSystem>,
    options: WorkspaceOptions,
    config: Config,
    root: PathBuf,
    name: RefCell<Option<String>>,
    repositories: RefCell<IndexMap<String, Rc<Repository>>>,
    in_progress: RefCell<Vec<String>>,
    build_builtins: Builtins,
    bzl_builtins: Builtins,
    workspace_builtins: Builtins,
}

impl Workspace {
    /// Finds the workspace containing `start` and evaluates its WORKSPACE file.
    pub fn new(
        start: impl AsRef<Path>,
        config: Config,
        fs: Rc<dyn FileSystem>,
    ) -> BzlResult<Workspace> {
        Workspace::with_options(start, config, fs, WorkspaceOptions::default())
    }

    pub fn with_options(
        start: impl AsRef<Path>,
        config: Config,
        fs: Rc<dyn FileSystem>,
        options: WorkspaceOptions,
    ) -> BzlResult<Workspace> {
        let start = fs.absolute(start.as_ref())?;

        let mut found = None;
        for dir in start.ancestors() {
            if let Some(file) = read_first(&*fs, dir, &options.workspace_files)? {
                found = Some((dir.to_path_buf(), file));
                break;
            }
        }
        let Some((root, (file_name, text))) = found else {
            return Err(Error::RootNotFound(start));
        };
        info!(root = %root.display(), file = %file_name, "found workspace");

        let workspace = Workspace {
            fs,
            options,
            config,
            root: root.clone(),
            name: RefCell::new(None),
            repositories: RefCell::new(IndexMap::new()),
            in_progress: RefCell::new(Vec::new()),
            build_builtins: builtins::build_builtins(),
            bzl_builtins: builtins::bzl_builtins(),
            workspace_builtins: builtins::workspace_builtins(),
        };
        workspace.add_repository(Repository::new("", RepositoryKind::Local { root }))?;

        {
            let ctx = Ctx::new(&workspace, "", "", Scope::WorkspaceFile);
            let source_name = CanonicalLabel::new("", "", &file_name).to_string();
            evaluate_file(&ctx, &source_name, &text, FileKind::Workspace)?;
        }

        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The name given to `workspace()`, if any.
    pub fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn options(&self) -> &WorkspaceOptions {
        &self.options
    }

    pub(crate) fn fs(&self) -> &dyn FileSystem {
        &*self.fs
    }

    /// Whether every pair of `values` is set, with the same value, in the configuration.
    pub fn is_config_matching(&self, values: &MatchSet) -> bool {
        values.iter().all(|(k, v)| self.config.get(k) == Some(v))
    }

    /// Looks a repository up by name. The main repository is `""`, and can also be
    /// reached by the name given to `workspace()`.
    pub fn repository(&self, name: &str) -> BzlResult<Rc<Repository>> {
        let name = match self.name.borrow().as_deref() {
            Some(own) if own == name => "",
            _ => name,
        };
        self.repositories
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownRepository(name.to_string()))
    }

    pub fn add_repository(&self, repository: Repository) -> BzlResult<()> {
        let mut repositories = self.repositories.borrow_mut();
        if repositories.contains_key(repository.name()) {
            return Err(Error::DuplicateRepository(repository.name().to_string()));
        }
        debug!(repository = %repository.name(), kind = ?repository.kind(), "declared repository");
        repositories.insert(repository.name().to_string(), Rc::new(repository));
        Ok(())
    }

    /// Loads `package` of `repository`. Every later call returns the same object, or
    /// the same error.
    pub fn load_pkg(&self, repository: &str, package: &str) -> BzlResult<Rc<Package>> {
        self.repository(repository)?.load_pkg(self, package)
    }

    pub fn load_module(&self, label: &CanonicalLabel) -> BzlResult<Rc<Module>> {
        self.repository(&label.repository)?.load_module(self, label)
    }

    /// The target named by `label`. Rules come back with their attributes resolved.
    pub fn target(&self, label: &CanonicalLabel) -> BzlResult<Target> {
        self.load_pkg(&label.repository, &label.package)?
            .get_target(self, &label.name)
    }

    /// Parses `label` in the given context and returns the target it names.
    pub fn resolve_target(
        &self,
        label: &str,
        current_repository: Option<&str>,
        current_package: Option<&str>,
    ) -> BzlResult<Target> {
        let canonical =
            Label::parse(label, current_repository, current_package)?.resolve("", None)?;
        self.target(&canonical)
            .with_context(|| format!("resolving '{label}'"))
    }

    /// Marks `key` as being loaded until the returned guard is dropped. Fails if it
    /// already is, which means it depends on itself.
    pub(crate) fn enter(&self, key: String) -> BzlResult<ScopeGuard<(), impl FnOnce(()) + '_>> {
        let stack = &self.in_progress;
        if let Some(start) = stack.borrow().iter().position(|k| *k == key) {
            let mut cycle = stack.borrow()[start..].to_vec();
            cycle.push(key);
            return Err(Error::CyclicDependency(cycle));
        }

        stack.borrow_mut().push(key);
        Ok(scopeguard::guard((), move |_| {
            stack.borrow_mut().pop();
        }))
    }

    pub(crate) fn builtins(&self, kind: FileKind) -> &Builtins {
        match kind {
            FileKind::Build => &self.build_builtins,
            FileKind::Bzl => &self.bzl_builtins,
            FileKind::Workspace => &self.workspace_builtins,
        }
    }

    /// Reads the first of `names` that exists in `dir`.
    pub(crate) fn read_first(
        &self,
        dir: &Path,
        names: &[String],
    ) -> BzlResult<Option<(String, String)>> {
        read_first(&*self.fs, dir, names)
    }
}

fn read_first(
    fs: &dyn FileSystem,
    dir: &Path,
    names: &[String],
) -> BzlResult<Option<(String, String)>> {
    for name in names {
        match fs.read_to_string(&dir.join(name)) {
            Ok(text) => return Ok(Some((name.clone(), text))),
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}

fn optional_string(value: Option<Value>, what: &str) -> BzlResult<Option<String>> {
    value.map(|v| v.expect_string(what)).transpose()
}

/// `workspace(name)`
pub(crate) fn workspace(ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    let [name] = args.bind("workspace", ["name"], 1)?;
    let name = optional_string(name, "name")?.unwrap_or_default();
    validate_repository_name(&name)?;

    let mut own = ctx.workspace.name.borrow_mut();
    if own.is_some() {
        return Err(Error::Call(String::from(
            "workspace() can only be called once",
        )));
    }
    *own = Some(name);
    Ok(Value::None)
}

/// `local_repository(name, path)`. Relative paths are relative to the workspace root.
pub(crate) fn local_repository(ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    let [name, path, _repo_mapping] =
        args.bind("local_repository", ["name", "path", "repo_mapping"], 2)?;
    let name = optional_string(name, "name")?.unwrap_or_default();
    let path = optional_string(path, "path")?.unwrap_or_default();
    validate_repository_name(&name)?;

    let root = normalize(&ctx.workspace.root.join(path));
    ctx.workspace
        .add_repository(Repository::new(name, RepositoryKind::Local { root }))?;
    Ok(Value::None)
}

/// `http_archive(...)`. Recorded only; fetching the archive is somebody else's job.
pub(crate) fn http_archive(ctx: &Ctx, args: Arguments) -> BzlResult<Value> {
    let [name, url, urls, sha256, strip_prefix, ..] = args.bind(
        "http_archive",
        [
            "name",
            "url",
            "urls",
            "sha256",
            "strip_prefix",
            "type",
            "build_file",
            "build_file_content",
            "patches",
            "patch_args",
            "workspace_file",
        ],
        1,
    )?;
    let name = optional_string(name, "name")?.unwrap_or_default();
    validate_repository_name(&name)?;

    let mut all_urls = Vec::new();
    if let Some(url) = optional_string(url, "url")? {
        all_urls.push(url);
    }
    if let Some(urls) = urls {
        all_urls.extend(urls.expect_string_list("urls")?);
    }
    if all_urls.is_empty() {
        return Err(Error::MissingAttribute(String::from("urls")));
    }

    warn!(repository = %name, "http_archive repositories are not fetched");
    ctx.workspace.add_repository(Repository::new(
        name,
        RepositoryKind::Archive {
            urls: all_urls,
            sha256: optional_string(sha256, "sha256")?,
            strip_prefix: optional_string(strip_prefix, "strip_prefix")?,
        },
    ))?;
    Ok(Value::None)
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use bzlweave_util::fs::MemoryFs;
    use maplit::btreemap;

    use super::{Config, Workspace};
    use crate::error::Error;

    fn config() -> Config {
        btreemap! {
            String::from("compilation_mode") => String::from("opt"),
            String::from("cpu") => String::from("k8"),
        }
    }

    #[test]
    fn finds_root_from_subdirectory() {
        let fs = MemoryFs::new()
            .with_file("ws/WORKSPACE", "workspace(name = 'main')\n")
            .with_file("ws/a/b/BUILD", "");
        let ws = Workspace::new("/ws/a/b", config(), Rc::new(fs)).unwrap();

        assert_eq!(ws.root().to_str(), Some("/ws"));
        assert_eq!(ws.name().as_deref(), Some("main"));
        assert!(Rc::ptr_eq(
            &ws.repository("main").unwrap(),
            &ws.repository("").unwrap()
        ));
    }

    #[test]
    fn prefers_workspace_bazel() {
        let fs = MemoryFs::new()
            .with_file("ws/WORKSPACE.bazel", "workspace(name = 'first')\n")
            .with_file("ws/WORKSPACE", "workspace(name = 'second')\n");
        let ws = Workspace::new("/ws", config(), Rc::new(fs)).unwrap();
        assert_eq!(ws.name().as_deref(), Some("first"));
    }

    #[test]
    fn root_not_found() {
        let fs = MemoryFs::new().with_file("ws/BUILD", "");
        assert!(matches!(
            Workspace::new("/ws", config(), Rc::new(fs)),
            Err(Error::RootNotFound(_))
        ));
    }

    #[test]
    fn config_matching_is_exact() {
        let fs = MemoryFs::new().with_file("WORKSPACE", "");
        let ws = Workspace::new("/", config(), Rc::new(fs)).unwrap();

        assert!(ws.is_config_matching(&btreemap! {
            String::from("cpu") => String::from("k8"),
        }));
        assert!(!ws.is_config_matching(&btreemap! {
            String::from("cpu") => String::from("k"),
        }));
        assert!(!ws.is_config_matching(&btreemap! {
            String::from("cpu") => String::from("k8"),
            String::from("os") => String::from("linux"),
        }));
    }

    #[test]
    fn enter_detects_cycles() {
        let fs = MemoryFs::new().with_file("WORKSPACE", "");
        let ws = Workspace::new("/", Config::new(), Rc::new(fs)).unwrap();

        let _a = ws.enter(String::from("a")).unwrap();
        {
            let _b = ws.enter(String::from("b")).unwrap();
            assert_eq!(
                ws.enter(String::from("a")).err(),
                Some(Error::CyclicDependency(vec![
                    String::from("a"),
                    String::from("b"),
                    String::from("a"),
                ]))
            );
        }
        assert!(ws.enter(String::from("b")).is_ok());
    }
}
