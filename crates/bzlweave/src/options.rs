use derive_builder::Builder;

/// File names the workspace looks for. Each list is probed in order and the first
/// file that exists wins.
#[derive(Debug, Builder, Clone, PartialEq, Eq)]
#[builder(setter(into))]
pub struct WorkspaceOptions {
    #[builder(default = "default_workspace_files()")]
    pub workspace_files: Vec<String>,
    #[builder(default = "default_build_files()")]
    pub build_files: Vec<String>,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            workspace_files: default_workspace_files(),
            build_files: default_build_files(),
        }
    }
}

fn default_workspace_files() -> Vec<String> {
    vec![String::from("WORKSPACE.bazel"), String::from("WORKSPACE")]
}

fn default_build_files() -> Vec<String> {
    vec![String::from("BUILD.bazel"), String::from("BUILD")]
}

#[cfg(test)]
mod test {
    use super::{WorkspaceOptions, WorkspaceOptionsBuilder};

    #[test]
    fn builder_defaults() {
        let options = WorkspaceOptionsBuilder::default()
            .build_files(vec![String::from("BUCK")])
            .build()
            .unwrap();

        assert_eq!(options.build_files, vec![String::from("BUCK")]);
        assert_eq!(
            options.workspace_files,
            WorkspaceOptions::default().workspace_files
        );
    }
}
