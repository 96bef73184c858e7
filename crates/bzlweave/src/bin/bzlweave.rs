use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use bzlweave::{Config, Target, TargetGraph, Workspace};
use bzlweave_util::fs::RealFs;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Resolves targets of a Bazel-style workspace and prints them
#[derive(Parser)]
#[clap(version = "0.1")]
struct Opts {
    /// Directory inside the workspace
    #[clap(short, long, default_value = ".")]
    workspace: PathBuf,

    /// More logging; repeat for even more
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the requested targets and all of their dependencies, dependencies first
    #[clap(long)]
    deps: bool,

    /// `key=value` configuration settings and target labels, in any order
    args: Vec<String>,
}

fn print_target(target: &Target) {
    match target {
        Target::Rule(rule) => {
            println!("{} {}", rule.kind(), rule.label());
            for (name, value) in rule.attrs().iter().flat_map(|attrs| attrs.iter()) {
                println!("  {name} = {value}");
            }
        }
        Target::File(file) => println!("{} {}", target.kind(), file.label()),
    }
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let default_filter = match opts.verbose {
        0 => "bzlweave=warn",
        1 => "bzlweave=info",
        2 => "bzlweave=debug",
        _ => "bzlweave=trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (settings, labels): (Vec<_>, Vec<_>) =
        opts.args.iter().partition(|arg| arg.contains('='));
    let config: Config = settings
        .into_iter()
        .filter_map(|arg| arg.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    let workspace = Workspace::new(&opts.workspace, config, Rc::new(RealFs))
        .with_context(|| format!("loading workspace from {}", opts.workspace.display()))?;

    let targets: Vec<Target> = labels
        .iter()
        .map(|label| workspace.resolve_target(label, None, Some("")))
        .collect::<Result<_, _>>()?;

    if opts.deps {
        let graph = TargetGraph::build(&workspace, &targets)?;
        for target in graph.dependency_order()? {
            print_target(target);
        }
    } else {
        for target in &targets {
            print_target(target);
        }
    }

    Ok(())
}
