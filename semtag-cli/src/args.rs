//! Command-line surface

use clap::{Args, Parser, Subcommand};
use semtag_core::ComponentType;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "semtag", version, about = "Version and deploy individual files with git tags")]
pub struct Cli {
    /// Run as if started in this directory.
    #[arg(short = 'C', long = "repo", global = true, value_name = "DIR")]
    pub repo: Option<PathBuf>,

    /// Debug logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Machine-readable output.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn dir(&self) -> PathBuf {
        self.repo.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create .semtag/config.toml and an empty registry.
    Init,
    /// Register a file as a component.
    Add(AddArgs),
    /// List registered components.
    List(ListArgs),
    /// Create, inspect, delete and push version tags.
    #[command(subcommand)]
    Tag(TagCommand),
    /// Move deployment tags between commits.
    #[command(subcommand)]
    Deploy(DeployCommand),
    /// Reconcile registry and file headers with git.
    Resync(ResyncArgs),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub path: PathBuf,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long = "type", value_parser = parse_type)]
    pub component_type: Option<ComponentType>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Include removed components.
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Subcommand)]
pub enum TagCommand {
    /// Release a new version.
    Create {
        component: String,
        version: String,
        /// Commit or reference to tag (default HEAD).
        #[arg(long)]
        commit: Option<String>,
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List tags of one component, or of all components.
    List { component: Option<String> },
    /// Show one tag.
    Show { component: String, tag: String },
    /// Delete a tag locally and optionally on the remote.
    Delete {
        component: String,
        tag: String,
        #[arg(long)]
        remote: bool,
    },
    /// Push tags to the remote.
    Push {
        component: String,
        /// Tags or slots to push (default all of the component's tags).
        tags: Vec<String>,
        /// Overwrite version tags the remote rejects.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum DeployCommand {
    /// Deploy a reference to an environment.
    Set {
        component: String,
        reference: String,
        #[arg(long = "to", value_name = "ENV")]
        environment: String,
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Deploy what one environment has to another.
    Promote {
        component: String,
        #[arg(long, value_name = "ENV")]
        from: String,
        #[arg(long, value_name = "ENV")]
        to: String,
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Per-environment state of a component.
    Status { component: String },
    /// Deployments of every registered component.
    List,
    /// Move an environment back to an earlier version.
    Rollback {
        component: String,
        environment: String,
        /// Target reference (default: the version before the deployed one).
        #[arg(long = "to", value_name = "REF")]
        target: Option<String>,
        #[arg(short, long)]
        message: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct ResyncArgs {
    /// Ignore the stored registry and rebuild from scratch.
    #[arg(long)]
    pub force: bool,
    /// Show the fixes without applying them.
    #[arg(long)]
    pub dry_run: bool,
    /// Rebuild every history from the commit log.
    #[arg(long)]
    pub rebuild_history: bool,
    /// Also rewrite headers with a stale name or id.
    #[arg(long)]
    pub fix_headers: bool,
}

fn parse_type(value: &str) -> Result<ComponentType, String> {
    value.parse().map_err(|e: semtag_core::ValidationError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_deploy_set() {
        let cli = Cli::parse_from(["semtag", "deploy", "set", "greeting", "v1.0.0", "--to", "staging"]);
        match cli.command {
            Command::Deploy(DeployCommand::Set {
                component,
                reference,
                environment,
                ..
            }) => {
                assert_eq!(component, "greeting");
                assert_eq!(reference, "v1.0.0");
                assert_eq!(environment, "staging");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["semtag", "resync", "--dry-run", "--verbose", "--json"]);
        assert!(cli.verbose);
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Resync(ResyncArgs { dry_run: true, .. })));
    }

    #[test]
    fn test_type_parsing() {
        let cli = Cli::parse_from(["semtag", "add", "x.sql", "--type", "queries"]);
        match cli.command {
            Command::Add(args) => assert_eq!(args.component_type, Some(ComponentType::Query)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(Cli::try_parse_from(["semtag", "add", "x", "--type", "widget"]).is_err());
    }
}
