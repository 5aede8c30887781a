//! Command handlers
//!
//! Each handler writes human-readable text, or JSON with `--json`, to `out`.

use crate::args::{AddArgs, Cli, Command, DeployCommand, ListArgs, ResyncArgs, TagCommand};
use crate::error::CliResult;
use semtag_core::Component;
use semtag_engine::{DeploymentMove, EnvironmentStatus, Project, ResyncOptions, TagListing};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::warn;

pub fn run(cli: &Cli, out: &mut dyn Write) -> CliResult<()> {
    let dir = cli.dir();
    if let Command::Init = cli.command {
        return init(&dir, cli.json, out);
    }
    let project = Project::open(&dir)?;
    let json = cli.json;
    match &cli.command {
        Command::Init => Ok(()),
        Command::Add(args) => add(&project, args, json, out),
        Command::List(args) => list(&project, args, json, out),
        Command::Tag(cmd) => tag(&project, cmd, json, out),
        Command::Deploy(cmd) => deploy(&project, cmd, json, out),
        Command::Resync(args) => resync(&project, args, json, out),
    }
}

fn emit<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn short(commit: &str) -> &str {
    commit.get(..8).unwrap_or(commit)
}

fn init(dir: &Path, json: bool, out: &mut dyn Write) -> CliResult<()> {
    let (project, outcome) = Project::init(dir)?;
    if json {
        return emit(out, &outcome);
    }
    writeln!(out, "Initialized semtag in {}", project.git().root().display())?;
    if outcome.config_created {
        writeln!(out, "  created {}", outcome.config_path)?;
    }
    if outcome.registry_created {
        writeln!(out, "  created {}", outcome.registry_path)?;
    }
    Ok(())
}

fn add(project: &Project, args: &AddArgs, json: bool, out: &mut dyn Write) -> CliResult<()> {
    let component = project.add(&args.path, args.name.as_deref(), args.component_type)?;
    if json {
        return emit(out, &component);
    }
    writeln!(
        out,
        "Registered {} {} ({}) at {}, version {}",
        component.component_type, component.name, component.id, component.path, component.version
    )?;
    Ok(())
}

fn list(project: &Project, args: &ListArgs, json: bool, out: &mut dyn Write) -> CliResult<()> {
    let doc = project.load_registry()?;
    let components: Vec<&Component> = doc
        .components()
        .into_iter()
        .filter(|c| args.all || c.is_active())
        .collect();
    if json {
        return emit(out, &components);
    }
    if components.is_empty() {
        writeln!(out, "No components registered.")?;
        return Ok(());
    }
    writeln!(out, "{:<24} {:<9} {:<10} {:<8} PATH", "NAME", "TYPE", "VERSION", "STATUS")?;
    for c in components {
        writeln!(
            out,
            "{:<24} {:<9} {:<10} {:<8} {}",
            c.name,
            c.component_type.as_str(),
            c.version.to_string(),
            c.status.as_str(),
            c.path
        )?;
    }
    Ok(())
}

// ============================================================================
// TAGS
// ============================================================================

fn write_listing(out: &mut dyn Write, listing: &TagListing, indent: &str) -> CliResult<()> {
    for v in &listing.versions {
        writeln!(out, "{}{}", indent, v.tag)?;
    }
    for d in &listing.deployments {
        writeln!(out, "{}{} (deployment: {})", indent, d.tag, d.environment)?;
    }
    Ok(())
}

fn tag(project: &Project, cmd: &TagCommand, json: bool, out: &mut dyn Write) -> CliResult<()> {
    let tags = project.tags();
    match cmd {
        TagCommand::Create {
            component,
            version,
            commit,
            message,
        } => {
            let release = project.releases().release(
                component,
                version,
                commit.as_deref(),
                message.as_deref(),
            )?;
            if json {
                return emit(out, &release);
            }
            writeln!(out, "Created {} at {}", release.tag.tag, short(&release.tag.commit))?;
            if !release.recorded {
                writeln!(out, "  note: file absent at that commit, history not recorded")?;
            }
            if release.header_written {
                writeln!(out, "  header updated to {}", release.tag.version)?;
            }
        }
        TagCommand::List { component: Some(key) } => {
            let component = project.component(key)?;
            let listing = tags.list_tags(&project.scope(&component))?;
            if json {
                return emit(out, &listing);
            }
            if listing.versions.is_empty() && listing.deployments.is_empty() {
                writeln!(out, "No tags for {}.", component.name)?;
            }
            write_listing(out, &listing, "")?;
        }
        TagCommand::List { component: None } => {
            let all: BTreeMap<String, TagListing> = tags.list_all(project.config().namespace)?;
            if json {
                return emit(out, &all);
            }
            if all.is_empty() {
                writeln!(out, "No component tags.")?;
            }
            for (prefix, listing) in &all {
                writeln!(out, "{}", prefix)?;
                write_listing(out, listing, "  ")?;
            }
        }
        TagCommand::Show { component, tag } => {
            let component = project.component(component)?;
            let info = tags.get_tag_info(&project.scope(&component), tag)?;
            if json {
                return emit(out, &info);
            }
            writeln!(out, "tag:       {}", info.tag)?;
            writeln!(out, "commit:    {}", info.commit)?;
            writeln!(out, "author:    {}", info.author)?;
            if let Some(date) = info.date {
                writeln!(out, "date:      {}", date.to_rfc3339())?;
            }
            writeln!(out, "annotated: {}", info.annotated)?;
            if let Some(version) = &info.version {
                writeln!(out, "version:   {}", version)?;
            }
            writeln!(out)?;
            for line in info.message.lines() {
                writeln!(out, "    {}", line)?;
            }
        }
        TagCommand::Delete {
            component,
            tag,
            remote,
        } => {
            let component = project.component(component)?;
            let outcome = tags.delete_tag(&project.scope(&component), tag, *remote)?;
            if json {
                return emit(out, &outcome);
            }
            writeln!(out, "Deleted {}", outcome.tag)?;
            if outcome.remote_deleted {
                writeln!(out, "  deleted on {}", project.config().remote)?;
            }
            if let Some(warning) = &outcome.remote_warning {
                writeln!(out, "  warning: remote delete failed: {}", warning)?;
            }
        }
        TagCommand::Push {
            component,
            tags: names,
            force,
        } => {
            let component = project.component(component)?;
            let selected = (!names.is_empty()).then_some(names.as_slice());
            let report = tags.push_tags(&project.scope(&component), selected, *force)?;
            if json {
                return emit(out, &report);
            }
            if report.pushed.is_empty() {
                writeln!(out, "Nothing to push.")?;
            }
            for tag in &report.pushed {
                let forced = if report.forced.contains(tag) { " (forced)" } else { "" };
                writeln!(out, "Pushed {}{}", tag, forced)?;
            }
        }
    }
    Ok(())
}

// ============================================================================
// DEPLOYMENTS
// ============================================================================

fn check_environment(project: &Project, environment: &str) {
    if !project.config().environments.iter().any(|e| e == environment) {
        warn!(
            environment,
            known = ?project.config().environments,
            "environment is not listed in the configuration"
        );
    }
}

fn write_move(out: &mut dyn Write, name: &str, mv: &DeploymentMove) -> CliResult<()> {
    let what = mv
        .version
        .as_ref()
        .map(|v| v.tag_slot())
        .unwrap_or_else(|| short(&mv.commit).to_string());
    if mv.moved {
        writeln!(
            out,
            "Deployed {} {} to {} ({})",
            name,
            what,
            mv.environment,
            short(&mv.commit)
        )?;
    } else {
        writeln!(out, "{} already has {} {} deployed", mv.environment, name, what)?;
    }
    Ok(())
}

fn write_status_row(out: &mut dyn Write, row: &EnvironmentStatus) -> CliResult<()> {
    writeln!(
        out,
        "{:<12} {:<10} {:<9} {}",
        row.environment,
        row.version
            .as_ref()
            .map(|v| v.tag_slot())
            .unwrap_or_else(|| "-".to_string()),
        row.commit.as_deref().map(short).unwrap_or("-"),
        row.date
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "-".to_string())
    )?;
    Ok(())
}

fn deploy(project: &Project, cmd: &DeployCommand, json: bool, out: &mut dyn Write) -> CliResult<()> {
    let deployments = project.deployments();
    match cmd {
        DeployCommand::Set {
            component,
            reference,
            environment,
            message,
        } => {
            check_environment(project, environment);
            let component = project.component(component)?;
            let mv = deployments.set(
                &project.scope(&component),
                reference,
                environment,
                message.as_deref(),
            )?;
            if json {
                return emit(out, &mv);
            }
            write_move(out, &component.name, &mv)?;
        }
        DeployCommand::Promote {
            component,
            from,
            to,
            message,
        } => {
            check_environment(project, to);
            let component = project.component(component)?;
            let mv = deployments.promote(&project.scope(&component), from, to, message.as_deref())?;
            if json {
                return emit(out, &mv);
            }
            write_move(out, &component.name, &mv)?;
        }
        DeployCommand::Rollback {
            component,
            environment,
            target,
            message,
        } => {
            let component = project.component(component)?;
            let mv = deployments.rollback(
                &project.scope(&component),
                environment,
                target.as_deref(),
                message.as_deref(),
            )?;
            if json {
                return emit(out, &mv);
            }
            write_move(out, &component.name, &mv)?;
        }
        DeployCommand::Status { component } => {
            let component = project.component(component)?;
            let rows =
                deployments.status(&project.scope(&component), &project.config().environments)?;
            if json {
                return emit(out, &rows);
            }
            writeln!(out, "{:<12} {:<10} {:<9} DATE", "ENV", "VERSION", "COMMIT")?;
            for row in &rows {
                write_status_row(out, row)?;
            }
        }
        DeployCommand::List => {
            let doc = project.load_registry()?;
            let mut all: BTreeMap<String, Vec<EnvironmentStatus>> = BTreeMap::new();
            for component in doc.active() {
                let rows: Vec<EnvironmentStatus> = deployments
                    .status(&project.scope(component), &[])?
                    .into_iter()
                    .filter(|r| r.commit.is_some())
                    .collect();
                if !rows.is_empty() {
                    all.insert(component.name.clone(), rows);
                }
            }
            if json {
                return emit(out, &all);
            }
            if all.is_empty() {
                writeln!(out, "Nothing deployed.")?;
            }
            for (name, rows) in &all {
                writeln!(out, "{}", name)?;
                for row in rows {
                    write!(out, "  ")?;
                    write_status_row(out, row)?;
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// RESYNC
// ============================================================================

fn resync(project: &Project, args: &ResyncArgs, json: bool, out: &mut dyn Write) -> CliResult<()> {
    let options = ResyncOptions {
        force: args.force,
        dry_run: args.dry_run,
        rebuild_history: args.rebuild_history,
        fix_headers: args.fix_headers,
    };
    let report = project.reconciler().run(options)?;
    if json {
        emit(out, &report)?;
    } else {
        for diagnostic in &report.diagnostics {
            writeln!(out, "warning: {}", diagnostic)?;
        }
        for fix in &report.fixes {
            writeln!(out, "  {}", fix)?;
        }
        for failure in &report.failures {
            writeln!(out, "  failed {}: {}", failure.path, failure.error)?;
        }
        if report.is_clean() {
            writeln!(out, "Registry in sync ({} files checked).", report.scanned)?;
        } else if report.dry_run {
            writeln!(
                out,
                "{} fixes proposed, nothing written (dry run).",
                report.fixes.len()
            )?;
        } else {
            writeln!(out, "{} fixes applied.", report.fixes.len())?;
        }
    }
    match report.partial_failure() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
