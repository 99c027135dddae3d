//! Command dispatch

use std::io;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::DeleteMode;
use crate::cli::args::{Cli, Commands, ConfigCommands, EntryCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::Settings;
use crate::domain::{CategoryId, EntryRef, TenantId};
use crate::infrastructure::di::ServiceContainer;

/// Run the parsed command line.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see --help".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        Commands::Config { command } => return cmd_config(cli, command),
        _ => {}
    }

    let settings = load_settings(cli)?;
    let container = ServiceContainer::open(settings)?;
    let tenant = TenantId(cli.tenant);

    let mutated = match command {
        Commands::Create { name, parent } => {
            cmd_create(&container, tenant, name, parent.map(CategoryId))?
        }
        Commands::Mkpath { path } => cmd_mkpath(&container, tenant, path)?,
        Commands::Rename { id, name } => cmd_rename(&container, tenant, CategoryId(*id), name)?,
        Commands::Move { id, parent } => {
            let parent = (*parent != 0).then_some(CategoryId(*parent));
            cmd_move(&container, tenant, CategoryId(*id), parent)?
        }
        Commands::Delete { id, hard } => {
            let mode = if *hard { DeleteMode::Hard } else { DeleteMode::Soft };
            cmd_delete(&container, tenant, CategoryId(*id), mode)?
        }
        Commands::Show { id } => cmd_show(&container, tenant, CategoryId(*id))?,
        Commands::Tree { verify } => cmd_tree(&container, tenant, *verify)?,
        Commands::Recount { id } => cmd_recount(&container, tenant, CategoryId(*id))?,
        Commands::Entry { command } => cmd_entry(&container, tenant, command)?,
        Commands::Config { .. } | Commands::Completion { .. } => false,
    };

    if mutated {
        container.save()?;
        debug!("snapshot saved to {}", container.settings.data_file.display());
    }
    Ok(())
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(data_file) = &cli.data_file {
        settings.data_file = data_file.clone();
    }
    Ok(settings)
}

#[instrument(skip(cli))]
fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

#[instrument(skip(c))]
fn cmd_create(
    c: &ServiceContainer,
    tenant: TenantId,
    name: &str,
    parent: Option<CategoryId>,
) -> CliResult<bool> {
    let category = c.tree.create(tenant, name, parent)?;
    output::action("Created", &category);
    Ok(true)
}

#[instrument(skip(c))]
fn cmd_mkpath(c: &ServiceContainer, tenant: TenantId, path: &str) -> CliResult<bool> {
    let category = c.tree.create_by_path(tenant, path)?;
    output::action("Path", &category);
    Ok(true)
}

#[instrument(skip(c))]
fn cmd_rename(
    c: &ServiceContainer,
    tenant: TenantId,
    id: CategoryId,
    name: &str,
) -> CliResult<bool> {
    let category = c.tree.rename(tenant, id, name)?;
    output::action("Renamed", &category);
    Ok(true)
}

#[instrument(skip(c))]
fn cmd_move(
    c: &ServiceContainer,
    tenant: TenantId,
    id: CategoryId,
    parent: Option<CategoryId>,
) -> CliResult<bool> {
    let category = c.tree.reparent(tenant, id, parent)?;
    output::action("Moved", &category);
    Ok(true)
}

#[instrument(skip(c))]
fn cmd_delete(
    c: &ServiceContainer,
    tenant: TenantId,
    id: CategoryId,
    mode: DeleteMode,
) -> CliResult<bool> {
    c.tree.delete(tenant, id, mode)?;
    output::success(&format!("deleted category {id} ({mode:?})"));
    Ok(true)
}

fn cmd_show(c: &ServiceContainer, tenant: TenantId, id: CategoryId) -> CliResult<bool> {
    let category = c.tree.get(tenant, id)?;
    output::category(&category);
    Ok(false)
}

fn cmd_tree(c: &ServiceContainer, tenant: TenantId, verify: bool) -> CliResult<bool> {
    let forest = c.tree.forest(tenant)?;
    output::info(&forest.to_tree(&format!("tenant {tenant}")));
    if verify {
        let violations = forest.verify(c.tree.rules());
        if violations.is_empty() {
            output::success(&format!("{} categories consistent", forest.len()));
        } else {
            output::header(&format!("{} violations", violations.len()));
            for violation in &violations {
                output::failure(violation);
            }
        }
    }
    Ok(false)
}

#[instrument(skip(c))]
fn cmd_recount(c: &ServiceContainer, tenant: TenantId, id: CategoryId) -> CliResult<bool> {
    let count = c.tree.recount_entries(tenant, id)?;
    output::action("Entries", &format!("{count} in subtree of {id}"));
    Ok(true)
}

fn cmd_entry(c: &ServiceContainer, tenant: TenantId, command: &EntryCommands) -> CliResult<bool> {
    match command {
        EntryCommands::Assign {
            entry,
            names,
            create_missing,
        } => {
            let entry = EntryRef::new(entry.as_str());
            let ids = c
                .entry_categories
                .assign_categories(tenant, &entry, names, *create_missing)?;
            output::action("Assigned", &format!("{entry} to {} categories", ids.len()));
            Ok(true)
        }
        EntryCommands::Show { entry } => {
            let entry = EntryRef::new(entry.as_str());
            for category in c.entry_categories.categories_of(tenant, &entry)? {
                output::info(&category);
            }
            Ok(false)
        }
    }
}
