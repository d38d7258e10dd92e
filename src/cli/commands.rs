//! Command dispatch: settings, services, and output for each subcommand

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::Safeguards;
use crate::application::{IoResultExt, UpdateOptions};
use crate::cli::args::{Cli, Commands, ConfigCommands, PlanOptions, UpdateInput};
use crate::cli::error::CliResult;
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{AssemblyMap, DomainError, UpdateRequest};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Run the parsed command.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let cwd = std::env::current_dir().map_err(|e| InfraError::io("read current directory", e))?;
    let project_dir = cli.project_dir.clone().unwrap_or_else(|| cwd.clone());

    match &cli.command {
        Commands::Node {
            input,
            genome,
            options,
        } => {
            let request = UpdateRequest::Node {
                genome: genome.clone(),
            };
            run_update(&project_dir, &cwd, input, options, &request)
        }
        Commands::Branch {
            input,
            parent_genome,
            child_genome,
            ancestor_name,
            top_branch_length,
            force_bottom_branch_length,
            options,
        } => {
            let request = UpdateRequest::branch(
                parent_genome,
                child_genome,
                ancestor_name.clone(),
                *top_branch_length,
                *force_bottom_branch_length,
            );
            run_update(&project_dir, &cwd, input, options, &request)
        }
        Commands::Tree { in_hal } => show_tree(&project_dir, in_hal),
        Commands::Config { command } => match command {
            ConfigCommands::Show => config_show(&project_dir),
            ConfigCommands::Path => config_path(&project_dir),
        },
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::External(args) => {
            let action = args.first().cloned().unwrap_or_default();
            Err(DomainError::UnknownAction(action).into())
        }
    }
}

/// Flags win over configured settings.
pub fn apply_plan_options(mut settings: Settings, options: &PlanOptions) -> Settings {
    if let Some(v) = &options.hal_options {
        settings.hal_options = v.clone();
    }
    if let Some(v) = &options.out_dir {
        settings.out_dir = v.clone();
    }
    if let Some(v) = &options.job_store {
        settings.jobstore_dir = v.clone();
    }
    if let Some(v) = &options.prepare_options {
        settings.prepare_options = v.clone();
    }
    settings.fasta_check |= options.with_fasta_check;
    settings.skip_backup |= options.skip_backup;
    settings.skip_validate |= options.skip_validate;
    settings
}

#[instrument(level = "debug", skip(input, options))]
fn run_update(
    project_dir: &Path,
    cwd: &Path,
    input: &UpdateInput,
    options: &PlanOptions,
    request: &UpdateRequest,
) -> CliResult<()> {
    let settings = apply_plan_options(Settings::load(Some(project_dir))?, options);
    debug!("run_update: settings={:?}", settings);
    let container = ServiceContainer::new(settings);

    let content = container
        .fs
        .read_to_string(&input.new_genomes)
        .with_path_context("read genome list", &input.new_genomes)?;
    let assemblies = AssemblyMap::parse(&content, cwd)?;

    let opts = UpdateOptions::new(&input.in_hal, assemblies, &container.settings, cwd);
    let safeguards = Safeguards {
        backup: !container.settings.skip_backup,
        validate: !container.settings.skip_validate,
    };
    if let Some(backup) = container.workspace.prepare(&opts, safeguards)? {
        output::status("Backup", &backup.display());
    }

    let plan = container.update.plan(request, &opts)?;
    output::raw(&plan);
    Ok(())
}

fn show_tree(project_dir: &Path, in_hal: &Path) -> CliResult<()> {
    let container = ServiceContainer::new(Settings::load(Some(project_dir))?);
    container.workspace.check_container(in_hal)?;
    let tree = container.toolchain.extract_tree(in_hal)?;
    output::info(&tree.to_display_tree());
    Ok(())
}

fn config_show(project_dir: &Path) -> CliResult<()> {
    let settings = Settings::load(Some(project_dir))?;
    output::info(&settings.to_toml()?);
    Ok(())
}

fn config_path(project_dir: &Path) -> CliResult<()> {
    match global_config_path() {
        Some(path) => output::detail_path("global", &path),
        None => output::warning("no global config directory on this platform"),
    }
    output::detail_path("local", &local_config_path(project_dir));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn given_flags_when_applying_then_override_settings() {
        let options = PlanOptions {
            out_dir: Some(PathBuf::from("/tmp/out")),
            prepare_options: Some("--maxCores 2".into()),
            skip_backup: true,
            ..Default::default()
        };

        let settings = apply_plan_options(Settings::default(), &options);

        assert_eq!(settings.out_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.prepare_options, "--maxCores 2");
        assert!(settings.skip_backup);
        assert!(!settings.skip_validate);
        assert_eq!(settings.hal_options, "--hdf5InMemory");
    }
}
