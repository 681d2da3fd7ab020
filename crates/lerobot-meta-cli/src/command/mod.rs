use clap::{Parser, Subcommand};

use self::{
    build_tasks::BuildTasksArg, check_modality::CheckModalityArg, data_config::DataConfigArg,
    fix_stats::FixStatsArg,
};

mod build_tasks;
mod check_modality;
mod data_config;
mod fix_stats;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Which repair to run
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Create meta/tasks.jsonl from meta/tasks.parquet
    BuildTasks(#[clap(flatten)] BuildTasksArg),
    /// Fix count fields in meta/stats.json for action/state
    FixStats(#[clap(flatten)] FixStatsArg),
    /// Print the modality keys of a data config as JSON
    DataConfig(#[clap(flatten)] DataConfigArg),
    /// Check that meta/modality.json exposes every key of a data config
    CheckModality(#[clap(flatten)] CheckModalityArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    crate::util::init_tracing(args.verbose);
    tracing::debug!(?args, "parsed arguments");
    match args.mode {
        Mode::BuildTasks(arg) => build_tasks::run(&arg)?,
        Mode::FixStats(arg) => fix_stats::run(&arg)?,
        Mode::DataConfig(arg) => data_config::run(&arg)?,
        Mode::CheckModality(arg) => check_modality::run(&arg)?,
    }
    Ok(())
}
