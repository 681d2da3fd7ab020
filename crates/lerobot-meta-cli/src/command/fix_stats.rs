use lerobot_meta::stats::{self, WriteMode};

use crate::util::DatasetArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct FixStatsArg {
    #[clap(flatten)]
    dataset: DatasetArg,
    /// Report the counts that would change without rewriting stats.json
    #[arg(long)]
    dry_run: bool,
}

pub(crate) fn run(arg: &FixStatsArg) -> anyhow::Result<()> {
    let layout = arg.dataset.layout();
    let mode = if arg.dry_run {
        WriteMode::DryRun
    } else {
        WriteMode::Write
    };
    let outcome = stats::fix_stats_counts(&layout, mode)?;

    for expansion in &outcome.expansions {
        println!(
            "  {}.count: {} x {}",
            expansion.feature, expansion.value, expansion.dims
        );
    }
    let path = outcome.path.display();
    if outcome.written {
        println!("Updated counts in {path}");
    } else if outcome.changed() {
        println!("Would update counts in {path}");
    } else {
        println!("No changes needed in {path}");
    }
    Ok(())
}
