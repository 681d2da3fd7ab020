use lerobot_meta::tasks;
use lerobot_table::ParquetTableReader;

use crate::util::DatasetArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct BuildTasksArg {
    #[clap(flatten)]
    dataset: DatasetArg,
}

pub(crate) fn run(arg: &BuildTasksArg) -> anyhow::Result<()> {
    let layout = arg.dataset.layout();
    let count = tasks::build_tasks_jsonl(&layout, &ParquetTableReader)?;
    println!("Wrote {count} tasks to {}", layout.tasks_jsonl().display());
    Ok(())
}
