use std::path::PathBuf;

use lerobot_meta::data_config::DataConfigName;

use crate::util::Output;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct DataConfigArg {
    /// Data config to print
    #[arg(long, default_value_t = DataConfigName::default())]
    name: DataConfigName,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &DataConfigArg) -> anyhow::Result<()> {
    Output::save_json(arg.name.config(), arg.output.clone())
}
