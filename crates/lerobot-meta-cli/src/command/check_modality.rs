use anyhow::bail;
use lerobot_meta::data_config::{self, DataConfigName};

use crate::util::DatasetArg;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CheckModalityArg {
    #[clap(flatten)]
    dataset: DatasetArg,
    /// Data config whose keys must be exposed
    #[arg(long, default_value_t = DataConfigName::default())]
    name: DataConfigName,
}

pub(crate) fn run(arg: &CheckModalityArg) -> anyhow::Result<()> {
    let layout = arg.dataset.layout();
    let missing = data_config::check_modality(&layout, arg.name.config())?;
    let path = layout.modality_json();
    if !missing.is_empty() {
        bail!(
            "{} does not expose keys required by {}: {}",
            path.display(),
            arg.name,
            missing.join(", ")
        );
    }
    println!("{} exposes every key of {}", path.display(), arg.name);
    Ok(())
}
