//! Modality key declarations for SO-100/101 datasets.
//!
//! A data config names the modality streams a training pipeline reads from a
//! dataset. Keys take the form `<modality>.<name>`, e.g. `video.front`, and
//! must be exposed by the dataset's `meta/modality.json`:
//!
//! ```json
//! {
//!   "video": {"front": {"original_key": "observation.images.front"}},
//!   "annotation": {"human.task_description": {"original_key": "task_index"}}
//! }
//! ```

use std::{fmt, fs, io, path::PathBuf, str::FromStr};

use serde::Serialize;
use serde_json::Value;

use crate::DatasetLayout;

const ACTION_HORIZON: [i32; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15];

/// The modality keys and sampling indices a pipeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModalityConfig {
    pub video_keys: &'static [&'static str],
    pub state_keys: &'static [&'static str],
    pub action_keys: &'static [&'static str],
    pub language_keys: &'static [&'static str],
    pub observation_indices: &'static [i32],
    pub action_indices: &'static [i32],
}

/// Single-camera SO-100 arm.
pub const SO100: ModalityConfig = ModalityConfig {
    video_keys: &["video.webcam"],
    state_keys: &["state.single_arm", "state.gripper"],
    action_keys: &["action.single_arm", "action.gripper"],
    language_keys: &["annotation.human.task_description"],
    observation_indices: &[0],
    action_indices: &ACTION_HORIZON,
};

/// SO-100 arm with front and wrist cameras.
pub const SO100_DUALCAM: ModalityConfig = ModalityConfig {
    video_keys: &["video.front", "video.wrist"],
    ..SO100
};

/// SO-100 arm with front and top cameras.
pub const SO100_DUALCAM_TOP_FRONT: ModalityConfig = ModalityConfig {
    video_keys: &["video.front", "video.top"],
    ..SO100_DUALCAM
};

impl ModalityConfig {
    /// All declared modality keys, video first.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        self.video_keys
            .iter()
            .chain(self.state_keys)
            .chain(self.action_keys)
            .chain(self.language_keys)
            .copied()
    }

    /// Declared keys that `modality` (the parsed `meta/modality.json`) does not expose.
    ///
    /// `a.b.c` is looked up as `modality["a"]["b.c"]`.
    #[must_use]
    pub fn missing_keys(&self, modality: &Value) -> Vec<&'static str> {
        self.keys()
            .filter(|key| {
                let exposed = key.split_once('.').is_some_and(|(group, name)| {
                    modality
                        .get(group)
                        .and_then(|streams| streams.get(name))
                        .is_some()
                });
                !exposed
            })
            .collect()
    }
}

/// Registered data config names.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataConfigName {
    So100,
    So100DualCam,
    #[default]
    So100DualCamTopFront,
}

impl DataConfigName {
    pub const ALL: [Self; 3] = [
        DataConfigName::So100,
        DataConfigName::So100DualCam,
        DataConfigName::So100DualCamTopFront,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DataConfigName::So100 => "so100",
            DataConfigName::So100DualCam => "so100_dualcam",
            DataConfigName::So100DualCamTopFront => "so100_dualcam_top_front",
        }
    }

    #[must_use]
    pub fn config(self) -> &'static ModalityConfig {
        match self {
            DataConfigName::So100 => &SO100,
            DataConfigName::So100DualCam => &SO100_DUALCAM,
            DataConfigName::So100DualCamTopFront => &SO100_DUALCAM_TOP_FRONT,
        }
    }
}

impl fmt::Display for DataConfigName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const EXPECTED_NAMES: &str = "so100, so100_dualcam, so100_dualcam_top_front";

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("unknown data config '{name}' (expected one of: {})", EXPECTED_NAMES)]
pub struct UnknownDataConfigError {
    #[error(not(source))]
    pub name: String,
}

impl FromStr for DataConfigName {
    type Err = UnknownDataConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownDataConfigError { name: s.to_owned() })
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ModalityCheckError {
    #[display("modality.json not found at {}", path.display())]
    MissingInput { path: PathBuf },
    #[display("Failed to read {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[display("Failed to parse modality JSON file: {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Lists the keys of `config` that the dataset's `meta/modality.json` lacks.
pub fn check_modality(
    layout: &DatasetLayout,
    config: &ModalityConfig,
) -> Result<Vec<&'static str>, ModalityCheckError> {
    let path = layout.modality_json();
    if !path.exists() {
        return Err(ModalityCheckError::MissingInput { path });
    }
    let bytes = fs::read(&path).map_err(|source| ModalityCheckError::Read {
        path: path.clone(),
        source,
    })?;
    let modality: Value = serde_json::from_slice(&bytes)
        .map_err(|source| ModalityCheckError::Parse { path, source })?;

    let missing = config.missing_keys(&modality);
    tracing::debug!(?missing, "checked modality keys");
    Ok(missing)
}
