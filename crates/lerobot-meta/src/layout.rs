use std::path::{Path, PathBuf};

/// File locations inside a `LeRobot` dataset root.
///
/// ```text
/// .
/// └── meta
///     ├── modality.json
///     ├── stats.json
///     ├── tasks.jsonl
///     └── tasks.parquet
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub const META_DIR: &str = "meta";

    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join(Self::META_DIR)
    }

    #[must_use]
    pub fn tasks_parquet(&self) -> PathBuf {
        self.meta_dir().join("tasks.parquet")
    }

    #[must_use]
    pub fn tasks_jsonl(&self) -> PathBuf {
        self.meta_dir().join("tasks.jsonl")
    }

    #[must_use]
    pub fn stats_json(&self) -> PathBuf {
        self.meta_dir().join("stats.json")
    }

    #[must_use]
    pub fn modality_json(&self) -> PathBuf {
        self.meta_dir().join("modality.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_paths() {
        let layout = DatasetLayout::new("/data/so100_pick");
        assert_eq!(
            layout.tasks_parquet(),
            Path::new("/data/so100_pick/meta/tasks.parquet")
        );
        assert_eq!(
            layout.tasks_jsonl(),
            Path::new("/data/so100_pick/meta/tasks.jsonl")
        );
        assert_eq!(
            layout.stats_json(),
            Path::new("/data/so100_pick/meta/stats.json")
        );
    }
}
