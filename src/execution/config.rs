//! Level configuration and executor settings.
use super::suite::{TestId, TestSuite};
use super::ConfigError;
use crate::graph::extract::DEFAULT_NAMESPACE;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Reserved key in `materialization_requirements` for the merged script list.
pub const ALL_LEVELS_KEY: &str = "all";

/// One entry of `test_levels`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LevelSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default)]
    pub data_files: Vec<PathBuf>,
}

#[derive(Deserialize)]
struct LevelFile {
    test_levels: BTreeMap<String, LevelSpec>,
    #[serde(default)]
    materialization_requirements: BTreeMap<String, Vec<PathBuf>>,
}

/// Which levels a store or script list is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSelector {
    Level(usize),
    All,
}

/// A configured level with its tests parsed and in dot-numeric order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub index: usize,
    pub name: String,
    pub tests: Vec<TestId>,
    pub data_files: Vec<PathBuf>,
    pub scripts: Vec<PathBuf>,
}

/// Read-only for the duration of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelConfig {
    levels: BTreeMap<usize, Level>,
    explicit_all: Option<Vec<PathBuf>>,
}

fn level_key(key: &str) -> Result<usize, ConfigError> {
    key.parse().map_err(|_| ConfigError::InvalidLevelKey(key.to_string()))
}

impl LevelConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let file: LevelFile = serde_json::from_str(text)
            .map_err(|source| ConfigError::Parse { origin: "level configuration".into(), source })?;

        let mut levels = BTreeMap::new();
        for (key, spec) in file.test_levels {
            let index = level_key(&key)?;
            let mut tests = spec.tests.iter().map(|id| TestId::parse(id)).collect::<Result<Vec<_>, _>>()?;
            tests.sort();
            tests.dedup();
            levels.insert(index, Level { index, name: spec.name, tests, data_files: spec.data_files, scripts: Vec::new() });
        }

        let mut explicit_all = None;
        for (key, scripts) in file.materialization_requirements {
            if key == ALL_LEVELS_KEY {
                explicit_all = Some(scripts);
                continue;
            }
            let index = level_key(&key)?;
            // Scripts may be required for a level that declares no tests.
            levels
                .entry(index)
                .or_insert_with(|| Level {
                    index,
                    name: String::new(),
                    tests: Vec::new(),
                    data_files: Vec::new(),
                    scripts: Vec::new(),
                })
                .scripts = scripts;
        }

        Ok(Self { levels, explicit_all })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&text).map_err(|e| e.with_origin(path))
    }

    pub fn level(&self, index: usize) -> Result<&Level, ConfigError> {
        self.levels.get(&index).ok_or_else(|| ConfigError::UnknownLevel {
            level: index,
            available: self.levels.keys().copied().collect(),
        })
    }

    /// Levels in ascending order.
    pub fn levels(&self) -> impl Iterator<Item = &Level> { self.levels.values() }

    pub fn indices(&self) -> Vec<usize> { self.levels.keys().copied().collect() }

    /// Every referenced test id must exist in `suite`.
    pub fn check_against(&self, suite: &TestSuite) -> Result<(), ConfigError> {
        suite.check_ids(self.levels().flat_map(|level| level.tests.iter()))
    }

    /// The "all levels" script order: the explicit `all` list when configured,
    /// otherwise the union over levels in ascending order, first occurrence kept.
    pub fn merged_scripts(&self) -> Vec<PathBuf> {
        if let Some(all) = &self.explicit_all {
            return all.clone();
        }
        let mut seen = HashSet::new();
        self.levels()
            .flat_map(|level| level.scripts.iter())
            .filter(|script| seen.insert(*script))
            .cloned()
            .collect()
    }

    /// Bare file names of the per-level scripts, deduplicated by name, for a
    /// materialize-all manifest.
    pub fn merged_script_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.levels()
            .flat_map(|level| level.scripts.iter())
            .filter_map(|script| script.file_name().map(|name| name.to_string_lossy().into_owned()))
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// The data files a store should be initialized with.
    pub fn data_files(&self, selector: LevelSelector) -> Result<Vec<PathBuf>, ConfigError> {
        match selector {
            LevelSelector::Level(index) => Ok(self.level(index)?.data_files.clone()),
            LevelSelector::All => {
                let mut seen = HashSet::new();
                Ok(self
                    .levels()
                    .flat_map(|level| level.data_files.iter())
                    .filter(|file| seen.insert(*file))
                    .cloned()
                    .collect())
            }
        }
    }

    /// Every test referenced by any level, each once, in level order.
    pub fn merged_tests(&self) -> Vec<TestId> {
        let mut seen = HashSet::new();
        self.levels()
            .flat_map(|level| level.tests.iter())
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }
}

/// What a staged run does after a level whose tests failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep going; only script errors halt a run.
    #[default]
    Continue,
    /// Stop once a level finishes with any failed test.
    StopAfterFailedLevel,
}

fn default_project_root() -> PathBuf { PathBuf::from(".") }

fn default_namespace() -> String { DEFAULT_NAMESPACE.to_string() }

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Relative script and data paths resolve against this directory.
    pub project_root: PathBuf,
    pub base_namespace: String,
    pub failure_policy: FailurePolicy,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            base_namespace: default_namespace(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl ExecutorSettings {
    pub fn with_project_root(root: impl Into<PathBuf>) -> Self {
        Self { project_root: root.into(), ..Self::default() }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.project_root.join(path) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "test_levels": {
            "0": {"name": "Base", "tests": ["0.10", "0.2"], "data_files": ["data/family.ttl"]},
            "1": {"name": "Chains", "tests": ["1.1"], "data_files": ["data/family.ttl", "data/extra.ttl"]},
            "2": {"name": "Deep", "tests": ["2.1", "0.2"]}
        },
        "materialization_requirements": {
            "1": ["sparql/a/grandparent.sparql", "sparql/sibling.sparql"],
            "2": ["sparql/sibling.sparql", "sparql/b/grandparent.sparql", "sparql/uncle.sparql"]
        }
    }"#;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| p.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_levels_are_parsed_in_order() {
        let config = LevelConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.indices(), vec![0, 1, 2]);

        let base = config.level(0).unwrap();
        assert_eq!(base.name, "Base");
        let tests: Vec<&str> = base.tests.iter().map(TestId::as_str).collect();
        assert_eq!(tests, vec!["0.2", "0.10"]);
        assert!(base.scripts.is_empty());

        assert!(matches!(config.level(7), Err(ConfigError::UnknownLevel { level: 7, .. })));
    }

    #[test]
    fn test_merged_scripts_union_keeps_first_occurrence() {
        let config = LevelConfig::from_json(CONFIG).unwrap();
        assert_eq!(
            names(&config.merged_scripts()),
            vec![
                "sparql/a/grandparent.sparql",
                "sparql/sibling.sparql",
                "sparql/b/grandparent.sparql",
                "sparql/uncle.sparql",
            ]
        );
        assert_eq!(
            config.merged_script_names(),
            vec!["grandparent.sparql", "sibling.sparql", "uncle.sparql"]
        );
    }

    #[test]
    fn test_explicit_all_list_wins() {
        let config = LevelConfig::from_json(
            r#"{"test_levels": {"0": {"tests": []}},
                "materialization_requirements": {"0": ["x.sparql"], "all": ["y.sparql", "x.sparql"]}}"#,
        )
        .unwrap();
        assert_eq!(names(&config.merged_scripts()), vec!["y.sparql", "x.sparql"]);
    }

    #[test]
    fn test_data_files_and_merged_tests() {
        let config = LevelConfig::from_json(CONFIG).unwrap();
        assert_eq!(names(&config.data_files(LevelSelector::Level(1)).unwrap()), vec!["data/family.ttl", "data/extra.ttl"]);
        assert_eq!(names(&config.data_files(LevelSelector::All).unwrap()), vec!["data/family.ttl", "data/extra.ttl"]);

        let merged: Vec<String> = config.merged_tests().iter().map(TestId::to_string).collect();
        assert_eq!(merged, vec!["0.2", "0.10", "1.1", "2.1"]);
    }

    #[test]
    fn test_bad_level_key() {
        let err = LevelConfig::from_json(r#"{"test_levels": {"zero": {"tests": []}}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLevelKey(key) if key == "zero"));
    }

    #[test]
    fn test_settings_defaults_and_resolution() {
        let settings: ExecutorSettings = serde_json::from_str(r#"{"failure_policy": "stop_after_failed_level"}"#).unwrap();
        assert_eq!(settings.base_namespace, DEFAULT_NAMESPACE);
        assert_eq!(settings.failure_policy, FailurePolicy::StopAfterFailedLevel);

        let settings = ExecutorSettings::with_project_root("/project");
        assert_eq!(settings.resolve(Path::new("sparql/a.sparql")), PathBuf::from("/project/sparql/a.sparql"));
        assert_eq!(settings.resolve(Path::new("/abs/b.sparql")), PathBuf::from("/abs/b.sparql"));
    }
}
