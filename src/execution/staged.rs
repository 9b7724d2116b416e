//! Staged execution: derivation scripts then tests, one level at a time.
//!
//! Configuration problems surface as `Err(ConfigError)` before the store is
//! touched. A script that cannot be applied halts the run; the partial result
//! is returned with the error attached in `first_fatal_error`.

use super::config::{ExecutorSettings, FailurePolicy, Level, LevelConfig};
use super::runner::{RunResults, TestRunner};
use super::suite::TestSuite;
use super::{ConfigError, ScriptError};
use crate::store::Store;
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptApplication {
    pub path: PathBuf,
    /// Net change in store size.
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptVerification {
    pub path: PathBuf,
    pub before: usize,
    pub after: usize,
    pub delta: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelOutcome {
    pub level: usize,
    pub name: String,
    pub scripts: Vec<ScriptApplication>,
    pub results: RunResults,
}

#[derive(Debug, Default, Serialize)]
pub struct StagedRunResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub per_level: Vec<LevelOutcome>,
    /// Every script applied during the run, in application order.
    pub scripts_applied: Vec<ScriptApplication>,
    #[serde(serialize_with = "error_message")]
    pub first_fatal_error: Option<ScriptError>,
}

fn error_message<S: Serializer>(error: &Option<ScriptError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

impl StagedRunResult {
    fn absorb(&mut self, outcome: LevelOutcome) {
        self.total += outcome.results.total;
        self.passed += outcome.results.passed;
        self.failed += outcome.results.failed;
        self.scripts_applied.extend(outcome.scripts.iter().cloned());
        self.per_level.push(outcome);
    }

    /// No fatal error and no failed test.
    pub fn is_success(&self) -> bool {
        self.first_fatal_error.is_none() && self.failed == 0
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

pub struct StagedExecutor {
    store: Box<dyn Store>,
    runner: TestRunner,
    config: LevelConfig,
    settings: ExecutorSettings,
}

impl StagedExecutor {
    /// Fails if any level references a test the suite does not define.
    pub fn new(
        store: Box<dyn Store>,
        suite: TestSuite,
        config: LevelConfig,
        settings: ExecutorSettings,
    ) -> Result<Self, ConfigError> {
        config.check_against(&suite)?;
        let runner = TestRunner::new(suite, &settings.base_namespace);
        Ok(Self { store, runner, config, settings })
    }

    pub fn store(&self) -> &dyn Store { self.store.as_ref() }

    pub fn store_mut(&mut self) -> &mut dyn Store { self.store.as_mut() }

    pub fn runner(&self) -> &TestRunner { &self.runner }

    pub fn config(&self) -> &LevelConfig { &self.config }

    pub fn settings(&self) -> &ExecutorSettings { &self.settings }

    /// Reads one update script and applies it. A zero delta is only a warning.
    pub fn apply_script(&mut self, path: &Path) -> Result<ScriptApplication, ScriptError> {
        let resolved = self.settings.resolve(path);
        if !resolved.is_file() {
            return Err(ScriptError::Missing(resolved));
        }
        let text = std::fs::read_to_string(&resolved)
            .map_err(|source| ScriptError::Unreadable { path: resolved.clone(), source })?;
        let delta = self
            .store
            .update(&text)
            .map_err(|source| ScriptError::Rejected { path: resolved.clone(), source })?;

        let script = resolved.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if delta == 0 {
            warn!(%script, "script applied but added 0 triples (no matches, or already materialized)");
        } else {
            info!(%script, added = delta, "script applied");
        }
        Ok(ScriptApplication { path: resolved, delta })
    }

    /// Applies one script and reports the store size around it.
    pub fn verify_script(&mut self, path: &Path) -> Result<ScriptVerification, ScriptError> {
        let size = |store: &dyn Store| {
            store.size().map_err(|source| ScriptError::Rejected { path: path.to_path_buf(), source })
        };
        let before = size(self.store.as_ref())?;
        let applied = self.apply_script(path)?;
        let after = size(self.store.as_ref())?;
        info!(before, after, "verified {}", applied.path.display());
        Ok(ScriptVerification { path: applied.path, before, after, delta: after as i64 - before as i64 })
    }

    /// Runs one level. `scripts` overrides the configured list when given.
    pub fn run_level(&mut self, index: usize, scripts: Option<&[PathBuf]>) -> Result<StagedRunResult, ConfigError> {
        let level = self.config.level(index)?.clone();
        let scripts = scripts.map_or_else(|| level.scripts.clone(), <[PathBuf]>::to_vec);

        let mut result = StagedRunResult::default();
        match self.stage(&level, &scripts) {
            Ok(outcome) => result.absorb(outcome),
            Err(e) => {
                error!(level = index, error = %e, "stopping test execution");
                result.first_fatal_error = Some(e);
            }
        }
        Ok(result)
    }

    /// Runs the given levels in the given order. Every index is checked
    /// before the first script is applied.
    pub fn run_levels(&mut self, indices: &[usize]) -> Result<StagedRunResult, ConfigError> {
        let levels = indices
            .iter()
            .map(|&i| self.config.level(i).cloned())
            .collect::<Result<Vec<Level>, _>>()?;

        let mut result = StagedRunResult::default();
        for level in &levels {
            match self.stage(level, &level.scripts) {
                Ok(outcome) => {
                    let level_failed = outcome.results.failed > 0;
                    result.absorb(outcome);
                    if level_failed && self.settings.failure_policy == FailurePolicy::StopAfterFailedLevel {
                        warn!(level = level.index, "level has failures; not proceeding to the next level");
                        break;
                    }
                }
                Err(e) => {
                    error!(level = level.index, error = %e, "stopping test execution");
                    result.first_fatal_error = Some(e);
                    break;
                }
            }
        }

        info!(total = result.total, passed = result.passed, failed = result.failed, "staged run finished");
        Ok(result)
    }

    /// Every configured level, ascending.
    pub fn run_all_levels(&mut self) -> Result<StagedRunResult, ConfigError> {
        let indices = self.config.indices();
        self.run_levels(&indices)
    }

    /// "All levels" mode: apply the merged script list once, run every
    /// configured test once, then break the results down per level.
    pub fn run_merged(&mut self) -> Result<StagedRunResult, ConfigError> {
        let scripts = self.config.merged_scripts();
        let tests = self.config.merged_tests();
        info!(scripts = scripts.len(), tests = tests.len(), "running all levels together");

        let mut result = StagedRunResult::default();
        for script in &scripts {
            match self.apply_script(script) {
                Ok(applied) => result.scripts_applied.push(applied),
                Err(e) => {
                    error!(error = %e, "stopping test execution");
                    result.first_fatal_error = Some(e);
                    return Ok(result);
                }
            }
        }

        let all = self.runner.run_selected(self.store.as_ref(), tests.iter());
        for level in self.config.levels() {
            let results = all.subset(level.tests.iter());
            info!(
                level = level.index,
                name = %level.name,
                passed = results.passed,
                total = results.total,
                "level breakdown"
            );
            result.per_level.push(LevelOutcome {
                level: level.index,
                name: level.name.clone(),
                scripts: Vec::new(),
                results,
            });
        }
        result.total = all.total;
        result.passed = all.passed;
        result.failed = all.failed;
        Ok(result)
    }

    fn stage(&mut self, level: &Level, scripts: &[PathBuf]) -> Result<LevelOutcome, ScriptError> {
        info!(
            level = level.index,
            name = %level.name,
            tests = level.tests.len(),
            scripts = scripts.len(),
            "running level"
        );

        let mut applied = Vec::with_capacity(scripts.len());
        for script in scripts {
            applied.push(self.apply_script(script)?);
        }

        let results = self.runner.run_selected(self.store.as_ref(), level.tests.iter());
        info!(level = level.index, passed = results.passed, failed = results.failed, "level complete");
        Ok(LevelOutcome { level: level.index, name: level.name.clone(), scripts: applied, results })
    }
}
