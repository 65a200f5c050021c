use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::detection::ClassifierConfig;
use crate::enforcement::EnforcementPolicy;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverMode {
    /// Fixed-period loop over the latest snapshot.
    Timer,
    /// One tick per UI-change notification from the host.
    Event,
}

impl Default for DriverMode {
    fn default() -> Self {
        DriverMode::Timer
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application whose short-form section is limited.
    pub target_app_id: String,
    pub allowed_budget_ms: u64,
    pub cooldown_duration_ms: u64,
    pub grace_window_ms: u64,
    pub tick_period_ms: u64,
    pub progress_notice_interval_ms: u64,
    pub cooldown_notice_interval_ms: u64,
    pub exhaustion_back_count: u32,
    pub cooldown_back_count: u32,
    pub driver: DriverMode,
    pub classifier: ClassifierConfig,
}

impl Default for Settings {
    fn default() -> Self {
        let policy = EnforcementPolicy::default();
        Self {
            target_app_id: "com.google.android.youtube".into(),
            allowed_budget_ms: policy.allowed_budget_ms,
            cooldown_duration_ms: policy.cooldown_duration_ms,
            grace_window_ms: policy.grace_window_ms,
            tick_period_ms: policy.tick_period_ms,
            progress_notice_interval_ms: policy.progress_notice_interval_ms,
            cooldown_notice_interval_ms: policy.cooldown_notice_interval_ms,
            exhaustion_back_count: policy.exhaustion_back_count,
            cooldown_back_count: policy.cooldown_back_count,
            driver: DriverMode::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Settings {
    pub fn policy(&self) -> EnforcementPolicy {
        EnforcementPolicy {
            allowed_budget_ms: self.allowed_budget_ms,
            cooldown_duration_ms: self.cooldown_duration_ms,
            grace_window_ms: self.grace_window_ms,
            tick_period_ms: self.tick_period_ms,
            progress_notice_interval_ms: self.progress_notice_interval_ms,
            cooldown_notice_interval_ms: self.cooldown_notice_interval_ms,
            exhaustion_back_count: self.exhaustion_back_count,
            cooldown_back_count: self.cooldown_back_count,
        }
    }
}

/// Settings file loaded once at start. Unlike most runtime state, a bad file
/// is fatal: the driver must not run on a half-understood configuration.
pub struct SettingsStore {
    path: PathBuf,
    data: Settings,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?
        } else {
            let defaults = Settings::default();
            persist(&path, &defaults)?;
            defaults
        };

        validation::validate(&data)
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self { path, data })
    }

    pub fn settings(&self) -> &Settings {
        &self.data
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

fn persist(path: &PathBuf, data: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create settings directory {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(data)?;
    fs::write(path, serialized)
        .with_context(|| format!("Failed to write settings to {}", path.display()))
}

/// Start-up checks on operator-provided settings.
pub mod validation {
    use super::Settings;
    use crate::detection::Signal;
    use anyhow::{bail, Result};
    use std::collections::HashSet;

    const MAX_DURATION_MS: u64 = 30 * 24 * 60 * 60 * 1_000;

    fn validate_duration(name: &str, value: u64) -> Result<()> {
        if value == 0 {
            bail!("{name} must be greater than zero");
        }
        if value > MAX_DURATION_MS {
            bail!("{name} must not exceed 30 days (got {value}ms)");
        }
        Ok(())
    }

    pub fn validate(settings: &Settings) -> Result<()> {
        if settings.target_app_id.trim().is_empty() {
            bail!("target_app_id is required");
        }

        validate_duration("allowed_budget_ms", settings.allowed_budget_ms)?;
        validate_duration("cooldown_duration_ms", settings.cooldown_duration_ms)?;
        validate_duration("grace_window_ms", settings.grace_window_ms)?;
        validate_duration("tick_period_ms", settings.tick_period_ms)?;

        if settings.exhaustion_back_count == 0 {
            bail!("exhaustion_back_count must be at least 1");
        }

        let classifier = &settings.classifier;
        let fraction = classifier.right_edge_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            bail!("classifier.right_edge_fraction must be between 0 and 1 (got {fraction})");
        }
        if classifier.max_nodes == 0 {
            bail!("classifier.max_nodes must be at least 1");
        }
        if classifier.strategies.is_empty() {
            bail!("classifier.strategies must name at least one signal");
        }

        let mut seen = HashSet::new();
        for signal in &classifier.strategies {
            if !seen.insert(*signal) {
                bail!("classifier.strategies lists {} twice", signal.as_str());
            }

            let (field, values) = match signal {
                Signal::Identifier => ("identifier_markers", &classifier.identifier_markers),
                Signal::Geometry => ("action_keywords", &classifier.action_keywords),
                Signal::Layout => {
                    if classifier.navigation_landmarks.iter().all(|v| v.trim().is_empty()) {
                        bail!("classifier.navigation_landmarks is empty but the layout signal is enabled");
                    }
                    ("category_keywords", &classifier.category_keywords)
                }
            };
            if values.iter().all(|v| v.trim().is_empty()) {
                bail!(
                    "classifier.{field} is empty but the {} signal is enabled",
                    signal.as_str()
                );
            }
        }

        Ok(())
    }
}
