use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::calendar::WeekStart;

fn default_activity_days() -> u32 {
    7
}
fn default_trend_weeks() -> u32 {
    4
}
fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_daily_goal() -> u8 {
    4
}
fn default_milestone_step() -> u64 {
    500
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// First column of the month grid: "sunday" or "monday".
    #[serde(default)]
    pub week_start: WeekStart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_activity_days")]
    pub activity_days: u32,
    #[serde(default = "default_trend_weeks")]
    pub trend_weeks: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            activity_days: default_activity_days(),
            trend_weeks: default_trend_weeks(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Largest voice note accepted, in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalsConfig {
    /// Ada prayers to complete each day, 1 to 5.
    #[serde(default = "default_daily_goal")]
    pub daily_goal: u8,
    /// Lifetime milestones fall on multiples of this many prayers.
    #[serde(default = "default_milestone_step")]
    pub milestone_step: u64,
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            daily_goal: default_daily_goal(),
            milestone_step: default_milestone_step(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub goals: GoalsConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "qaza").context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("qaza.db"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Reading {:?}", path))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Parsing config.toml")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
