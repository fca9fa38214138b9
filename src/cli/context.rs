//! Wiring of the config directory, settings and engine for a CLI run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tracing::debug;

use crate::settings::{JsonFileStore, Preferences, SETTINGS_FILE_NAME};
use crate::sound::create_backend;
use crate::timer::{
    Collaborators, CountdownEngine, SystemClock, TaskId, TimerEvent, TokioScheduler,
};
use crate::types::CountdownConfig;

/// Name of the optional engine config file.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Resolved paths, configuration and settings for one invocation.
#[derive(Debug)]
pub struct AppContext {
    pub config_dir: PathBuf,
    pub config: CountdownConfig,
    pub store: Arc<JsonFileStore>,
}

/// Channels feeding an interactive session.
pub struct EngineParts {
    pub engine: CountdownEngine,
    pub wakeups: mpsc::UnboundedReceiver<TaskId>,
    pub events: mpsc::UnboundedReceiver<TimerEvent>,
}

impl AppContext {
    /// Loads config and settings from `config_dir`, or the platform default.
    ///
    /// # Errors
    ///
    /// Returns an error if no config directory can be determined, or if
    /// `config.json` exists but is unreadable or invalid.
    pub fn load(config_dir: Option<PathBuf>) -> Result<Self> {
        let config_dir = match config_dir {
            Some(dir) => dir,
            None => default_config_dir()?,
        };
        let config = load_config(&config_dir)?;
        let store = Arc::new(JsonFileStore::open(config_dir.join(SETTINGS_FILE_NAME)));

        debug!("Using config directory {}", config_dir.display());
        Ok(Self {
            config_dir,
            config,
            store,
        })
    }

    pub fn preferences(&self) -> Preferences {
        Preferences::new(self.store.clone())
    }

    /// Where bundled sound files are looked up.
    pub fn asset_dir(&self) -> PathBuf {
        self.config
            .asset_dir
            .clone()
            .unwrap_or_else(|| self.sounds_dir())
    }

    /// Where an uploaded custom sound is installed.
    pub fn sounds_dir(&self) -> PathBuf {
        self.config_dir.join("sounds")
    }

    /// Builds an engine on the real clock, tokio timers and audio output.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build_engine(&self) -> EngineParts {
        let (scheduler, wakeups) = TokioScheduler::new();
        let (event_tx, events) = mpsc::unbounded_channel();
        let collab = Collaborators {
            clock: Arc::new(SystemClock::new()),
            scheduler: Arc::new(scheduler),
            backend: create_backend(&self.asset_dir()),
            settings: self.store.clone(),
        };
        EngineParts {
            engine: CountdownEngine::new(collab, &self.config, event_tx),
            wakeups,
            events,
        }
    }
}

/// `<platform config dir>/countdown`.
fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("countdown"))
        .ok_or_else(|| anyhow!("Could not determine the config directory; use --config-dir"))
}

fn load_config(config_dir: &Path) -> Result<CountdownConfig> {
    let path = config_dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(CountdownConfig::default());
    }

    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: CountdownConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .map_err(|e| anyhow!("Invalid {}: {}", path.display(), e))?;
    Ok(config)
}
