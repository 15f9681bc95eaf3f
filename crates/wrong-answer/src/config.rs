//! Server configuration and the question file.
//!
//! Both live in `<user config dir>/wrong-answer-server/`: `config.yaml`
//! for settings and `questions.json` for the question pairs. A file that
//! does not exist yet is written out with defaults on first start, so
//! operators have something to edit.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use wrong_answer_lobby::{
    DEFAULT_ANSWER_TIMER, DEFAULT_VOTE_TIMER, LobbyConfig, QuestionBank, QuestionPair,
};

use crate::ConfigError;

/// Directory under the user config dir holding both files.
pub const CONFIG_DIR_NAME: &str = "wrong-answer-server";

/// Name of the config file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the question file inside the config directory.
pub const QUESTIONS_FILE_NAME: &str = "questions.json";

/// Port listened on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8080;

/// Host the listener binds to when only a port is configured.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Listen address unless configured otherwise.
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// `<user config dir>/wrong-answer-server/config.yaml`
/// (`~/.config/wrong-answer-server/config.yaml` on Linux).
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// The question file that sits next to the config file at `config_path`.
pub fn questions_path_for(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map_or_else(|| PathBuf::from(QUESTIONS_FILE_NAME), |dir| dir.join(QUESTIONS_FILE_NAME))
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// A phase length in seconds, as written in the config file.
///
/// Accepts a number (`20`, `1.5`) or a numeric string (`"20"`). Anything
/// else is kept as-is and replaced by the default at resolve time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimerSetting {
    Seconds(f64),
    Text(String),
    Other(Value),
}

impl TimerSetting {
    /// The setting as a positive, finite number of seconds.
    pub fn seconds(&self) -> Option<f64> {
        let secs = match self {
            Self::Seconds(secs) => *secs,
            Self::Text(text) => text.trim().parse().ok()?,
            Self::Other(_) => return None,
        };
        (secs.is_finite() && secs > 0.0).then_some(secs)
    }
}

/// A listen port, as a number (`8080`) or a numeric string (`"8080"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortSetting {
    Number(u64),
    Text(String),
    Other(Value),
}

impl PortSetting {
    /// The setting as a usable port. Port 0 is accepted (any free port).
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Number(n) => u16::try_from(*n).ok(),
            Self::Text(text) => text.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }
}

/// Resolves a configured timer, falling back to `default` (with a warning)
/// when it is missing or unusable.
pub fn resolve_timer(name: &str, setting: Option<&TimerSetting>, default: Duration) -> Duration {
    let Some(setting) = setting else {
        tracing::warn!(timer = name, default_secs = default.as_secs_f64(), "timer not set, using default");
        return default;
    };
    match setting.seconds().and_then(|secs| Duration::try_from_secs_f64(secs).ok()) {
        Some(duration) => duration,
        None => {
            tracing::warn!(
                timer = name,
                value = ?setting,
                default_secs = default.as_secs_f64(),
                "invalid timer value, using default"
            );
            default
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Contents of `config.yaml`. Every field is optional in the file and
/// unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port the WebSocket listener binds to on all interfaces.
    pub port: Option<PortSetting>,

    /// Full listen address. Takes precedence over `port`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    /// Answer-phase length in seconds.
    pub answer_timer: Option<TimerSetting>,

    /// Vote-phase length in seconds.
    pub vote_timer: Option<TimerSetting>,

    /// Path of the question file. Defaults to `questions.json` next to
    /// the config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<PathBuf>,

    /// How often running phases re-check for early completion.
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: Some(PortSetting::Text(DEFAULT_PORT.to_string())),
            bind: None,
            answer_timer: Some(TimerSetting::Text(DEFAULT_ANSWER_TIMER.as_secs().to_string())),
            vote_timer: Some(TimerSetting::Text(DEFAULT_VOTE_TIMER.as_secs().to_string())),
            questions: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl ServerConfig {
    /// Reads the config file at `path`, or writes the defaults there and
    /// returns them if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            let text = serde_yaml::to_string(&config).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
            write_file(path, &text)?;
            tracing::info!(path = %path.display(), "wrote default config");
            return Ok(config);
        }
        let text = read_file(path)?;
        // An empty file has no document at all; treat it like `{}`.
        if text.trim().is_empty() {
            tracing::warn!(path = %path.display(), "config file is empty, using defaults");
            return Ok(Self {
                port: None,
                answer_timer: None,
                vote_timer: None,
                ..Self::default()
            });
        }
        let config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// The address to listen on: `bind` if set, otherwise
    /// `0.0.0.0:<port>`, falling back to port 8080 (with a warning).
    pub fn bind_addr(&self) -> String {
        if let Some(bind) = &self.bind {
            return bind.clone();
        }
        let port = match &self.port {
            Some(setting) => setting.port().unwrap_or_else(|| {
                tracing::warn!(value = ?setting, default = DEFAULT_PORT, "invalid port, using default");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };
        format!("{DEFAULT_HOST}:{port}")
    }

    /// The question file: `questions` if set, otherwise `questions.json`
    /// next to the config file at `config_path`.
    pub fn questions_path(&self, config_path: &Path) -> PathBuf {
        self.questions
            .clone()
            .unwrap_or_else(|| questions_path_for(config_path))
    }

    /// Timer settings resolved for the lobby layer, with fallbacks applied.
    pub fn lobby_config(&self) -> LobbyConfig {
        LobbyConfig {
            answer_timer: resolve_timer("answer_timer", self.answer_timer.as_ref(), DEFAULT_ANSWER_TIMER),
            vote_timer: resolve_timer("vote_timer", self.vote_timer.as_ref(), DEFAULT_VOTE_TIMER),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            ..LobbyConfig::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// The pairs written to a fresh question file.
pub fn default_questions() -> Vec<QuestionPair> {
    vec![
        QuestionPair::new("What's your favorite fruit?", "What's your favorite cheese?"),
        QuestionPair::new("What do you eat for breakfast?", "What do you eat for dinner?"),
    ]
}

/// Reads the question file at `path` (a JSON array of
/// `{"normal", "impostor"}` objects), creating it with
/// [`default_questions`] if it does not exist.
///
/// An empty file is accepted; rounds then refuse to start.
pub fn load_questions(path: &Path) -> Result<QuestionBank, ConfigError> {
    let json_err = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let pairs: Vec<QuestionPair> = if path.exists() {
        serde_json::from_str(&read_file(path)?).map_err(json_err)?
    } else {
        let pairs = default_questions();
        write_file(path, &serde_json::to_string_pretty(&pairs).map_err(json_err)?)?;
        tracing::info!(path = %path.display(), "wrote default questions");
        pairs
    };

    if pairs.is_empty() {
        tracing::warn!(path = %path.display(), "question file is empty, rounds cannot start");
    } else {
        tracing::info!(path = %path.display(), questions = pairs.len(), "loaded questions");
    }
    Ok(QuestionBank::new(pairs))
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `text` to `path`, creating missing parent directories.
fn write_file(path: &Path, text: &str) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_err)?;
    }
    fs::write(path, text).map_err(write_err)
}
