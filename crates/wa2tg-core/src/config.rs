use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::DateRange,
    errors::{Error, ValidationError},
    Result,
};

pub const DEFAULT_CONFIG_NAME: &str = "config";
pub const DEFAULT_SESSION_FILE: &str = "whatsapp_session.gob";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Where the configuration file lives.
///
/// Passed explicitly to every load/save call instead of living in process-wide state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigLocation {
    pub dir: PathBuf,
    /// Base name without extension.
    pub name: String,
}

impl ConfigLocation {
    /// Resolve `name` against the current working directory.
    pub fn new(name: impl Into<String>) -> Self {
        Self::in_dir(".", name)
    }

    pub fn in_dir(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.yaml", self.name))
    }
}

impl Default for ConfigLocation {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_NAME)
    }
}

/// Typed configuration, one section per platform plus export filters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub whatsapp: WhatsAppConfig,
    pub telegram: TelegramConfig,
    pub export: ExportConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    pub session_file: PathBuf,
    pub login_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub endpoint: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            login_timeout_secs: 120,
            connect_timeout_secs: 5,
            endpoint: "https://web.whatsapp.com".to_string(),
        }
    }
}

impl WhatsAppConfig {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Kept as a string so YAML numbers and quoted ids both load; parsed by the destination.
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub chat_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub include_media: bool,
    /// `YYYY-MM-DD`, empty for an unbounded start.
    pub date_from: String,
    /// `YYYY-MM-DD`, empty for "now".
    pub date_to: String,
    pub message_interval_ms: u64,
    pub chat_interval_ms: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            include_media: true,
            date_from: String::new(),
            date_to: String::new(),
            message_interval_ms: 100,
            chat_interval_ms: 1000,
        }
    }
}

impl ExportConfig {
    pub fn message_interval(&self) -> Duration {
        Duration::from_millis(self.message_interval_ms)
    }

    pub fn chat_interval(&self) -> Duration {
        Duration::from_millis(self.chat_interval_ms)
    }

    /// Resolve the configured window. Dates are validated here, not at load time.
    pub fn parse_date_range(&self) -> Result<DateRange> {
        self.parse_date_range_at(Utc::now())
    }

    pub fn parse_date_range_at(&self, now: DateTime<Utc>) -> Result<DateRange> {
        let from = match non_empty(&self.date_from) {
            Some(raw) => parse_day("date_from", raw)?,
            None => DateTime::<Utc>::UNIX_EPOCH,
        };
        let to = match non_empty(&self.date_to) {
            Some(raw) => parse_day("date_to", raw)?,
            None => now,
        };
        Ok(DateRange { from, to })
    }
}

impl Config {
    /// Load `<dir>/<name>.yaml`, then apply environment overrides.
    ///
    /// A missing file is not an error: defaults are returned so a first run works.
    pub fn load(loc: &ConfigLocation) -> Result<Self> {
        load_dotenv_if_present(&loc.dir.join(".env"));
        Self::load_with_env(loc, |key| env::var(key).ok())
    }

    pub fn load_with_env(
        loc: &ConfigLocation,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = loc.path();
        let mut cfg = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Config::default(),
            Ok(contents) => serde_yaml::from_str::<Config>(&contents).map_err(|e| {
                Error::Config(format!("unable to decode {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(Error::Config(format!(
                    "unable to read {}: {e}",
                    path.display()
                )))
            }
        };
        cfg.apply_env(env);
        Ok(cfg)
    }

    /// Persist every known field, replacing the whole file.
    pub fn save(&self, loc: &ConfigLocation) -> Result<()> {
        let path = loc.path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let yaml = serde_yaml::to_string(self)?;
        fs::write(&path, yaml)?;
        Ok(())
    }

    /// Fail early when the Telegram side cannot possibly work.
    pub fn require_telegram(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ValidationError::MissingSetting("Telegram bot token").into());
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(ValidationError::MissingSetting("Telegram chat ID").into());
        }
        Ok(())
    }

    /// Overrides use the file keys uppercased with `.` replaced by `_`,
    /// e.g. `telegram.bot_token` -> `TELEGRAM_BOT_TOKEN`.
    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("WHATSAPP_SESSION_FILE") {
            self.whatsapp.session_file = PathBuf::from(v);
        }
        if let Some(v) = env("WHATSAPP_LOGIN_TIMEOUT_SECS").and_then(|v| parse_u64(&v)) {
            self.whatsapp.login_timeout_secs = v;
        }
        if let Some(v) = env("WHATSAPP_CONNECT_TIMEOUT_SECS").and_then(|v| parse_u64(&v)) {
            self.whatsapp.connect_timeout_secs = v;
        }
        if let Some(v) = env("WHATSAPP_ENDPOINT") {
            self.whatsapp.endpoint = v;
        }
        if let Some(v) = env("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Some(v) = env("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = v;
        }
        if let Some(v) = env("EXPORT_INCLUDE_MEDIA") {
            self.export.include_media = parse_bool(&v);
        }
        if let Some(v) = env("EXPORT_DATE_FROM") {
            self.export.date_from = v;
        }
        if let Some(v) = env("EXPORT_DATE_TO") {
            self.export.date_to = v;
        }
        if let Some(v) = env("EXPORT_MESSAGE_INTERVAL_MS").and_then(|v| parse_u64(&v)) {
            self.export.message_interval_ms = v;
        }
        if let Some(v) = env("EXPORT_CHAT_INTERVAL_MS").and_then(|v| parse_u64(&v)) {
            self.export.chat_interval_ms = v;
        }
    }
}

/// Create the config file with defaults if it does not exist yet.
///
/// Returns `true` when a new file was written.
pub fn ensure_config_file(loc: &ConfigLocation) -> Result<bool> {
    if loc.path().exists() {
        return Ok(false);
    }
    Config::default().save(loc)?;
    Ok(true)
}

fn parse_day(key: &str, raw: &str) -> Result<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| Error::Config(format!("invalid {key} format {raw:?}: {e}")))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| Error::Config(format!("invalid {key}: {raw:?}")))?;
    Ok(Utc.from_utc_datetime(&midnight))
}

fn deserialize_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(String::new()),
        Some(serde_yaml::Value::String(s)) => Ok(s),
        Some(serde_yaml::Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {other:?}"
        ))),
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() || env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_u64(s: &str) -> Option<u64> {
    s.trim().parse::<u64>().ok()
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
