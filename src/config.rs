use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::carousel::Settings;
use crate::format;
use crate::loader::{LoaderSettings, Strategy};

const DEFAULT_ENV_PREFIX: &str = "GOOD_VIBES";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub replies: RepliesConfig,
    #[serde(default)]
    pub idle: IdleConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5000/api".into()
}

fn default_user_agent() -> String {
    format!("good-vibes-tui/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(15)
}

/// Size of the wall display the carousel is shown on, used to pick avatar sizes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    #[serde(default = "default_progress_tick", with = "humantime_serde")]
    pub progress_tick: Duration,
    #[serde(default = "default_auto_play")]
    pub auto_play: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            progress_tick: default_progress_tick(),
            auto_play: default_auto_play(),
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_progress_tick() -> Duration {
    Duration::from_millis(50)
}

fn default_auto_play() -> bool {
    false
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepliesConfig {
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
    #[serde(default = "default_rotation_interval", with = "humantime_serde")]
    pub rotation_interval: Duration,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            max_visible: default_max_visible(),
            rotation_interval: default_rotation_interval(),
        }
    }
}

fn default_max_visible() -> usize {
    2
}

fn default_rotation_interval() -> Duration {
    Duration::from_secs(4)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdleConfig {
    #[serde(default = "default_hide_delay", with = "humantime_serde")]
    pub hide_delay: Duration,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            hide_delay: default_hide_delay(),
        }
    }
}

fn default_hide_delay() -> Duration {
    Duration::from_secs(7)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoaderConfig {
    #[serde(default)]
    pub strategy: Strategy,
    /// Days or months per window; unset picks the strategy's own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_size: Option<u32>,
    #[serde(default = "default_pacing", with = "humantime_serde")]
    pub pacing: Duration,
    #[serde(default = "default_cache_retry", with = "humantime_serde")]
    pub cache_retry: Duration,
    #[serde(default = "default_max_windows")]
    pub max_windows: u32,
    #[serde(default = "default_refresh_interval", with = "humantime_serde")]
    pub refresh_interval: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            window_size: None,
            pacing: default_pacing(),
            cache_retry: default_cache_retry(),
            max_windows: default_max_windows(),
            refresh_interval: default_refresh_interval(),
        }
    }
}

fn default_pacing() -> Duration {
    Duration::from_millis(1500)
}

fn default_cache_retry() -> Duration {
    Duration::from_secs(2)
}

fn default_max_windows() -> u32 {
    24
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UIConfig {
    #[serde(default = "default_show_leaderboard")]
    pub show_leaderboard: bool,
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: u32,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            show_leaderboard: default_show_leaderboard(),
            leaderboard_limit: default_leaderboard_limit(),
        }
    }
}

fn default_show_leaderboard() -> bool {
    true
}

fn default_leaderboard_limit() -> u32 {
    3
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.api.base_url.trim().is_empty(),
            "config: api.base_url is required"
        );
        ensure!(
            self.replies.max_visible > 0,
            "config: replies.max_visible must be at least 1"
        );
        ensure!(
            self.loader.window_size != Some(0),
            "config: loader.window_size must be at least 1"
        );
        for (name, value) in [
            ("playback.interval", self.playback.interval),
            ("playback.progress_tick", self.playback.progress_tick),
            ("replies.rotation_interval", self.replies.rotation_interval),
            ("loader.refresh_interval", self.loader.refresh_interval),
        ] {
            ensure!(!value.is_zero(), "config: {name} must be greater than zero");
        }
        Ok(())
    }

    pub fn carousel_settings(&self) -> Settings {
        Settings {
            interval: self.playback.interval,
            progress_tick: self.playback.progress_tick,
            auto_play: self.playback.auto_play,
            max_visible_replies: self.replies.max_visible,
            reply_interval: self.replies.rotation_interval,
            hide_delay: self.idle.hide_delay,
            refresh_interval: self.loader.refresh_interval,
            loader: LoaderSettings {
                strategy: self.loader.strategy,
                window_size: self
                    .loader
                    .window_size
                    .unwrap_or_else(|| self.loader.strategy.default_window_size()),
                pacing: self.loader.pacing,
                cache_retry: self.loader.cache_retry,
                max_windows: self.loader.max_windows,
                avatar_size: format::avatar_size(self.display.width, self.display.height)
                    .to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = match options.config_file.as_ref() {
        Some(path) => read_config_file(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => read_config_file(&path)?,
            _ => Config::default(),
        },
    };

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    cfg.validate()?;
    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    if data.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let upper_prefix = format!("{}_", prefix.to_uppercase());
    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            apply_env_value(cfg, &normalized, value);
        }
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => set_duration(&mut cfg.api.timeout, key, &value),
        "display.width" => set_parsed(&mut cfg.display.width, key, &value),
        "display.height" => set_parsed(&mut cfg.display.height, key, &value),
        "playback.interval" => set_duration(&mut cfg.playback.interval, key, &value),
        "playback.progress_tick" => set_duration(&mut cfg.playback.progress_tick, key, &value),
        "playback.auto_play" => cfg.playback.auto_play = parse_bool(&value),
        "replies.max_visible" => set_parsed(&mut cfg.replies.max_visible, key, &value),
        "replies.rotation_interval" => {
            set_duration(&mut cfg.replies.rotation_interval, key, &value)
        }
        "idle.hide_delay" => set_duration(&mut cfg.idle.hide_delay, key, &value),
        "loader.strategy" => match Strategy::parse(&value) {
            Some(strategy) => cfg.loader.strategy = strategy,
            None => warn!(key, %value, "ignoring unknown loader strategy"),
        },
        "loader.window_size" => match value.trim().parse::<u32>() {
            Ok(size) => cfg.loader.window_size = Some(size),
            Err(_) => warn!(key, %value, "ignoring invalid number"),
        },
        "loader.pacing" => set_duration(&mut cfg.loader.pacing, key, &value),
        "loader.cache_retry" => set_duration(&mut cfg.loader.cache_retry, key, &value),
        "loader.max_windows" => set_parsed(&mut cfg.loader.max_windows, key, &value),
        "loader.refresh_interval" => set_duration(&mut cfg.loader.refresh_interval, key, &value),
        "ui.show_leaderboard" => cfg.ui.show_leaderboard = parse_bool(&value),
        "ui.leaderboard_limit" => set_parsed(&mut cfg.ui.leaderboard_limit, key, &value),
        _ => {}
    }
}

fn set_duration(slot: &mut Duration, key: &str, value: &str) {
    match humantime::parse_duration(value.trim()) {
        Ok(duration) => *slot = duration,
        Err(err) => warn!(key, value, "ignoring invalid duration: {err}"),
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, key: &str, value: &str) {
    match value.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value, "ignoring invalid number"),
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "True" | "yes")
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("good-vibes").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goodvibes::Window;
    use crate::loader::{Cursor, Loader};
    use std::env;
    use tempfile::tempdir;

    fn isolated(prefix: &str, file: Option<PathBuf>) -> LoadOptions {
        LoadOptions {
            config_file: file,
            env_prefix: Some(prefix.to_string()),
        }
    }

    #[test]
    fn defaults_match_the_wall_display() {
        let cfg = Config::default();
        assert_eq!(cfg.api.base_url, "http://localhost:5000/api");
        assert_eq!(cfg.playback.interval, Duration::from_secs(5));
        assert_eq!(cfg.replies.max_visible, 2);
        assert_eq!(cfg.idle.hide_delay, Duration::from_secs(7));
        assert_eq!(cfg.loader.strategy, Strategy::Days);
        assert!(!cfg.playback.auto_play);

        let settings = cfg.carousel_settings();
        assert_eq!(settings.reply_interval, Duration::from_secs(4));
        assert_eq!(settings.loader.avatar_size, "128x128");
        assert_eq!(settings.refresh_interval, Duration::from_secs(3600));
    }

    #[test]
    fn reads_partial_yaml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "api:\n  base_url: https://vibes.example.com/api\nplayback:\n  interval: 8s\nloader:\n  strategy: months\n  window_size: 3\ndisplay:\n  width: 3840\n  height: 2160\n",
        )
        .unwrap();

        let cfg = load(isolated("GOOD_VIBES_TEST_FILE", Some(path))).unwrap();
        assert_eq!(cfg.api.base_url, "https://vibes.example.com/api");
        assert_eq!(cfg.playback.interval, Duration::from_secs(8));
        assert_eq!(cfg.playback.progress_tick, Duration::from_millis(50));
        assert_eq!(cfg.loader.strategy, Strategy::Months);
        assert_eq!(cfg.loader.window_size, Some(3));
        assert_eq!(cfg.carousel_settings().loader.window_size, 3);
        assert_eq!(cfg.carousel_settings().loader.avatar_size, "256x256");
    }

    #[test]
    fn months_strategy_defaults_to_single_month_windows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "loader:\n  strategy: months\n").unwrap();

        let cfg = load(isolated("GOOD_VIBES_TEST_MONTHS", Some(path))).unwrap();
        assert_eq!(cfg.loader.window_size, None);
        let settings = cfg.carousel_settings();
        assert_eq!(settings.loader.window_size, 1);

        let mut loader = Loader::new(settings.loader);
        assert_eq!(loader.begin().cursor, Cursor::Window(Window::Months(1)));
        assert_eq!(Config::default().carousel_settings().loader.window_size, 30);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = load(isolated(
            "GOOD_VIBES_TEST_MISSING",
            Some(dir.path().join("absent.yaml")),
        ))
        .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }

    #[test]
    fn env_overrides() {
        env::set_var("GOOD_VIBES_TEST_ENV_PLAYBACK__INTERVAL", "8s");
        env::set_var("GOOD_VIBES_TEST_ENV_PLAYBACK__AUTO_PLAY", "true");
        env::set_var("GOOD_VIBES_TEST_ENV_LOADER__STRATEGY", "paged");
        env::set_var("GOOD_VIBES_TEST_ENV_REPLIES__MAX_VISIBLE", "not-a-number");
        let cfg = load(isolated("GOOD_VIBES_TEST_ENV", None)).unwrap();
        env::remove_var("GOOD_VIBES_TEST_ENV_PLAYBACK__INTERVAL");
        env::remove_var("GOOD_VIBES_TEST_ENV_PLAYBACK__AUTO_PLAY");
        env::remove_var("GOOD_VIBES_TEST_ENV_LOADER__STRATEGY");
        env::remove_var("GOOD_VIBES_TEST_ENV_REPLIES__MAX_VISIBLE");

        assert_eq!(cfg.playback.interval, Duration::from_secs(8));
        assert!(cfg.playback.auto_play);
        assert_eq!(cfg.loader.strategy, Strategy::Paged);
        assert_eq!(cfg.replies.max_visible, 2);
    }

    #[test]
    fn zero_reply_window_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "replies:\n  max_visible: 0\n").unwrap();
        let err = load(isolated("GOOD_VIBES_TEST_ZERO", Some(path))).unwrap_err();
        assert!(err.to_string().contains("replies.max_visible"));
    }
}
