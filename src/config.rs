//! エディタ設定
//!
//! JSON 設定ファイルの読み込みと既定値

use crate::error::{ConfigError, Result};
use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 設定ファイルの場所を上書きする環境変数
pub const CONFIG_ENV: &str = "BLOCKCARET_CONFIG";

/// 確定コミットの既定デバウンス（ミリ秒）
pub const DEFAULT_COMMIT_DEBOUNCE_MS: u64 = 220;

/// フォーカス要求の既定TTL（ミリ秒）
pub const DEFAULT_FOCUS_INTENT_TTL_MS: u64 = 1500;

/// ロギング設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// 追記先ファイル（`~` と環境変数を展開済みで保持）
    pub file: Option<String>,
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
            stderr: true,
        }
    }
}

/// エディタ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 入力から確定コミットまでの待ち時間
    pub commit_debounce_ms: u64,
    /// 誰にも消費されないフォーカス要求が自動で消えるまでの時間
    pub focus_intent_ttl_ms: Option<u64>,
    /// 唯一の空ブロックで Enter したとき編集を抜ける
    pub prefer_exit_for_lonely_empty: bool,
    /// 空リストから抜けるのに Enter を二度要求する
    pub confirm_list_exit: bool,
    pub logging: LoggingConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            commit_debounce_ms: DEFAULT_COMMIT_DEBOUNCE_MS,
            focus_intent_ttl_ms: Some(DEFAULT_FOCUS_INTENT_TTL_MS),
            prefer_exit_for_lonely_empty: false,
            confirm_list_exit: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl EditorConfig {
    /// 既定の場所から設定を読み込む
    ///
    /// ファイルが存在しなければ既定値を返す
    pub fn load() -> Result<Self> {
        match Self::resolve_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// 設定ファイルのパスを解決
    pub fn resolve_path() -> Option<PathBuf> {
        if let Ok(raw) = std::env::var(CONFIG_ENV) {
            return Some(expand_path(&raw));
        }
        dirs::config_dir().map(|dir| dir.join("blockcaret").join("config.json"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw).map_err(|err| match err {
            crate::error::BlockcaretError::Config(ConfigError::InvalidFile { message, .. }) => {
                ConfigError::InvalidFile {
                    path: path.display().to_string(),
                    message,
                }
                .into()
            }
            other => other,
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let mut config: EditorConfig =
            serde_json::from_str(raw).map_err(|err| ConfigError::InvalidFile {
                path: "<inline>".to_string(),
                message: err.to_string(),
            })?;
        config.validate()?;
        if let Some(file) = config.logging.file.take() {
            config.logging.file = Some(expand_path(&file).display().to_string());
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| ConfigError::Io {
            message: err.to_string(),
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.commit_debounce_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "commit_debounce_ms".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.focus_intent_ttl_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "focus_intent_ttl_ms".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn commit_debounce(&self) -> Duration {
        Duration::from_millis(self.commit_debounce_ms)
    }

    pub fn focus_intent_ttl(&self) -> Option<Duration> {
        self.focus_intent_ttl_ms.map(Duration::from_millis)
    }
}

/// `~` と `$VAR` を展開する。展開に失敗したら元の文字列を使う
fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(err) => {
            log::warn!("could not expand config path {}: {}", raw, err);
            PathBuf::from(raw)
        }
    }
}
