//! 런처 설정 파일 (`config/launcher.toml`)
//!
//! 실행 파일 옆 `config/launcher.toml` → 작업 디렉토리의 `config/launcher.toml` 순서로 찾고,
//! 없으면 기본값을 사용합니다. 파일에 없는 키도 기본값으로 채워집니다.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/Jiromk/pnw-launcher/main/latest.json";

const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "launcher.toml";

/// 설정 키 목록 (`config set` 검증과 도움말에서 사용)
pub const CONFIG_KEYS: &[&str] = &[
    "manifest_url",
    "install_dir",
    "default_executable",
    "version_file",
    "check_interval_secs",
    "log_capacity",
    "request_timeout_secs",
    "download_timeout_secs",
    "checks_during_transfer",
    "backup_files",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub manifest_url: String,
    /// 비어 있으면 기본 데이터 디렉토리 사용
    pub install_dir: Option<String>,
    pub default_executable: String,
    pub version_file: String,
    pub check_interval_secs: u64,
    pub log_capacity: usize,
    pub request_timeout_secs: u64,
    pub download_timeout_secs: u64,
    /// 전송 중에도 주기적 확인을 돌릴지 (phase 는 어차피 보존됨)
    pub checks_during_transfer: bool,
    /// 압축 해제 전에 `backup/<timestamp>/` 로 복사할 파일
    pub backup_files: Vec<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            install_dir: None,
            default_executable: "Game.exe".to_string(),
            version_file: ".version".to_string(),
            check_interval_secs: 300,
            log_capacity: crate::event_log::DEFAULT_LOG_CAPACITY,
            request_timeout_secs: 30,
            download_timeout_secs: 600,
            checks_during_transfer: true,
            backup_files: vec![
                "Save1.rxdata".to_string(),
                "Save2.rxdata".to_string(),
                "Save3.rxdata".to_string(),
                "Save4.rxdata".to_string(),
                "Game.ini".to_string(),
            ],
        }
    }
}

impl LauncherConfig {
    /// 기본 경로에서 로드 (파일이 없으면 기본값)
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("[Config] {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg: LauncherConfig = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        tracing::info!("[Config] Loaded from {:?}", path);
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// 설정된 설치 디렉토리, 없으면 기본 데이터 디렉토리
    pub fn resolved_install_dir(&self) -> PathBuf {
        match self.install_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => default_install_dir(),
        }
    }
}

/// 설정 파일 경로 결정
pub fn config_file_path() -> PathBuf {
    // 1. 실행 파일 옆 config/launcher.toml
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let cfg = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if cfg.exists() {
                return cfg;
            }
        }
    }

    // 2. 기본: CWD 의 config/launcher.toml (생성용이기도 함)
    PathBuf::from(CONFIG_DIR).join(CONFIG_FILE)
}

/// `<data_local_dir>/PNW/Game`
pub fn default_install_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("PNW")
        .join("Game")
}

/// config set <key> <value>: 값 타입을 검증한 뒤 해당 키만 갱신
pub fn set_config_value(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut table: toml::value::Table = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        content
            .parse::<toml::Value>()?
            .as_table()
            .cloned()
            .unwrap_or_default()
    } else {
        toml::value::Table::new()
    };

    let toml_val: toml::Value = match key {
        "checks_during_transfer" => toml::Value::Boolean(value.parse::<bool>().map_err(|_| {
            anyhow::anyhow!("Invalid boolean value: '{}' (use true/false)", value)
        })?),
        "check_interval_secs" | "log_capacity" | "request_timeout_secs"
        | "download_timeout_secs" => {
            let n = value
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("Invalid integer value: '{}'", value))?;
            if n == 0 {
                anyhow::bail!("'{}' must be greater than 0", key);
            }
            toml::Value::Integer(n as i64)
        }
        "manifest_url" | "install_dir" | "default_executable" | "version_file" => {
            toml::Value::String(value.to_string())
        }
        "backup_files" => toml::Value::Array(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_string()))
                .collect(),
        ),
        _ => {
            anyhow::bail!(
                "Unknown config key: '{}'\nAvailable: {}",
                key,
                CONFIG_KEYS.join(", ")
            );
        }
    };

    table.insert(key.to_string(), toml_val);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let content = toml::to_string_pretty(&toml::Value::Table(table))?;
    std::fs::write(path, content)?;
    tracing::info!("[Config] {} updated in {:?}", key, path);
    Ok(())
}
