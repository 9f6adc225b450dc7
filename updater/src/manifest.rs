//! 릴리스 디스크립터 (원격 manifest.json)
//!
//! 서버가 내려주는 JSON 은 필드 이름이 두 세대에 걸쳐 섞여 있습니다.
//! `RawManifest` 가 그 모양을 그대로 받고, `ReleaseDescriptor` 로 정규화합니다.
//!
//! ```json
//! { "version": "1.2.0", "downloadUrl": "https://…/game.zip", "game_exe": "Game.exe" }
//! { "version": "1.1.0", "zip_url": "https://…/game.zip", "folder": "PNW" }
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// 변경 내역: 문자열 하나이거나 언어별 맵
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Changelog {
    Text(String),
    Localized(BTreeMap<String, String>),
}

impl Changelog {
    /// 요청한 언어가 없으면 `en`, 그것도 없으면 아무 언어나
    pub fn for_language(&self, lang: &str) -> Option<&str> {
        match self {
            Changelog::Text(text) => Some(text.as_str()),
            Changelog::Localized(map) => map
                .get(lang)
                .or_else(|| map.get("en"))
                .or_else(|| map.values().next())
                .map(|s| s.as_str()),
        }
    }
}

/// 서버 JSON 모양 그대로. 모르는 필드는 무시합니다.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawManifest {
    pub version: String,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default, rename = "zip_url")]
    pub zip_url: Option<String>,
    #[serde(default, rename = "game_exe")]
    pub game_exe: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub download_size: Option<u64>,
    #[serde(default)]
    pub minimum_launcher_version: Option<String>,
    #[serde(default)]
    pub changelog: Option<Changelog>,
}

/// 정규화된 릴리스 정보. 체크 사이클마다 새로 받아 통째로 교체됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDescriptor {
    pub version: String,
    /// `downloadUrl` 우선, 없으면 `zip_url`, 둘 다 없으면 빈 문자열
    pub transfer_url: String,
    pub executable_name: Option<String>,
    pub target_subfolder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_launcher_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<Changelog>,
}

impl From<RawManifest> for ReleaseDescriptor {
    fn from(raw: RawManifest) -> Self {
        let transfer_url = raw
            .download_url
            .filter(|u| !u.trim().is_empty())
            .or(raw.zip_url)
            .map(|u| u.trim().to_string())
            .unwrap_or_default();

        Self {
            version: raw.version.trim().to_string(),
            transfer_url,
            executable_name: raw.game_exe.filter(|s| !s.trim().is_empty()),
            target_subfolder: raw.folder.filter(|s| !s.trim().is_empty()),
            name: raw.name,
            release_date: raw.release_date,
            download_size: raw.download_size,
            minimum_launcher_version: raw.minimum_launcher_version,
            changelog: raw.changelog,
        }
    }
}

impl ReleaseDescriptor {
    pub fn parse(json: &str) -> Result<Self, FetchError> {
        let raw: RawManifest = serde_json::from_str(json)?;
        Ok(raw.into())
    }

    pub fn has_transfer_url(&self) -> bool {
        !self.transfer_url.is_empty()
    }

    pub fn executable_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.executable_name.as_deref().unwrap_or(default)
    }
}

/// manifest URL 에서 디스크립터를 받아오는 HTTP 클라이언트
#[derive(Debug, Clone)]
pub struct ManifestClient {
    http: reqwest::Client,
    timeout_secs: u64,
}

impl ManifestClient {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pnw-launcher/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Network {
                message: format!("HTTP client init failed: {}", e),
                recoverable: false,
            })?;
        Ok(Self { http, timeout_secs })
    }

    pub async fn fetch(&self, url: &str) -> Result<ReleaseDescriptor, FetchError> {
        if url.trim().is_empty() {
            return Err(FetchError::Network {
                message: "manifest URL is not configured".to_string(),
                recoverable: false,
            });
        }

        tracing::debug!("[Executor] GET {}", url);
        let response = self
            .http
            .get(url)
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&e, "fetch manifest", self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&e, "read manifest", self.timeout_secs))?;
        ReleaseDescriptor::parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_url_wins_over_zip_url() {
        let d = ReleaseDescriptor::parse(
            r#"{"version":"1.2.0","downloadUrl":"https://a/new.zip","zip_url":"https://a/old.zip"}"#,
        )
        .unwrap();
        assert_eq!(d.transfer_url, "https://a/new.zip");
    }

    #[test]
    fn legacy_zip_url_is_used() {
        let d = ReleaseDescriptor::parse(
            r#"{"version":"1.1","zip_url":"https://a/old.zip","game_exe":"PNW.exe","folder":"Game"}"#,
        )
        .unwrap();
        assert_eq!(d.transfer_url, "https://a/old.zip");
        assert_eq!(d.executable_name.as_deref(), Some("PNW.exe"));
        assert_eq!(d.target_subfolder.as_deref(), Some("Game"));
    }

    #[test]
    fn missing_url_is_resolvable_but_unusable() {
        let d = ReleaseDescriptor::parse(r#"{"version":"1.0.0"}"#).unwrap();
        assert_eq!(d.transfer_url, "");
        assert!(!d.has_transfer_url());
        assert_eq!(d.executable_or("Game.exe"), "Game.exe");
    }

    #[test]
    fn missing_version_is_parse_error() {
        let err = ReleaseDescriptor::parse(r#"{"downloadUrl":"x"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn extras_and_unknown_fields() {
        let d = ReleaseDescriptor::parse(
            r#"{
                "version": "2.0.0",
                "downloadUrl": "https://a/g.zip",
                "name": "PNW",
                "releaseDate": "2024-05-01",
                "downloadSize": 1048576,
                "minimumLauncherVersion": "0.5.0",
                "changelog": {"fr": "Corrections", "en": "Fixes"},
                "integrity": {"sha256": "…"}
            }"#,
        )
        .unwrap();
        assert_eq!(d.name.as_deref(), Some("PNW"));
        assert_eq!(d.download_size, Some(1_048_576));
        let changelog = d.changelog.unwrap();
        assert_eq!(changelog.for_language("fr"), Some("Corrections"));
        assert_eq!(changelog.for_language("de"), Some("Fixes"));
    }

    #[test]
    fn plain_changelog() {
        let d = ReleaseDescriptor::parse(r#"{"version":"1","changelog":"notes"}"#).unwrap();
        assert_eq!(d.changelog.unwrap().for_language("en"), Some("notes"));
    }
}
