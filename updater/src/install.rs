//! 설치 상태 판정
//!
//! 원격 디스크립터와 로컬 설치 정보 두 가지만 보고 결정하는 순수 함수입니다.

use serde::{Deserialize, Serialize};

use crate::manifest::ReleaseDescriptor;
use crate::version;

/// 로컬에서 관측한 설치 정보. 체크 사이클마다 새로 읽습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalInstallFacts {
    /// 빈 문자열이면 설정되지 않음
    pub install_directory: String,
    pub product_present_on_disk: bool,
    pub local_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstallStatus {
    NotInstalled,
    UpToDate,
    UpdateAvailable,
}

impl InstallStatus {
    pub fn is_installed(&self) -> bool {
        !matches!(self, InstallStatus::NotInstalled)
    }
}

/// 설치 상태 결정
///
/// 실행 파일은 있는데 버전을 모르면 업데이트 대상으로 봅니다.
pub fn resolve(descriptor: Option<&ReleaseDescriptor>, facts: &LocalInstallFacts) -> InstallStatus {
    match (&facts.local_version, descriptor) {
        (None, _) if !facts.product_present_on_disk => InstallStatus::NotInstalled,
        (None, _) => InstallStatus::UpdateAvailable,
        (Some(local), Some(remote)) if version::is_older(local, &remote.version) => {
            InstallStatus::UpdateAvailable
        }
        (Some(_), _) => InstallStatus::UpToDate,
    }
}

/// 설치 디렉토리 자동 탐색 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub found: bool,
    pub path: Option<String>,
    pub reason: Option<String>,
}

impl DetectionResult {
    pub fn found(path: impl Into<String>) -> Self {
        Self {
            found: true,
            path: Some(path.into()),
            reason: None,
        }
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self {
            found: false,
            path: None,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(version: &str) -> ReleaseDescriptor {
        ReleaseDescriptor {
            version: version.to_string(),
            transfer_url: "https://example.invalid/game.zip".to_string(),
            executable_name: None,
            target_subfolder: None,
            name: None,
            release_date: None,
            download_size: None,
            minimum_launcher_version: None,
            changelog: None,
        }
    }

    fn facts(present: bool, version: Option<&str>) -> LocalInstallFacts {
        LocalInstallFacts {
            install_directory: "/games/pnw".to_string(),
            product_present_on_disk: present,
            local_version: version.map(str::to_string),
        }
    }

    #[test]
    fn nothing_on_disk_is_not_installed() {
        assert_eq!(resolve(None, &facts(false, None)), InstallStatus::NotInstalled);
        assert_eq!(
            resolve(Some(&descriptor("2.0.0")), &facts(false, None)),
            InstallStatus::NotInstalled
        );
    }

    #[test]
    fn present_without_version_needs_update() {
        assert_eq!(
            resolve(Some(&descriptor("2.0.0")), &facts(true, None)),
            InstallStatus::UpdateAvailable
        );
        assert_eq!(resolve(None, &facts(true, None)), InstallStatus::UpdateAvailable);
    }

    #[test]
    fn version_comparison() {
        assert_eq!(
            resolve(Some(&descriptor("1.0.0")), &facts(true, Some("1.0.0"))),
            InstallStatus::UpToDate
        );
        assert_eq!(
            resolve(Some(&descriptor("2.0.0")), &facts(true, Some("1.0.0"))),
            InstallStatus::UpdateAvailable
        );
        // 로컬이 더 새로우면 최신으로 취급
        assert_eq!(
            resolve(Some(&descriptor("1.0")), &facts(true, Some("1.0.1"))),
            InstallStatus::UpToDate
        );
    }

    #[test]
    fn version_file_alone_counts_as_installed() {
        assert_eq!(
            resolve(Some(&descriptor("1.2")), &facts(false, Some("1.2.0"))),
            InstallStatus::UpToDate
        );
        assert_eq!(resolve(None, &facts(false, Some("0.1"))), InstallStatus::UpToDate);
    }
}
