//! 표시 계층용 읽기 전용 스냅샷
//!
//! 오케스트레이터가 상태를 바꿀 때마다 `watch` 채널로 새 스냅샷을 내보냅니다.
//! 렌더링은 이 구조체만 보고 하면 됩니다.

use serde::{Deserialize, Serialize};

use crate::event_log::LogEntry;
use crate::install::{InstallStatus, LocalInstallFacts};
use crate::lifecycle::{LifecyclePhase, ProgressSnapshot};
use crate::manifest::ReleaseDescriptor;

/// 주 버튼
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryAction {
    Install,
    Update,
    Launch,
}

impl PrimaryAction {
    pub fn for_status(status: InstallStatus) -> Self {
        match status {
            InstallStatus::NotInstalled => PrimaryAction::Install,
            InstallStatus::UpdateAvailable => PrimaryAction::Update,
            InstallStatus::UpToDate => PrimaryAction::Launch,
        }
    }
}

/// 현재 단계에서 누를 수 있는 전송 제어
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferControls {
    pub pause: bool,
    pub resume: bool,
    pub cancel: bool,
}

impl TransferControls {
    pub fn for_phase(phase: LifecyclePhase) -> Self {
        Self {
            pause: phase == LifecyclePhase::Downloading,
            resume: phase == LifecyclePhase::Paused,
            cancel: matches!(phase, LifecyclePhase::Downloading | LifecyclePhase::Paused),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LauncherSnapshot {
    pub phase: LifecyclePhase,
    pub install_status: Option<InstallStatus>,
    pub install_directory: String,
    pub local_version: Option<String>,
    pub remote_version: Option<String>,
    /// 디스크립터가 알려준 패키지 크기 (`1.5 MB` 형식)
    pub download_size: Option<String>,
    pub minimum_launcher_version: Option<String>,
    pub percent: f64,
    pub bytes_transferred: u64,
    pub bytes_total: u64,
    pub eta: String,
    pub throughput: String,
    pub primary_action: Option<PrimaryAction>,
    pub controls: TransferControls,
    pub entries: Vec<LogEntry>,
}

impl LauncherSnapshot {
    pub fn build(
        phase: LifecyclePhase,
        progress: &ProgressSnapshot,
        descriptor: Option<&ReleaseDescriptor>,
        facts: Option<&LocalInstallFacts>,
        status: Option<InstallStatus>,
        entries: Vec<LogEntry>,
    ) -> Self {
        Self {
            phase,
            install_status: status,
            install_directory: facts.map(|f| f.install_directory.clone()).unwrap_or_default(),
            local_version: facts.and_then(|f| f.local_version.clone()),
            remote_version: descriptor.map(|d| d.version.clone()),
            download_size: descriptor
                .and_then(|d| d.download_size)
                .map(|n| fmt_bytes(n as f64)),
            minimum_launcher_version: descriptor.and_then(|d| d.minimum_launcher_version.clone()),
            percent: progress.percent(),
            bytes_transferred: progress.bytes_transferred,
            bytes_total: progress.bytes_total,
            eta: fmt_eta(progress.eta_seconds),
            throughput: fmt_throughput(progress.throughput_bytes_per_second),
            primary_action: status.map(PrimaryAction::for_status),
            controls: TransferControls::for_phase(phase),
            entries,
        }
    }
}

/// `512 B`, `1.5 MB` …
pub fn fmt_bytes(n: f64) -> String {
    if n < 1024.0 {
        return format!("{} B", n.max(0.0) as u64);
    }
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    let mut value = n;
    let mut idx = 0;
    loop {
        value /= 1024.0;
        if value < 1024.0 || idx == UNITS.len() - 1 {
            break;
        }
        idx += 1;
    }
    format!("{:.1} {}", value, UNITS[idx])
}

/// `m:ss`, 알 수 없으면 `—`
pub fn fmt_eta(secs: Option<u64>) -> String {
    match secs {
        Some(s) => format!("{}:{:02}", s / 60, s % 60),
        None => "—".to_string(),
    }
}

/// `1.5 MB/s`, 알 수 없거나 0 이면 `—/s`
pub fn fmt_throughput(bps: Option<f64>) -> String {
    match bps {
        Some(v) if v > 0.0 => format!("{}/s", fmt_bytes(v)),
        _ => "—/s".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_extras_are_presented() {
        let descriptor = ReleaseDescriptor::parse(
            r#"{"version":"2.0.0","downloadUrl":"u","downloadSize":1572864,"minimumLauncherVersion":"0.3.0"}"#,
        )
        .unwrap();
        let snap = LauncherSnapshot::build(
            LifecyclePhase::Ready,
            &ProgressSnapshot::default(),
            Some(&descriptor),
            None,
            Some(InstallStatus::NotInstalled),
            Vec::new(),
        );
        assert_eq!(snap.download_size.as_deref(), Some("1.5 MB"));
        assert_eq!(snap.minimum_launcher_version.as_deref(), Some("0.3.0"));
        assert_eq!(snap.primary_action, Some(PrimaryAction::Install));

        let bare = LauncherSnapshot::build(
            LifecyclePhase::Idle,
            &ProgressSnapshot::default(),
            None,
            None,
            None,
            Vec::new(),
        );
        assert_eq!(bare.download_size, None);
        assert_eq!(bare.minimum_launcher_version, None);
    }

    #[test]
    fn bytes_formatting() {
        assert_eq!(fmt_bytes(0.0), "0 B");
        assert_eq!(fmt_bytes(1023.0), "1023 B");
        assert_eq!(fmt_bytes(1024.0), "1.0 KB");
        assert_eq!(fmt_bytes(1.5 * 1024.0 * 1024.0), "1.5 MB");
        assert_eq!(fmt_bytes(3.0 * 1024.0 * 1024.0 * 1024.0), "3.0 GB");
        assert_eq!(fmt_bytes(2048.0 * 1024.0 * 1024.0 * 1024.0), "2048.0 GB");
    }

    #[test]
    fn eta_formatting() {
        assert_eq!(fmt_eta(None), "—");
        assert_eq!(fmt_eta(Some(0)), "0:00");
        assert_eq!(fmt_eta(Some(65)), "1:05");
        assert_eq!(fmt_eta(Some(3600)), "60:00");
    }

    #[test]
    fn throughput_formatting() {
        assert_eq!(fmt_throughput(None), "—/s");
        assert_eq!(fmt_throughput(Some(0.0)), "—/s");
        assert_eq!(fmt_throughput(Some(2048.0)), "2.0 KB/s");
    }

    #[test]
    fn controls_follow_phase() {
        let c = TransferControls::for_phase(LifecyclePhase::Downloading);
        assert!(c.pause && c.cancel && !c.resume);
        let c = TransferControls::for_phase(LifecyclePhase::Paused);
        assert!(!c.pause && c.cancel && c.resume);
        assert_eq!(
            TransferControls::for_phase(LifecyclePhase::Extracting),
            TransferControls::default()
        );
    }

    #[test]
    fn primary_action_mapping() {
        assert_eq!(PrimaryAction::for_status(InstallStatus::NotInstalled), PrimaryAction::Install);
        assert_eq!(PrimaryAction::for_status(InstallStatus::UpdateAvailable), PrimaryAction::Update);
        assert_eq!(PrimaryAction::for_status(InstallStatus::UpToDate), PrimaryAction::Launch);
    }
}
