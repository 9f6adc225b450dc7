//! 다운로드/설치 라이프사이클 상태 머신
//!
//! 실행기에서 들어오는 두 이벤트 스트림(진행/단계, 오류)을 하나의 `LifecyclePhase` 와
//! `ProgressSnapshot` 으로 접습니다. 이 모듈이 phase 와 snapshot 의 유일한 작성자입니다.
//!
//! ## 단계 이벤트
//! ```text
//! download  : Ready | Downloading | Paused -> Downloading
//! extract   : Downloading                  -> Extracting
//! paused    : Downloading                  -> Paused
//! canceled  : Downloading | Paused         -> Ready
//! failed    : Downloading | Paused | Extracting -> Ready
//! done      : Downloading | Extracting     -> Done
//! ```
//! 허용되지 않은 단계에서 도착한 이벤트는 무시합니다 (debug 로그만 남김).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LauncherError;
use crate::event_log::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    #[default]
    Idle,
    Checking,
    Ready,
    Downloading,
    Paused,
    Extracting,
    Done,
    Error,
}

impl LifecyclePhase {
    /// 전송이 진행 중인 단계 (체크 사이클이 건드리지 않음)
    pub fn is_transfer_active(&self) -> bool {
        matches!(
            self,
            LifecyclePhase::Downloading | LifecyclePhase::Paused | LifecyclePhase::Extracting
        )
    }

    /// 체크 사이클이 `Checking` 으로 바꿀 수 있는 단계
    pub fn accepts_check(&self) -> bool {
        !self.is_transfer_active()
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecyclePhase::Idle => "idle",
            LifecyclePhase::Checking => "checking",
            LifecyclePhase::Ready => "ready",
            LifecyclePhase::Downloading => "downloading",
            LifecyclePhase::Paused => "paused",
            LifecyclePhase::Extracting => "extracting",
            LifecyclePhase::Done => "done",
            LifecyclePhase::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// 전송 진행 상황. `Downloading` 동안만 의미가 있고, `Extracting` 으로 넘어가도 유지됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub bytes_transferred: u64,
    /// 0 이면 알 수 없음
    pub bytes_total: u64,
    pub eta_seconds: Option<u64>,
    pub throughput_bytes_per_second: Option<f64>,
    /// `done` 수신 여부. 총량을 몰라도 100% 로 표시하기 위함
    #[serde(default)]
    pub complete: bool,
}

impl ProgressSnapshot {
    pub fn percent(&self) -> f64 {
        if self.complete {
            return 100.0;
        }
        if self.bytes_total == 0 {
            return 0.0;
        }
        (100.0 * self.bytes_transferred as f64 / self.bytes_total as f64).min(100.0)
    }
}

/// 진행/단계 이벤트의 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Download,
    Extract,
    Paused,
    Canceled,
    /// 실행기 쪽 치명적 오류 뒤 재시도 가능 상태로 복귀 (오류 내용은 fault 로 따로 옴)
    Failed,
    Done,
}

impl Stage {
    fn valid_from(&self, phase: LifecyclePhase) -> bool {
        use LifecyclePhase as P;
        match self {
            Stage::Download => matches!(phase, P::Ready | P::Downloading | P::Paused),
            Stage::Extract => matches!(phase, P::Downloading),
            Stage::Paused => matches!(phase, P::Downloading),
            Stage::Canceled => matches!(phase, P::Downloading | P::Paused),
            Stage::Failed => phase.is_transfer_active(),
            Stage::Done => matches!(phase, P::Extracting | P::Downloading),
        }
    }

    fn target(&self) -> LifecyclePhase {
        match self {
            Stage::Download => LifecyclePhase::Downloading,
            Stage::Extract => LifecyclePhase::Extracting,
            Stage::Paused => LifecyclePhase::Paused,
            Stage::Canceled | Stage::Failed => LifecyclePhase::Ready,
            Stage::Done => LifecyclePhase::Done,
        }
    }
}

/// 실행기가 보내는 진행/단계 이벤트
///
/// 예전 키 이름 `eta_secs`, `speed_bps` 도 받아들입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEvent {
    pub stage: Stage,
    #[serde(default)]
    pub downloaded: Option<u64>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default, alias = "eta_secs")]
    pub eta_seconds: Option<u64>,
    #[serde(default, alias = "speed_bps")]
    pub throughput_bytes_per_second: Option<f64>,
}

impl StageEvent {
    pub fn stage(stage: Stage) -> Self {
        Self {
            stage,
            downloaded: None,
            total: None,
            eta_seconds: None,
            throughput_bytes_per_second: None,
        }
    }

    pub fn download(downloaded: u64, total: u64) -> Self {
        Self {
            downloaded: Some(downloaded),
            total: Some(total),
            ..Self::stage(Stage::Download)
        }
    }
}

/// 실행기가 보내는 오류 이벤트 (예전 키 `error` 허용)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultEvent {
    #[serde(alias = "error")]
    pub description: String,
}

impl FaultEvent {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// 이벤트 하나를 적용한 결과. 로그/재확인은 호출자(오케스트레이터)가 수행합니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reaction {
    pub changed: bool,
    pub log: Option<(Severity, String)>,
    pub recheck: bool,
}

impl Reaction {
    fn ignored() -> Self {
        Self::default()
    }
}

/// 라이프사이클 명령 (phase 게이트 대상)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Cancel,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "install/update",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Cancel => "cancel",
        }
    }

    fn allowed_in(&self, phase: LifecyclePhase) -> bool {
        use LifecyclePhase as P;
        match self {
            Command::Start => matches!(phase, P::Idle | P::Ready | P::Done | P::Error),
            Command::Pause => matches!(phase, P::Downloading),
            Command::Resume => matches!(phase, P::Paused),
            Command::Cancel => matches!(phase, P::Downloading | P::Paused),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DownloadLifecycle {
    phase: LifecyclePhase,
    progress: ProgressSnapshot,
}

impl DownloadLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn progress(&self) -> &ProgressSnapshot {
        &self.progress
    }

    fn set_phase(&mut self, to: LifecyclePhase) {
        if self.phase != to {
            tracing::debug!("[Lifecycle] {} -> {}", self.phase, to);
            self.phase = to;
        }
    }

    // ─── 체크 사이클 ───────────────────────────────────

    /// 체크 시작. 전송 중이면 아무것도 바꾸지 않고 `false`.
    pub fn begin_check(&mut self) -> bool {
        if !self.phase.accepts_check() {
            return false;
        }
        self.set_phase(LifecyclePhase::Checking);
        true
    }

    /// 체크 종료. `Checking` 일 때만 `Ready`/`Error` 로 바꿉니다.
    pub fn finish_check(&mut self, ok: bool) {
        if self.phase != LifecyclePhase::Checking {
            return;
        }
        self.set_phase(if ok {
            LifecyclePhase::Ready
        } else {
            LifecyclePhase::Error
        });
    }

    // ─── 명령 ─────────────────────────────────────────

    /// 명령이 현재 phase 에서 허용되는지
    pub fn gate(&self, command: Command) -> Result<(), LauncherError> {
        if command.allowed_in(self.phase) {
            Ok(())
        } else {
            Err(LauncherError::rejected(command.name(), self.phase))
        }
    }

    /// 설치/업데이트 시작. 낙관적으로 Downloading 으로 전환하고 snapshot 초기화
    pub fn begin_transfer(&mut self) -> Result<(), LauncherError> {
        self.gate(Command::Start)?;
        self.progress = ProgressSnapshot::default();
        self.set_phase(LifecyclePhase::Downloading);
        Ok(())
    }

    // ─── 이벤트 ───────────────────────────────────────

    pub fn apply_stage(&mut self, event: &StageEvent) -> Reaction {
        if !event.stage.valid_from(self.phase) {
            tracing::debug!(
                "[Lifecycle] ignoring {:?} event while {}",
                event.stage,
                self.phase
            );
            return Reaction::ignored();
        }

        let mut reaction = Reaction {
            changed: true,
            ..Reaction::default()
        };

        match event.stage {
            Stage::Download => {
                let p = &mut self.progress;
                if let Some(downloaded) = event.downloaded {
                    p.bytes_transferred = downloaded;
                }
                if let Some(total) = event.total {
                    p.bytes_total = total;
                }
                p.eta_seconds = event.eta_seconds;
                p.throughput_bytes_per_second = event.throughput_bytes_per_second;
                p.complete = false;
            }
            Stage::Extract => {
                reaction.log = Some((Severity::Info, "extraction started".to_string()));
            }
            Stage::Paused => {}
            Stage::Canceled => {
                self.progress = ProgressSnapshot::default();
                reaction.log = Some((Severity::Warn, "download canceled".to_string()));
            }
            Stage::Failed => {
                self.progress = ProgressSnapshot::default();
                reaction.log = Some((Severity::Warn, "installation failed, ready to retry".to_string()));
            }
            Stage::Done => {
                let p = &mut self.progress;
                p.complete = true;
                p.eta_seconds = Some(0);
                if p.bytes_total > 0 {
                    p.bytes_transferred = p.bytes_total;
                }
                reaction.log = Some((Severity::Ok, "installation complete".to_string()));
                reaction.recheck = true;
            }
        }

        self.set_phase(event.stage.target());
        reaction
    }

    /// 오류는 어느 단계에서든 받아들이며 phase 는 바뀌지 않습니다.
    pub fn apply_fault(&mut self, event: &FaultEvent) -> Reaction {
        Reaction {
            changed: false,
            log: Some((Severity::Error, event.description.clone())),
            recheck: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(phase: LifecyclePhase) -> DownloadLifecycle {
        DownloadLifecycle {
            phase,
            progress: ProgressSnapshot::default(),
        }
    }

    #[test]
    fn download_from_paused_resumes() {
        let mut lc = at(LifecyclePhase::Paused);
        let r = lc.apply_stage(&StageEvent::download(10, 100));
        assert!(r.changed);
        assert_eq!(lc.phase(), LifecyclePhase::Downloading);
        assert_eq!(lc.progress().bytes_transferred, 10);
    }

    #[test]
    fn canceled_resets_snapshot() {
        let mut lc = at(LifecyclePhase::Ready);
        lc.begin_transfer().unwrap();
        lc.apply_stage(&StageEvent::download(40, 100));
        let r = lc.apply_stage(&StageEvent::stage(Stage::Canceled));
        assert_eq!(lc.phase(), LifecyclePhase::Ready);
        assert_eq!(lc.progress(), &ProgressSnapshot::default());
        assert_eq!(r.log.map(|(s, _)| s), Some(Severity::Warn));
    }

    #[test]
    fn failure_returns_to_ready_from_any_transfer_phase() {
        for phase in [
            LifecyclePhase::Downloading,
            LifecyclePhase::Paused,
            LifecyclePhase::Extracting,
        ] {
            let mut lc = at(phase);
            lc.progress.bytes_transferred = 70;
            let r = lc.apply_stage(&StageEvent::stage(Stage::Failed));
            assert_eq!(lc.phase(), LifecyclePhase::Ready);
            assert_eq!(lc.progress(), &ProgressSnapshot::default());
            let (severity, text) = r.log.unwrap();
            assert_eq!(severity, Severity::Warn);
            assert_ne!(text, "download canceled");
        }

        let mut lc = at(LifecyclePhase::Done);
        assert!(!lc.apply_stage(&StageEvent::stage(Stage::Failed)).changed);
        assert_eq!(lc.phase(), LifecyclePhase::Done);
    }

    #[test]
    fn done_from_extracting_is_complete() {
        let mut lc = at(LifecyclePhase::Downloading);
        lc.apply_stage(&StageEvent::download(30, 100));
        lc.apply_stage(&StageEvent::stage(Stage::Extract));
        assert_eq!(lc.phase(), LifecyclePhase::Extracting);
        // 압축 해제 중에도 진행률은 유지
        assert_eq!(lc.progress().bytes_transferred, 30);

        let r = lc.apply_stage(&StageEvent::stage(Stage::Done));
        assert_eq!(lc.phase(), LifecyclePhase::Done);
        assert_eq!(lc.progress().percent(), 100.0);
        assert_eq!(lc.progress().eta_seconds, Some(0));
        assert!(r.recheck);
        assert_eq!(r.log.map(|(s, _)| s), Some(Severity::Ok));
    }

    #[test]
    fn done_with_unknown_total_still_reports_full() {
        let mut lc = at(LifecyclePhase::Downloading);
        lc.apply_stage(&StageEvent::stage(Stage::Done));
        assert_eq!(lc.progress().percent(), 100.0);
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let mut lc = at(LifecyclePhase::Idle);
        assert!(!lc.apply_stage(&StageEvent::download(1, 2)).changed);
        assert!(!lc.apply_stage(&StageEvent::stage(Stage::Done)).changed);
        assert_eq!(lc.phase(), LifecyclePhase::Idle);

        let mut lc = at(LifecyclePhase::Paused);
        assert!(!lc.apply_stage(&StageEvent::stage(Stage::Extract)).changed);
        assert!(!lc.apply_stage(&StageEvent::stage(Stage::Paused)).changed);
        assert_eq!(lc.phase(), LifecyclePhase::Paused);

        let mut lc = at(LifecyclePhase::Done);
        assert!(!lc.apply_stage(&StageEvent::stage(Stage::Canceled)).changed);
        assert_eq!(lc.phase(), LifecyclePhase::Done);
    }

    #[test]
    fn fault_never_changes_phase() {
        for phase in [
            LifecyclePhase::Idle,
            LifecyclePhase::Downloading,
            LifecyclePhase::Extracting,
            LifecyclePhase::Done,
        ] {
            let mut lc = at(phase);
            let r = lc.apply_fault(&FaultEvent::new("disk full"));
            assert_eq!(lc.phase(), phase);
            assert_eq!(r.log, Some((Severity::Error, "disk full".to_string())));
        }
    }

    #[test]
    fn percent_is_zero_when_total_unknown() {
        let p = ProgressSnapshot {
            bytes_transferred: 500,
            ..Default::default()
        };
        assert_eq!(p.percent(), 0.0);
        let p = ProgressSnapshot {
            bytes_transferred: 50,
            bytes_total: 100,
            ..Default::default()
        };
        assert_eq!(p.percent(), 50.0);
    }

    #[test]
    fn command_gates() {
        let lc = at(LifecyclePhase::Checking);
        assert!(lc.gate(Command::Start).is_err());
        assert!(lc.gate(Command::Pause).is_err());

        let lc = at(LifecyclePhase::Downloading);
        assert!(lc.gate(Command::Pause).is_ok());
        assert!(lc.gate(Command::Cancel).is_ok());
        assert!(lc.gate(Command::Resume).is_err());
        assert!(lc.gate(Command::Start).is_err());

        let lc = at(LifecyclePhase::Paused);
        assert!(lc.gate(Command::Resume).is_ok());
        assert!(lc.gate(Command::Cancel).is_ok());

        for phase in [
            LifecyclePhase::Idle,
            LifecyclePhase::Ready,
            LifecyclePhase::Done,
            LifecyclePhase::Error,
        ] {
            assert!(at(phase).gate(Command::Start).is_ok());
        }
    }

    #[test]
    fn check_does_not_touch_active_transfer() {
        let mut lc = at(LifecyclePhase::Ready);
        lc.begin_transfer().unwrap();
        lc.apply_stage(&StageEvent::download(5, 10));
        assert!(!lc.begin_check());
        lc.finish_check(false);
        assert_eq!(lc.phase(), LifecyclePhase::Downloading);
        assert_eq!(lc.progress().bytes_transferred, 5);
    }

    #[test]
    fn check_cycle_phases() {
        let mut lc = DownloadLifecycle::new();
        assert!(lc.begin_check());
        assert_eq!(lc.phase(), LifecyclePhase::Checking);
        lc.finish_check(true);
        assert_eq!(lc.phase(), LifecyclePhase::Ready);
        assert!(lc.begin_check());
        lc.finish_check(false);
        assert_eq!(lc.phase(), LifecyclePhase::Error);
    }

    #[test]
    fn legacy_event_keys_are_accepted() {
        let ev: StageEvent = serde_json::from_str(
            r#"{"stage":"download","downloaded":10,"total":20,"eta_secs":null,"speed_bps":512.0}"#,
        )
        .unwrap();
        assert_eq!(ev.eta_seconds, None);
        assert_eq!(ev.throughput_bytes_per_second, Some(512.0));

        let ev: StageEvent =
            serde_json::from_str(r#"{"stage":"download","etaSeconds":7}"#).unwrap();
        assert_eq!(ev.eta_seconds, Some(7));

        let fault: FaultEvent = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert_eq!(fault.description, "boom");
    }
}
