//! # PNW 런처 업데이터 라이브러리
//!
//! 단일 제품(게임)의 설치/업데이트 상태를 판정하고, 실행기가 수행하는
//! 다운로드 → 압축 해제 파이프라인을 관찰 가능한 상태로 정리합니다.
//!
//! ## 동작 원리
//! - **체크 사이클**: 원격 릴리스 디스크립터와 로컬 설치 정보를 동시에 조회해
//!   `NotInstalled` / `UpToDate` / `UpdateAvailable` 중 하나로 판정
//! - **라이프사이클**: 실행기 이벤트 스트림을 `Idle … Done` phase 로 축약
//! - **이벤트 로그**: 중복 억제, 크기 제한이 있는 사용자용 상태 기록
//! - **스케줄러**: 시작 시, 주기적으로(기본 5분), 화면 복귀 시 재확인
//!
//! ## 모듈
//! - **version.rs**: 점 구분 숫자 버전 비교
//! - **manifest.rs**: 원격 manifest.json 정규화 및 HTTP 조회
//! - **install.rs**: 설치 상태 판정
//! - **event_log.rs**: 상태 로그
//! - **lifecycle.rs**: 다운로드 라이프사이클 상태 머신
//! - **executor.rs**: 실행기 인터페이스와 이벤트 채널
//! - **local.rs**: 로컬 머신용 실행기 (reqwest + zip)
//! - **orchestrator.rs**: 체크 사이클, 명령, 리듀서 루프
//! - **scheduler.rs**: 재확인 스케줄
//! - **snapshot.rs**: 표시 계층용 스냅샷
//! - **config.rs**: `config/launcher.toml`
//!
//! ## manifest.json
//! ```json
//! {
//!   "version": "1.2.0",
//!   "downloadUrl": "https://example.com/pnw-1.2.0.zip",
//!   "game_exe": "Game.exe",
//!   "folder": "Pokemon New World"
//! }
//! ```
//! 예전 형식의 `zip_url` 도 받아들입니다.

// ══════════════════════════════════════════════════════
// 모듈
// ══════════════════════════════════════════════════════

pub mod config;
pub mod error;
pub mod event_log;
pub mod executor;
pub mod install;
pub mod lifecycle;
pub mod local;
pub mod manifest;
pub mod orchestrator;
pub mod scheduler;
pub mod snapshot;
pub mod version;


// Re-exports for convenience
pub use config::{config_file_path, default_install_dir, set_config_value, LauncherConfig};
pub use error::{FetchError, LauncherError};
pub use event_log::{EventLog, LogEntry, Severity};
pub use executor::{event_channel, EventSink, EventStreams, Executor};
pub use install::{resolve, DetectionResult, InstallStatus, LocalInstallFacts};
pub use lifecycle::{
    DownloadLifecycle, FaultEvent, LifecyclePhase, ProgressSnapshot, Stage, StageEvent,
};
pub use local::LocalExecutor;
pub use manifest::{ManifestClient, ReleaseDescriptor};
pub use orchestrator::{Orchestrator, OrchestratorEvent, OrchestratorOptions};
pub use scheduler::{RecheckScheduler, SchedulerConfig};
pub use snapshot::{LauncherSnapshot, PrimaryAction, TransferControls};
