//! 실행기 인터페이스
//!
//! 네트워크 전송, 디스크 쓰기, 압축 해제, 실행은 모두 실행기의 몫입니다.
//! 오케스트레이터는 명령을 보내고, 결과는 `EventSink` 로 들어오는 이벤트로만 받습니다.

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::{FetchError, LauncherError};
use crate::install::{DetectionResult, LocalInstallFacts};
use crate::lifecycle::{FaultEvent, Stage, StageEvent};
use crate::manifest::ReleaseDescriptor;

/// 실행기가 이벤트를 흘려보내는 송신측
#[derive(Debug, Clone)]
pub struct EventSink {
    stages: mpsc::UnboundedSender<StageEvent>,
    faults: mpsc::UnboundedSender<FaultEvent>,
}

/// 오케스트레이터의 리듀서 루프가 소비하는 수신측
#[derive(Debug)]
pub struct EventStreams {
    pub stages: mpsc::UnboundedReceiver<StageEvent>,
    pub faults: mpsc::UnboundedReceiver<FaultEvent>,
}

pub fn event_channel() -> (EventSink, EventStreams) {
    let (stage_tx, stage_rx) = mpsc::unbounded_channel();
    let (fault_tx, fault_rx) = mpsc::unbounded_channel();
    (
        EventSink {
            stages: stage_tx,
            faults: fault_tx,
        },
        EventStreams {
            stages: stage_rx,
            faults: fault_rx,
        },
    )
}

impl EventSink {
    pub fn emit(&self, event: StageEvent) {
        if self.stages.send(event).is_err() {
            tracing::debug!("[Executor] stage stream closed, event dropped");
        }
    }

    pub fn stage(&self, stage: Stage) {
        self.emit(StageEvent::stage(stage));
    }

    pub fn fault(&self, description: impl Into<String>) {
        if self.faults.send(FaultEvent::new(description)).is_err() {
            tracing::debug!("[Executor] fault stream closed, event dropped");
        }
    }
}

/// 실행 백엔드
///
/// 전송 제어 명령(`start`/`pause`/`resume`/`cancel`)은 결과를 기다리지 않습니다.
/// 성공/실패는 모두 `EventSink` 를 통해 이벤트로 돌아와야 합니다.
pub trait Executor: Send + Sync + 'static {
    fn fetch_release_descriptor(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<ReleaseDescriptor, FetchError>> + Send;

    fn local_install_facts(&self) -> impl Future<Output = Result<LocalInstallFacts, FetchError>> + Send;

    fn set_install_directory(&self, path: &str) -> impl Future<Output = Result<(), LauncherError>> + Send;

    /// `hint` 는 마지막으로 받은 디스크립터 (실행 파일 이름, 하위 폴더)
    fn autodetect_install_directory(
        &self,
        hint: Option<&ReleaseDescriptor>,
    ) -> impl Future<Output = DetectionResult> + Send;

    fn start_transfer_and_install(&self, descriptor: ReleaseDescriptor, sink: EventSink);

    fn pause_transfer(&self);

    fn resume_transfer(&self);

    fn cancel_transfer(&self);

    fn launch_product(&self, executable_name: &str) -> impl Future<Output = Result<(), LauncherError>> + Send;
}
