//! 업데이트 오케스트레이터
//!
//! ## 아키텍처
//! - 체크 사이클: 디스크립터와 로컬 정보를 동시에 조회 → 상태 판정 → 로그 한 줄
//! - 명령: phase 게이트를 통과한 경우에만 실행기로 전달
//! - 리듀서 루프: 실행기 이벤트 두 스트림을 하나의 태스크에서 순서대로 적용
//! - 관찰: `watch` 로 최신 스냅샷, `broadcast` 로 개별 이벤트
//!
//! 체크 사이클은 single-flight 입니다. 진행 중에 들어온 요청은 몇 개든
//! 끝난 뒤 한 번의 후속 사이클로 합쳐집니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::{broadcast, watch, RwLock};

use crate::config::LauncherConfig;
use crate::error::LauncherError;
use crate::event_log::{EventLog, LogEntry, Severity, DEFAULT_LOG_CAPACITY};
use crate::executor::{event_channel, EventSink, EventStreams, Executor};
use crate::install::{self, InstallStatus, LocalInstallFacts};
use crate::lifecycle::{Command, DownloadLifecycle, LifecyclePhase, ProgressSnapshot, Reaction};
use crate::manifest::ReleaseDescriptor;
use crate::snapshot::LauncherSnapshot;

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub manifest_url: String,
    pub default_executable: String,
    pub log_capacity: usize,
    /// false 면 전송 중에는 체크 사이클 자체를 건너뜀
    pub checks_during_transfer: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            manifest_url: String::new(),
            default_executable: "Game.exe".to_string(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            checks_during_transfer: true,
        }
    }
}

impl From<&LauncherConfig> for OrchestratorOptions {
    fn from(cfg: &LauncherConfig) -> Self {
        Self {
            manifest_url: cfg.manifest_url.clone(),
            default_executable: cfg.default_executable.clone(),
            log_capacity: cfg.log_capacity,
            checks_during_transfer: cfg.checks_during_transfer,
        }
    }
}

/// 구독자에게 브로드캐스트되는 개별 이벤트
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrchestratorEvent {
    PhaseChanged {
        from: LifecyclePhase,
        to: LifecyclePhase,
    },
    Progress(ProgressSnapshot),
    Logged(LogEntry),
    CheckCompleted {
        status: InstallStatus,
    },
    CheckFailed {
        error: String,
        /// 다음 예정된 체크에서 나아질 수 있는 실패인지 (네트워크, 타임아웃, 5xx)
        recoverable: bool,
    },
}

#[derive(Debug, Default)]
struct Shared {
    lifecycle: DownloadLifecycle,
    descriptor: Option<ReleaseDescriptor>,
    facts: Option<LocalInstallFacts>,
    status: Option<InstallStatus>,
    log: EventLog,
}

struct Inner<E: Executor> {
    executor: E,
    options: OrchestratorOptions,
    state: RwLock<Shared>,
    sink: EventSink,
    snapshot_tx: watch::Sender<LauncherSnapshot>,
    events_tx: broadcast::Sender<OrchestratorEvent>,
    check_in_flight: AtomicBool,
    check_pending: AtomicBool,
}

/// 오케스트레이터 핸들. 복제해도 같은 상태를 공유합니다.
pub struct Orchestrator<E: Executor> {
    inner: Arc<Inner<E>>,
}

impl<E: Executor> Clone for Orchestrator<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Executor> Orchestrator<E> {
    /// 오케스트레이터 생성 및 리듀서 루프 시작 (tokio 런타임 안에서 호출)
    pub fn spawn(executor: E, options: OrchestratorOptions) -> Self {
        let (sink, streams) = event_channel();
        let (snapshot_tx, _) = watch::channel(LauncherSnapshot::default());
        let (events_tx, _) = broadcast::channel(256);

        let shared = Shared {
            log: EventLog::with_capacity(options.log_capacity),
            ..Shared::default()
        };

        let inner = Arc::new(Inner {
            executor,
            options,
            state: RwLock::new(shared),
            sink,
            snapshot_tx,
            events_tx,
            check_in_flight: AtomicBool::new(false),
            check_pending: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&inner);
        tokio::spawn(async move {
            reducer_loop(weak, streams).await;
        });

        Self { inner }
    }

    pub fn executor(&self) -> &E {
        &self.inner.executor
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.inner.options
    }

    // ─── 관찰 ─────────────────────────────────────────

    pub fn subscribe(&self) -> watch::Receiver<LauncherSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.inner.events_tx.subscribe()
    }

    pub fn snapshot(&self) -> LauncherSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub async fn phase(&self) -> LifecyclePhase {
        self.inner.state.read().await.lifecycle.phase()
    }

    pub async fn progress(&self) -> ProgressSnapshot {
        self.inner.state.read().await.lifecycle.progress().clone()
    }

    pub async fn install_status(&self) -> Option<InstallStatus> {
        self.inner.state.read().await.status
    }

    pub async fn descriptor(&self) -> Option<ReleaseDescriptor> {
        self.inner.state.read().await.descriptor.clone()
    }

    pub async fn log_entries(&self) -> Vec<LogEntry> {
        self.inner.state.read().await.log.snapshot()
    }

    pub async fn clear_log(&self) {
        let mut st = self.inner.state.write().await;
        st.log.clear();
        self.inner.publish(&st);
    }

    // ─── 체크 사이클 ───────────────────────────────────

    /// 체크 사이클 실행
    ///
    /// 이미 진행 중이면 후속 사이클을 예약하고 `Ok(None)` 을 즉시 돌려줍니다.
    /// 예약된 후속 사이클은 진행 중인 호출자 쪽에서 이어서 실행됩니다.
    ///
    /// 사이클은 별도 태스크에서 돌기 때문에 호출자가 중단(abort)되어도 끝까지 진행됩니다.
    pub async fn run_check(&self) -> Result<Option<InstallStatus>, LauncherError> {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.single_flight_check().await })
            .await
            .map_err(|e| LauncherError::CheckAborted(e.to_string()))?
    }

    /// 백그라운드에서 체크 사이클 요청 (결과는 로그/이벤트로만)
    pub fn request_check(&self) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            let _ = inner.single_flight_check().await;
        });
    }

    // ─── 명령 ─────────────────────────────────────────

    /// 설치/업데이트 시작
    pub async fn start_install_or_update(&self) -> Result<(), LauncherError> {
        let inner = &self.inner;
        let descriptor = {
            let mut st = inner.state.write().await;

            if let Err(e) = st.lifecycle.gate(Command::Start) {
                inner.log_locked(&mut st, Severity::Error, e.to_string());
                inner.publish(&st);
                return Err(e);
            }

            let descriptor = match st.descriptor.clone() {
                Some(d) if d.has_transfer_url() => d,
                Some(_) => {
                    let e = LauncherError::ConfigurationFailure(
                        "release descriptor has no download URL".to_string(),
                    );
                    inner.log_locked(&mut st, Severity::Error, e.to_string());
                    inner.publish(&st);
                    return Err(e);
                }
                None => {
                    let e = LauncherError::ConfigurationFailure(
                        "no release descriptor yet, run a check first".to_string(),
                    );
                    inner.log_locked(&mut st, Severity::Error, e.to_string());
                    inner.publish(&st);
                    return Err(e);
                }
            };

            let before = st.lifecycle.phase();
            st.lifecycle.begin_transfer()?;
            inner.log_locked(
                &mut st,
                Severity::Info,
                format!("downloading version {}", descriptor.version),
            );
            inner.phase_changed(before, st.lifecycle.phase());
            inner.publish(&st);
            descriptor
        };

        tracing::info!(
            "[Orchestrator] Dispatching transfer of {} from {}",
            descriptor.version,
            descriptor.transfer_url
        );
        inner
            .executor
            .start_transfer_and_install(descriptor, inner.sink.clone());
        Ok(())
    }

    pub async fn pause(&self) -> Result<(), LauncherError> {
        self.inner.gated(Command::Pause).await?;
        self.inner.executor.pause_transfer();
        Ok(())
    }

    pub async fn resume(&self) -> Result<(), LauncherError> {
        self.inner.gated(Command::Resume).await?;
        self.inner.executor.resume_transfer();
        Ok(())
    }

    /// 취소 요청. 실행기가 `canceled` 를 보내기 전까지 phase 는 그대로입니다.
    pub async fn cancel(&self) -> Result<(), LauncherError> {
        self.inner.gated(Command::Cancel).await?;
        self.inner.executor.cancel_transfer();
        Ok(())
    }

    /// 게임 실행. 설치되어 있으면 phase 와 무관하게 허용됩니다.
    ///
    /// 실행 실패는 로그로만 남기고 `Ok(false)` 를 돌려줍니다.
    pub async fn launch(&self) -> Result<bool, LauncherError> {
        let inner = &self.inner;
        let exe = {
            let mut st = inner.state.write().await;
            let installed = st.status.map(|s| s.is_installed()).unwrap_or(false);
            if !installed {
                let e = LauncherError::rejected("launch", "not installed");
                inner.log_locked(&mut st, Severity::Error, e.to_string());
                inner.publish(&st);
                return Err(e);
            }
            st.descriptor
                .as_ref()
                .map(|d| d.executable_or(&inner.options.default_executable).to_string())
                .unwrap_or_else(|| inner.options.default_executable.clone())
        };

        let result = inner.executor.launch_product(&exe).await;

        let mut st = inner.state.write().await;
        let launched = match result {
            Ok(()) => {
                inner.log_locked(&mut st, Severity::Ok, format!("launched {}", exe));
                true
            }
            Err(e) => {
                inner.log_locked(&mut st, Severity::Error, e.to_string());
                false
            }
        };
        inner.publish(&st);
        Ok(launched)
    }

    /// 폴더 선택 결과 반영. `None` 은 선택 창을 닫은 경우입니다.
    pub async fn choose_install_directory(
        &self,
        path: Option<String>,
    ) -> Result<(), LauncherError> {
        let Some(path) = path else {
            self.inner.log(Severity::Info, "folder selection canceled").await;
            return Ok(());
        };

        match self.inner.executor.set_install_directory(&path).await {
            Ok(()) => {
                self.inner
                    .log(Severity::Info, format!("install directory: {}", path))
                    .await;
                self.run_check().await?;
                Ok(())
            }
            Err(e) => {
                self.inner.log(Severity::Error, e.to_string()).await;
                Err(e)
            }
        }
    }

    /// 설치 폴더 자동 탐색. 찾으면 저장하고 다시 확인합니다.
    pub async fn autodetect_install_directory(&self) -> Result<Option<String>, LauncherError> {
        let hint = self.descriptor().await;
        let result = self
            .inner
            .executor
            .autodetect_install_directory(hint.as_ref())
            .await;

        match (result.found, result.path) {
            (true, Some(path)) => {
                if let Err(e) = self.inner.executor.set_install_directory(&path).await {
                    self.inner.log(Severity::Error, e.to_string()).await;
                    return Err(e);
                }
                self.inner
                    .log(Severity::Ok, format!("install directory detected: {}", path))
                    .await;
                self.run_check().await?;
                Ok(Some(path))
            }
            _ => {
                let reason = result.reason.unwrap_or_else(|| "not found".to_string());
                self.inner
                    .log(
                        Severity::Warn,
                        format!("no install directory detected ({})", reason),
                    )
                    .await;
                Ok(None)
            }
        }
    }
}

impl<E: Executor> Inner<E> {
    async fn single_flight_check(&self) -> Result<Option<InstallStatus>, LauncherError> {
        if self.check_in_flight.swap(true, Ordering::AcqRel) {
            self.check_pending.store(true, Ordering::Release);
            tracing::debug!("[Orchestrator] Check already in flight, follow-up queued");
            return Ok(None);
        }

        let mut guard = InFlightCheck {
            inner: self,
            completed: false,
        };
        loop {
            let outcome = self.check_cycle().await;

            if self.check_pending.swap(false, Ordering::AcqRel) {
                continue;
            }
            self.check_in_flight.store(false, Ordering::Release);

            // swap 과 store 사이에 들어온 요청
            if self.check_pending.load(Ordering::Acquire)
                && !self.check_in_flight.swap(true, Ordering::AcqRel)
            {
                self.check_pending.store(false, Ordering::Release);
                continue;
            }
            guard.completed = true;
            return outcome;
        }
    }

    async fn check_cycle(&self) -> Result<Option<InstallStatus>, LauncherError> {
        {
            let mut st = self.state.write().await;
            let before = st.lifecycle.phase();
            let touched = st.lifecycle.begin_check();
            if !touched && !self.options.checks_during_transfer {
                tracing::debug!("[Orchestrator] Transfer active ({}), check skipped", before);
                return Ok(None);
            }
            self.phase_changed(before, st.lifecycle.phase());
            self.publish(&st);
        }

        tracing::info!("[Orchestrator] Checking {}", self.options.manifest_url);
        let (descriptor, facts) = tokio::join!(
            self.executor.fetch_release_descriptor(&self.options.manifest_url),
            self.executor.local_install_facts(),
        );

        let mut st = self.state.write().await;
        let before = st.lifecycle.phase();

        let outcome = match (descriptor, facts) {
            (Ok(descriptor), Ok(facts)) => {
                let status = install::resolve(Some(&descriptor), &facts);
                let (severity, line) = status_line(status, &facts, &descriptor);

                st.descriptor = Some(descriptor);
                st.facts = Some(facts);
                st.status = Some(status);
                self.log_locked(&mut st, severity, line);
                st.lifecycle.finish_check(true);

                let _ = self.events_tx.send(OrchestratorEvent::CheckCompleted { status });
                Ok(Some(status))
            }
            (Err(e), _) | (_, Err(e)) => {
                let recoverable = e.is_recoverable();
                tracing::debug!("[Orchestrator] Check failed (recoverable: {})", recoverable);
                self.log_locked(&mut st, Severity::Error, e.to_string());
                st.lifecycle.finish_check(false);

                let _ = self.events_tx.send(OrchestratorEvent::CheckFailed {
                    error: e.to_string(),
                    recoverable,
                });
                Err(LauncherError::from(e))
            }
        };

        self.phase_changed(before, st.lifecycle.phase());
        self.publish(&st);
        outcome
    }

    async fn gated(&self, command: Command) -> Result<(), LauncherError> {
        let mut st = self.state.write().await;
        if let Err(e) = st.lifecycle.gate(command) {
            self.log_locked(&mut st, Severity::Error, e.to_string());
            self.publish(&st);
            return Err(e);
        }
        tracing::info!("[Orchestrator] {} requested", command.name());
        Ok(())
    }

    fn apply(&self, st: &mut Shared, reaction: Reaction, before: LifecyclePhase) {
        if let Some((severity, text)) = reaction.log {
            self.log_locked(st, severity, text);
        }
        if reaction.changed {
            let _ = self
                .events_tx
                .send(OrchestratorEvent::Progress(st.lifecycle.progress().clone()));
        }
        self.phase_changed(before, st.lifecycle.phase());
        self.publish(st);
    }

    async fn log(&self, severity: Severity, text: impl Into<String>) {
        let mut st = self.state.write().await;
        self.log_locked(&mut st, severity, text);
        self.publish(&st);
    }

    fn log_locked(&self, st: &mut Shared, severity: Severity, text: impl Into<String>) {
        let text = text.into();
        match severity {
            Severity::Error => tracing::error!("[Orchestrator] {}", text),
            Severity::Warn => tracing::warn!("[Orchestrator] {}", text),
            Severity::Info | Severity::Ok => tracing::info!("[Orchestrator] {}", text),
        }
        if let Some(entry) = st.log.append(text, severity) {
            let _ = self.events_tx.send(OrchestratorEvent::Logged(entry.clone()));
        }
    }

    fn phase_changed(&self, from: LifecyclePhase, to: LifecyclePhase) {
        if from != to {
            let _ = self.events_tx.send(OrchestratorEvent::PhaseChanged { from, to });
        }
    }

    fn publish(&self, st: &Shared) {
        let snapshot = LauncherSnapshot::build(
            st.lifecycle.phase(),
            st.lifecycle.progress(),
            st.descriptor.as_ref(),
            st.facts.as_ref(),
            st.status,
            st.log.snapshot(),
        );
        self.snapshot_tx.send_replace(snapshot);
    }
}

/// 사이클이 끝나지 못하고 사라졌을 때(패닉) single-flight 플래그와 `Checking` 을 되돌림
struct InFlightCheck<'a, E: Executor> {
    inner: &'a Inner<E>,
    completed: bool,
}

impl<E: Executor> Drop for InFlightCheck<'_, E> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let inner = self.inner;
        inner.check_in_flight.store(false, Ordering::Release);
        inner.check_pending.store(false, Ordering::Release);
        tracing::warn!("[Orchestrator] Check cycle ended abnormally, releasing");

        if let Ok(mut st) = inner.state.try_write() {
            let before = st.lifecycle.phase();
            st.lifecycle.finish_check(false);
            inner.phase_changed(before, st.lifecycle.phase());
            inner.publish(&st);
        }
    }
}

fn status_line(
    status: InstallStatus,
    facts: &LocalInstallFacts,
    descriptor: &ReleaseDescriptor,
) -> (Severity, String) {
    let local = facts.local_version.as_deref().unwrap_or("unknown");
    match status {
        InstallStatus::NotInstalled => (Severity::Warn, "product not installed".to_string()),
        InstallStatus::UpdateAvailable => (
            Severity::Warn,
            format!("update available: {} -> {}", local, descriptor.version),
        ),
        InstallStatus::UpToDate => (Severity::Ok, format!("up to date ({})", local)),
    }
}

/// 실행기 이벤트 리듀서
///
/// 오케스트레이터 핸들이 모두 사라지면 종료합니다.
async fn reducer_loop<E: Executor>(inner: Weak<Inner<E>>, mut streams: EventStreams) {
    tracing::debug!("[Lifecycle] Reducer loop started");

    loop {
        tokio::select! {
            Some(event) = streams.stages.recv() => {
                let Some(inner) = inner.upgrade() else { break };
                let recheck = {
                    let mut st = inner.state.write().await;
                    let before = st.lifecycle.phase();
                    let reaction = st.lifecycle.apply_stage(&event);
                    let recheck = reaction.recheck;
                    inner.apply(&mut st, reaction, before);
                    recheck
                };
                if recheck {
                    tracing::info!("[Lifecycle] Transfer finished, scheduling recheck");
                    Orchestrator { inner }.request_check();
                }
            }
            Some(fault) = streams.faults.recv() => {
                let Some(inner) = inner.upgrade() else { break };
                let mut st = inner.state.write().await;
                let before = st.lifecycle.phase();
                let reaction = st.lifecycle.apply_fault(&fault);
                inner.apply(&mut st, reaction, before);
            }
            else => break,
        }
    }

    tracing::debug!("[Lifecycle] Reducer loop stopped");
}
