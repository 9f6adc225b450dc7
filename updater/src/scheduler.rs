//! 재확인 스케줄러
//!
//! ## 트리거
//! 1. 시작 직후 한 번
//! 2. 고정 간격 (기본 5분)
//! 3. 화면이 다시 보이게 되었을 때 즉시
//!
//! 겹치는 요청은 오케스트레이터의 single-flight 가 정리합니다.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::LauncherConfig;
use crate::executor::Executor;
use crate::orchestrator::Orchestrator;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            enabled: true,
        }
    }
}

impl From<&LauncherConfig> for SchedulerConfig {
    fn from(cfg: &LauncherConfig) -> Self {
        Self {
            interval: Duration::from_secs(cfg.check_interval_secs),
            enabled: cfg.check_interval_secs > 0,
        }
    }
}

pub struct RecheckScheduler<E: Executor> {
    orchestrator: Orchestrator<E>,
    config: SchedulerConfig,
    visible: AtomicBool,
    handle: Option<JoinHandle<()>>,
}

impl<E: Executor> RecheckScheduler<E> {
    pub fn new(orchestrator: Orchestrator<E>, config: SchedulerConfig) -> Self {
        Self {
            orchestrator,
            config,
            visible: AtomicBool::new(true),
            handle: None,
        }
    }

    /// 시작 체크 + 주기 체크 태스크 시작
    pub fn start(&mut self) {
        self.stop();

        if !self.config.enabled || self.config.interval.is_zero() {
            tracing::info!("[Scheduler] Periodic check disabled, running startup check only");
            self.orchestrator.request_check();
            return;
        }

        let orchestrator = self.orchestrator.clone();
        let period = self.config.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // 첫 tick 은 즉시 완료되므로 시작 체크가 됨
                ticker.tick().await;
                tracing::debug!("[Scheduler] Periodic check triggered");
                let _ = orchestrator.run_check().await;
            }
        });

        self.handle = Some(handle);
        tracing::info!(
            "[Scheduler] Started (every {}s)",
            self.config.interval.as_secs()
        );
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::info!("[Scheduler] Stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// 표시 여부 변경 통지. 숨김 → 보임 전환에서만 즉시 체크합니다.
    pub fn visibility_changed(&self, visible: bool) {
        let was_visible = self.visible.swap(visible, Ordering::AcqRel);
        if visible && !was_visible {
            tracing::info!("[Scheduler] Visibility regained, checking now");
            self.orchestrator.request_check();
        }
    }
}

impl<E: Executor> Drop for RecheckScheduler<E> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
