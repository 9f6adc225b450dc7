//! 로컬 머신용 실행기
//!
//! ## 동작
//! - 디스크립터: HTTP GET (`ManifestClient`)
//! - 로컬 정보: 설치 폴더의 버전 파일 + 실행 파일 재귀 탐색
//! - 전송: 스트리밍 다운로드 → 세이브 백업 → zip 압축 해제 → 버전 파일 기록
//! - 일시정지/재개/취소: `watch` 제어 채널을 청크 사이마다 확인
//!
//! 모든 결과는 `EventSink` 로 보고합니다. 치명적 오류 뒤에는 `failed` 를 보내
//! 라이프사이클이 `Ready` 로 돌아가게 합니다.

use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::{watch, RwLock};
use walkdir::WalkDir;

use crate::config::{self, LauncherConfig};
use crate::error::{FetchError, LauncherError};
use crate::executor::{EventSink, Executor};
use crate::install::{DetectionResult, LocalInstallFacts};
use crate::lifecycle::{Stage, StageEvent};
use crate::manifest::{ManifestClient, ReleaseDescriptor};

/// 진행 이벤트 최소 간격
const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferControl {
    Run,
    Pause,
    Cancel,
}

enum TransferOutcome {
    Installed,
    Canceled,
}

pub struct LocalExecutor {
    config: Arc<RwLock<LauncherConfig>>,
    /// `set_install_directory` 결과를 저장할 설정 파일 (None 이면 메모리에만)
    config_path: Option<PathBuf>,
    manifest: ManifestClient,
    http: reqwest::Client,
    control: watch::Sender<TransferControl>,
    active: Arc<AtomicBool>,
    /// 마지막으로 받은 디스크립터의 실행 파일 이름
    known_executable: Arc<RwLock<Option<String>>>,
}

impl LocalExecutor {
    pub fn new(config: LauncherConfig, config_path: Option<PathBuf>) -> Result<Self, FetchError> {
        let manifest = ManifestClient::new(config.request_timeout_secs)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("pnw-launcher/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FetchError::Network {
                message: format!("HTTP client init failed: {}", e),
                recoverable: false,
            })?;
        let (control, _) = watch::channel(TransferControl::Run);

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
            manifest,
            http,
            control,
            active: Arc::new(AtomicBool::new(false)),
            known_executable: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn config(&self) -> LauncherConfig {
        self.config.read().await.clone()
    }

    async fn executable_name(&self) -> String {
        if let Some(name) = self.known_executable.read().await.clone() {
            return name;
        }
        self.config.read().await.default_executable.clone()
    }
}

impl Executor for LocalExecutor {
    async fn fetch_release_descriptor(&self, url: &str) -> Result<ReleaseDescriptor, FetchError> {
        let descriptor = self.manifest.fetch(url).await?;
        *self.known_executable.write().await = descriptor.executable_name.clone();
        tracing::info!("[Executor] Remote version {}", descriptor.version);
        Ok(descriptor)
    }

    async fn local_install_facts(&self) -> Result<LocalInstallFacts, FetchError> {
        let (dir, version_file) = {
            let cfg = self.config.read().await;
            (cfg.resolved_install_dir(), cfg.version_file.clone())
        };
        let exe = self.executable_name().await;

        let probe_dir = dir.clone();
        let (present, local_version) = tokio::task::spawn_blocking(move || {
            let present = find_executable(&probe_dir, &exe).is_some();
            let version = read_version_file(&probe_dir.join(&version_file));
            (present, version)
        })
        .await
        .map_err(|e| FetchError::Io {
            operation: "probe install directory".to_string(),
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;

        Ok(LocalInstallFacts {
            install_directory: dir.display().to_string(),
            product_present_on_disk: present,
            local_version,
        })
    }

    async fn set_install_directory(&self, path: &str) -> Result<(), LauncherError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(LauncherError::InstallDirectory("empty path".to_string()));
        }

        if let Some(cfg_path) = &self.config_path {
            config::set_config_value(cfg_path, "install_dir", path)
                .map_err(|e| LauncherError::InstallDirectory(format!("{:#}", e)))?;
        }
        self.config.write().await.install_dir = Some(path.to_string());
        tracing::info!("[Executor] Install directory set to {}", path);
        Ok(())
    }

    async fn autodetect_install_directory(&self, hint: Option<&ReleaseDescriptor>) -> DetectionResult {
        let cfg = self.config.read().await.clone();
        let exe = match hint.and_then(|d| d.executable_name.clone()) {
            Some(name) => name,
            None => self.executable_name().await,
        };
        let subfolder = hint.and_then(|d| d.target_subfolder.clone());

        let candidates = candidate_directories(&cfg, subfolder.as_deref());
        let count = candidates.len();

        let result = tokio::task::spawn_blocking(move || {
            for dir in candidates {
                if let Some(found) = find_executable(&dir, &exe) {
                    let root = found.parent().map(Path::to_path_buf).unwrap_or(dir);
                    return DetectionResult::found(root.display().to_string());
                }
            }
            DetectionResult::not_found(format!("{} not found in {} locations", exe, count))
        })
        .await;

        result.unwrap_or_else(|e| DetectionResult::not_found(e.to_string()))
    }

    fn start_transfer_and_install(&self, descriptor: ReleaseDescriptor, sink: EventSink) {
        if self.active.swap(true, Ordering::AcqRel) {
            sink.fault("install failed: a transfer is already running");
            sink.stage(Stage::Failed);
            return;
        }
        self.control.send_replace(TransferControl::Run);

        let job = TransferJob {
            config: self.config.clone(),
            http: self.http.clone(),
            control: self.control.subscribe(),
            known_executable: self.known_executable.clone(),
        };
        let mut guard = ActiveTransfer {
            active: self.active.clone(),
            sink,
            finished: false,
        };

        tokio::spawn(async move {
            let sink = guard.sink.clone();
            let outcome = job.run(&descriptor, &sink).await;
            // 종료 단계를 보내기 전에 풀어야 곧바로 다시 시작할 수 있음
            guard.release();
            match outcome {
                Ok(TransferOutcome::Installed) => sink.stage(Stage::Done),
                Ok(TransferOutcome::Canceled) => {
                    tracing::info!("[Executor] Transfer canceled");
                    sink.stage(Stage::Canceled);
                }
                Err(e) => {
                    tracing::error!("[Executor] Transfer failed: {:#}", e);
                    sink.fault(format!("install failed: {:#}", e));
                    sink.stage(Stage::Failed);
                }
            }
        });
    }

    fn pause_transfer(&self) {
        self.control.send_replace(TransferControl::Pause);
    }

    fn resume_transfer(&self) {
        self.control.send_replace(TransferControl::Run);
    }

    fn cancel_transfer(&self) {
        self.control.send_replace(TransferControl::Cancel);
    }

    async fn launch_product(&self, executable_name: &str) -> Result<(), LauncherError> {
        let dir = self.config.read().await.resolved_install_dir();
        let name = executable_name.to_string();
        let search_dir = dir.clone();

        let exe = tokio::task::spawn_blocking(move || find_executable(&search_dir, &name))
            .await
            .map_err(|e| LauncherError::LaunchFailure(e.to_string()))?
            .ok_or_else(|| {
                LauncherError::LaunchFailure(format!(
                    "{} not found in {}",
                    executable_name,
                    dir.display()
                ))
            })?;

        let workdir = exe.parent().map(Path::to_path_buf).unwrap_or(dir);
        std::process::Command::new(&exe)
            .current_dir(&workdir)
            .spawn()
            .map_err(|e| LauncherError::LaunchFailure(format!("{}: {}", exe.display(), e)))?;

        tracing::info!("[Executor] Launched {}", exe.display());
        Ok(())
    }
}

/// 전송 태스크가 끝나면(패닉/중단 포함) `active` 를 내림
///
/// 결과를 보고하지 못하고 사라진 경우 `failed` 를 대신 보내
/// 라이프사이클이 전송 단계에 갇히지 않게 합니다.
struct ActiveTransfer {
    active: Arc<AtomicBool>,
    sink: EventSink,
    finished: bool,
}

impl ActiveTransfer {
    fn release(&mut self) {
        self.finished = true;
        self.active.store(false, Ordering::Release);
    }
}

impl Drop for ActiveTransfer {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        if !self.finished {
            tracing::warn!("[Executor] Transfer task ended without a result");
            self.sink.fault("install failed: transfer task stopped unexpectedly");
            self.sink.stage(Stage::Failed);
        }
    }
}

/// 전송 태스크가 소유하는 상태
struct TransferJob {
    config: Arc<RwLock<LauncherConfig>>,
    http: reqwest::Client,
    control: watch::Receiver<TransferControl>,
    known_executable: Arc<RwLock<Option<String>>>,
}

impl TransferJob {
    async fn run(mut self, descriptor: &ReleaseDescriptor, sink: &EventSink) -> Result<TransferOutcome> {
        let cfg = self.config.read().await.clone();
        let target = cfg.resolved_install_dir();
        let staging = tempfile::tempdir().context("failed to create staging directory")?;
        let archive = staging.path().join("package.zip");

        tracing::info!(
            "[Executor] Downloading {} -> {}",
            descriptor.transfer_url,
            archive.display()
        );

        let inactivity = Duration::from_secs(cfg.download_timeout_secs);
        if let TransferOutcome::Canceled = self
            .download(&descriptor.transfer_url, &archive, inactivity, sink)
            .await?
        {
            return Ok(TransferOutcome::Canceled);
        }

        if *self.control.borrow() == TransferControl::Cancel {
            return Ok(TransferOutcome::Canceled);
        }

        sink.stage(Stage::Extract);

        let version = descriptor.version.clone();
        let backup_files = cfg.backup_files.clone();
        let version_file = cfg.version_file.clone();
        let extract_target = target.clone();
        let entries = tokio::task::spawn_blocking(move || -> Result<usize> {
            std::fs::create_dir_all(&extract_target)
                .with_context(|| format!("cannot create {}", extract_target.display()))?;
            if let Some(dir) = backup_saves(&extract_target, &backup_files)? {
                tracing::info!("[Executor] Saves backed up to {}", dir.display());
            }
            let n = extract_archive(&archive, &extract_target)?;
            std::fs::write(extract_target.join(&version_file), &version)
                .context("failed to write version file")?;
            Ok(n)
        })
        .await
        .context("extraction task panicked")??;

        if let Some(exe) = &descriptor.executable_name {
            *self.known_executable.write().await = Some(exe.clone());
        }
        tracing::info!(
            "[Executor] Installed {} ({} entries) into {}",
            descriptor.version,
            entries,
            target.display()
        );
        Ok(TransferOutcome::Installed)
    }

    async fn download(
        &mut self,
        url: &str,
        dest: &Path,
        inactivity: Duration,
        sink: &EventSink,
    ) -> Result<TransferOutcome> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;
        if !response.status().is_success() {
            anyhow::bail!("download failed: HTTP {}", response.status());
        }

        let total = response.content_length().unwrap_or(0);
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();

        let mut downloaded: u64 = 0;
        let mut window_start = Instant::now();
        let mut window_bytes: u64 = 0;
        let mut last_emit = Instant::now();

        sink.emit(StageEvent::download(0, total));

        loop {
            let control = *self.control.borrow_and_update();
            match control {
                TransferControl::Cancel => return Ok(TransferOutcome::Canceled),
                TransferControl::Pause => {
                    sink.stage(Stage::Paused);
                    if !self.wait_while_paused().await {
                        return Ok(TransferOutcome::Canceled);
                    }
                    // 일시정지 시간은 속도 계산에서 제외
                    window_start = Instant::now();
                    window_bytes = 0;
                    sink.emit(StageEvent::download(downloaded, total));
                }
                TransferControl::Run => {}
            }

            let chunk = tokio::select! {
                next = tokio::time::timeout(inactivity, stream.next()) => next,
                changed = self.control.changed() => {
                    if changed.is_err() {
                        return Ok(TransferOutcome::Canceled);
                    }
                    continue;
                }
            };

            let chunk = match chunk {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(e))) => return Err(e).context("download interrupted"),
                Ok(None) => break,
                Err(_) => anyhow::bail!(
                    "no data received for {}s ({}/{} bytes)",
                    inactivity.as_secs(),
                    downloaded,
                    total
                ),
            };

            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            window_bytes += chunk.len() as u64;

            if last_emit.elapsed() >= PROGRESS_INTERVAL || (total > 0 && downloaded >= total) {
                let elapsed = window_start.elapsed().as_secs_f64();
                let speed = if elapsed > 0.0 {
                    Some(window_bytes as f64 / elapsed)
                } else {
                    None
                };
                let eta = match speed {
                    Some(bps) if bps > 0.0 && total > downloaded => {
                        Some(((total - downloaded) as f64 / bps).ceil() as u64)
                    }
                    Some(_) if total > 0 && downloaded >= total => Some(0),
                    _ => None,
                };
                sink.emit(StageEvent {
                    eta_seconds: eta,
                    throughput_bytes_per_second: speed,
                    ..StageEvent::download(downloaded, total)
                });
                last_emit = Instant::now();
            }
        }

        file.flush().await?;
        if total > 0 && downloaded < total {
            anyhow::bail!("download truncated ({}/{} bytes)", downloaded, total);
        }
        Ok(TransferOutcome::Installed)
    }

    /// 재개되면 true, 취소되면 false
    async fn wait_while_paused(&mut self) -> bool {
        loop {
            if self.control.changed().await.is_err() {
                return false;
            }
            let control = *self.control.borrow_and_update();
            match control {
                TransferControl::Run => return true,
                TransferControl::Cancel => return false,
                TransferControl::Pause => {}
            }
        }
    }
}

// ─────── 파일시스템 유틸리티 ────────────────────────────────────────

fn read_version_file(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 직접 경로 → 하위 폴더 전체 순서로 실행 파일 탐색
pub fn find_executable(dir: &Path, exe_name: &str) -> Option<PathBuf> {
    let direct = dir.join(exe_name);
    if direct.is_file() {
        return Some(direct);
    }
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name().to_str() == Some(exe_name))
        .map(|e| e.into_path())
}

fn candidate_directories(cfg: &LauncherConfig, subfolder: Option<&str>) -> Vec<PathBuf> {
    let mut bases = vec![cfg.resolved_install_dir(), config::default_install_dir()];
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            bases.push(dir.to_path_buf());
        }
    }
    if let Ok(cwd) = std::env::current_dir() {
        bases.push(cwd);
    }
    if let Some(home) = dirs::home_dir() {
        bases.push(home.join("Games"));
        bases.push(home.join("Desktop"));
    }

    let mut out: Vec<PathBuf> = Vec::new();
    for base in bases {
        let mut paths = Vec::with_capacity(2);
        if let Some(sub) = subfolder {
            paths.push(base.join(sub));
        }
        paths.push(base);
        for p in paths {
            if p.is_dir() && !out.contains(&p) {
                out.push(p);
            }
        }
    }
    out
}

/// 설정된 세이브 파일을 `backup/<timestamp>/` 로 복사. 복사한 게 없으면 None.
pub fn backup_saves(install_dir: &Path, files: &[String]) -> Result<Option<PathBuf>> {
    let existing: Vec<&String> = files
        .iter()
        .filter(|f| install_dir.join(f.as_str()).is_file())
        .collect();
    if existing.is_empty() {
        return Ok(None);
    }

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_dir = install_dir.join("backup").join(stamp);
    std::fs::create_dir_all(&backup_dir)?;
    for name in existing {
        let dest = backup_dir.join(name.as_str());
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(install_dir.join(name.as_str()), &dest)
            .with_context(|| format!("failed to back up {}", name))?;
    }
    Ok(Some(backup_dir))
}

/// zip 엔트리 이름을 설치 폴더 아래 경로로 변환. `..` 과 드라이브 접두어는 버림.
pub fn sanitize_entry_path(base: &Path, name: &str) -> Option<PathBuf> {
    let mut path = base.to_path_buf();
    let mut pushed = false;
    for part in name.split(['\\', '/']) {
        if part.is_empty() || part == "." || part == ".." || part.contains(':') {
            continue;
        }
        if Path::new(part)
            .components()
            .any(|c| !matches!(c, PathComponent::Normal(_)))
        {
            continue;
        }
        path.push(part);
        pushed = true;
    }
    pushed.then_some(path)
}

/// zip 압축 해제. 풀린 엔트리 수를 반환합니다.
pub fn extract_archive(archive_path: &Path, target_dir: &Path) -> Result<usize> {
    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("cannot open {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file).context("not a valid zip archive")?;

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(out_path) = sanitize_entry_path(target_dir, entry.name()) else {
            tracing::debug!("[Executor] Skipping entry {:?}", entry.name());
            continue;
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = std::fs::File::create(&out_path)
            .with_context(|| format!("cannot write {}", out_path.display()))?;
        std::io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
            }
        }
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        for (name, data) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn sanitize_drops_traversal_and_drives() {
        let base = Path::new("/install");
        assert_eq!(
            sanitize_entry_path(base, "../../etc/passwd"),
            Some(PathBuf::from("/install/etc/passwd"))
        );
        assert_eq!(
            sanitize_entry_path(base, "C:\\Windows\\evil.dll"),
            Some(PathBuf::from("/install/Windows/evil.dll"))
        );
        assert_eq!(
            sanitize_entry_path(base, "Game/Data/map.rxdata"),
            Some(PathBuf::from("/install/Game/Data/map.rxdata"))
        );
        assert_eq!(sanitize_entry_path(base, "../"), None);
    }

    #[test]
    fn extracts_nested_entries() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("pkg.zip");
        write_zip(
            &archive,
            &[("Game.exe", b"MZ"), ("Data/Scripts.rxdata", b"scripts"), ("../escape.txt", b"x")],
        );

        let target = dir.path().join("out");
        std::fs::create_dir_all(&target).unwrap();
        let n = extract_archive(&archive, &target).unwrap();
        assert_eq!(n, 3);
        assert!(target.join("Game.exe").is_file());
        assert!(target.join("Data").join("Scripts.rxdata").is_file());
        // 밖으로 나가지 않고 설치 폴더 안에 풀림
        assert!(target.join("escape.txt").is_file());
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn finds_executable_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("PNW").join("bin");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("Game.exe"), b"MZ").unwrap();

        let found = find_executable(dir.path(), "Game.exe").unwrap();
        assert_eq!(found, nested.join("Game.exe"));
        assert!(find_executable(dir.path(), "Other.exe").is_none());
    }

    #[test]
    fn finds_deeply_nested_executable() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a").join("b").join("c").join("d").join("e");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("Game.exe"), b"MZ").unwrap();

        assert_eq!(find_executable(dir.path(), "Game.exe"), Some(deep.join("Game.exe")));
    }

    #[tokio::test]
    async fn abandoned_transfer_releases_and_reports() {
        let (sink, mut streams) = crate::executor::event_channel();
        let active = Arc::new(AtomicBool::new(true));
        drop(ActiveTransfer {
            active: active.clone(),
            sink,
            finished: false,
        });

        assert!(!active.load(Ordering::Acquire));
        assert!(streams.faults.recv().await.is_some());
        assert_eq!(streams.stages.recv().await.map(|e| e.stage), Some(Stage::Failed));
    }

    #[tokio::test]
    async fn finished_transfer_releases_silently() {
        let (sink, mut streams) = crate::executor::event_channel();
        let active = Arc::new(AtomicBool::new(true));
        let mut guard = ActiveTransfer {
            active: active.clone(),
            sink,
            finished: false,
        };
        guard.release();
        assert!(!active.load(Ordering::Acquire));
        drop(guard);

        assert!(!active.load(Ordering::Acquire));
        assert!(streams.stages.try_recv().is_err());
        assert!(streams.faults.try_recv().is_err());
    }

    #[tokio::test]
    async fn panicked_transfer_task_frees_the_slot() {
        let (sink, mut streams) = crate::executor::event_channel();
        let active = Arc::new(AtomicBool::new(true));
        let guard = ActiveTransfer {
            active: active.clone(),
            sink,
            finished: false,
        };

        let handle = tokio::spawn(async move {
            let _guard = guard;
            panic!("extraction blew up");
        });
        assert!(handle.await.is_err());

        assert!(!active.load(Ordering::Acquire));
        assert_eq!(streams.stages.recv().await.map(|e| e.stage), Some(Stage::Failed));
    }

    #[test]
    fn backup_copies_existing_saves_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Save1.rxdata"), b"save").unwrap();

        let files = vec!["Save1.rxdata".to_string(), "Save2.rxdata".to_string()];
        let backup = backup_saves(dir.path(), &files).unwrap().unwrap();
        assert!(backup.starts_with(dir.path().join("backup")));
        assert!(backup.join("Save1.rxdata").is_file());
        assert!(!backup.join("Save2.rxdata").exists());

        let empty = tempfile::tempdir().unwrap();
        assert!(backup_saves(empty.path(), &files).unwrap().is_none());
    }

    #[test]
    fn version_file_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".version");
        assert_eq!(read_version_file(&path), None);
        std::fs::write(&path, "1.2.0\n").unwrap();
        assert_eq!(read_version_file(&path).as_deref(), Some("1.2.0"));
        std::fs::write(&path, "  ").unwrap();
        assert_eq!(read_version_file(&path), None);
    }

    #[tokio::test]
    async fn local_facts_reflect_install_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = LauncherConfig {
            install_dir: Some(dir.path().display().to_string()),
            ..Default::default()
        };
        let exec = LocalExecutor::new(cfg, None).unwrap();

        let facts = exec.local_install_facts().await.unwrap();
        assert!(!facts.product_present_on_disk);
        assert_eq!(facts.local_version, None);

        std::fs::write(dir.path().join("Game.exe"), b"MZ").unwrap();
        std::fs::write(dir.path().join(".version"), "0.9").unwrap();
        let facts = exec.local_install_facts().await.unwrap();
        assert!(facts.product_present_on_disk);
        assert_eq!(facts.local_version.as_deref(), Some("0.9"));
    }

    #[tokio::test]
    async fn set_install_directory_persists() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("config").join("launcher.toml");
        let exec = LocalExecutor::new(LauncherConfig::default(), Some(cfg_path.clone())).unwrap();

        exec.set_install_directory("/games/pnw").await.unwrap();
        assert_eq!(exec.config().await.install_dir.as_deref(), Some("/games/pnw"));
        let saved = LauncherConfig::load_from(&cfg_path).unwrap();
        assert_eq!(saved.install_dir.as_deref(), Some("/games/pnw"));

        assert!(exec.set_install_directory("  ").await.is_err());
    }
}
