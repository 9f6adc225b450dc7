//! PNW 런처 CLI
//!
//! ## 사용법
//! ```text
//! pnw-launcher check                     # 설치/업데이트 상태 확인
//! pnw-launcher check --json              # JSON 출력 (종료 코드 포함)
//! pnw-launcher status [--json]           # 상세 상태 + 로그
//! pnw-launcher install [--force]         # 다운로드 + 설치 (Ctrl-C 로 취소)
//! pnw-launcher launch                    # 게임 실행
//! pnw-launcher set-dir <path>            # 설치 폴더 지정
//! pnw-launcher detect                    # 설치 폴더 자동 탐색
//! pnw-launcher watch                     # 주기적으로 확인하며 로그 출력
//! pnw-launcher config                    # 설정 표시
//! pnw-launcher config set <key> <value>  # 설정 변경
//! pnw-launcher help                      # 도움말
//! ```
//!
//! ## 종료 코드 (check --json)
//! - `0`: 설치 또는 업데이트 필요
//! - `1`: 에러
//! - `2`: 최신 상태

use std::path::PathBuf;

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;

use pnw_updater_lib::{
    config_file_path, version, set_config_value, InstallStatus, LauncherConfig, LauncherSnapshot,
    LifecyclePhase, LocalExecutor, LogEntry, Orchestrator, OrchestratorEvent,
    OrchestratorOptions, RecheckScheduler, SchedulerConfig, Severity,
};

type Launcher = Orchestrator<LocalExecutor>;

/// CLI 실행. 프로그램 인자(실행 파일 이름 제외)를 받아 종료 코드를 돌려줍니다.
pub fn run(args: Vec<String>) -> i32 {
    // stdout 의 JSON 을 오염시키지 않도록 로그는 stderr 로
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async move {
        match run_async(args).await {
            Ok(code) => code,
            Err(e) => {
                eprintln!("✗ Error: {:#}", e);
                1
            }
        }
    })
}

async fn run_async(args: Vec<String>) -> anyhow::Result<i32> {
    let args_ref: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    if args_ref.is_empty() || matches!(args_ref[0], "help" | "--help" | "-h") {
        print_help();
        return Ok(0);
    }

    if matches!(args_ref[0], "--version" | "-V") {
        println!("pnw-launcher {}", env!("CARGO_PKG_VERSION"));
        return Ok(0);
    }

    let config_path = config_file_path();
    if args_ref[0] == "config" {
        return cmd_config(&config_path, &args_ref[1..]);
    }

    let cfg = LauncherConfig::load_from(&config_path)?;
    let launcher = build_launcher(&cfg, config_path)?;

    match args_ref[0] {
        "check" => cmd_check(&launcher, &args_ref[1..]).await,
        "status" => cmd_status(&launcher, &args_ref[1..]).await,
        "install" | "update" => cmd_install(&launcher, &args_ref[1..]).await,
        "launch" => cmd_launch(&launcher).await,
        "set-dir" => cmd_set_dir(&launcher, &args_ref[1..]).await,
        "detect" => cmd_detect(&launcher).await,
        "watch" => cmd_watch(&launcher, &cfg).await,
        other => {
            eprintln!("✗ Unknown command: {}", other);
            eprintln!("  Run 'pnw-launcher help' for usage.");
            Ok(1)
        }
    }
}

fn build_launcher(cfg: &LauncherConfig, config_path: PathBuf) -> anyhow::Result<Launcher> {
    let executor =
        LocalExecutor::new(cfg.clone(), Some(config_path)).context("failed to set up executor")?;
    Ok(Orchestrator::spawn(executor, OrchestratorOptions::from(cfg)))
}

// ═══════════════════════════════════════════════════════
// 명령어 핸들러
// ═══════════════════════════════════════════════════════

async fn cmd_check(launcher: &Launcher, flags: &[&str]) -> anyhow::Result<i32> {
    let json_mode = flags.contains(&"--json");
    let result = launcher.run_check().await;
    let snapshot = launcher.snapshot();

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(exit_code(&result));
    }

    match result {
        Ok(Some(status)) => {
            print_status_line(status, &snapshot);
            Ok(0)
        }
        Ok(None) => Ok(0),
        Err(e) => {
            eprintln!("✗ Check failed: {}", e);
            Ok(1)
        }
    }
}

async fn cmd_status(launcher: &Launcher, flags: &[&str]) -> anyhow::Result<i32> {
    let result = launcher.run_check().await;
    let snapshot = launcher.snapshot();

    if flags.contains(&"--json") {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(if result.is_err() { 1 } else { 0 });
    }

    println!("🎮 PNW Launcher");
    println!("─────────────────────────────────────────────");
    println!(
        "  Install directory: {}",
        if snapshot.install_directory.is_empty() { "—" } else { &snapshot.install_directory }
    );
    println!(
        "  Installed:         {}",
        if snapshot.install_status.map(|s| s.is_installed()).unwrap_or(false) { "yes" } else { "no" }
    );
    println!("  Local version:     {}", snapshot.local_version.as_deref().unwrap_or("—"));
    println!("  Remote version:    {}", snapshot.remote_version.as_deref().unwrap_or("…"));
    if let Some(size) = &snapshot.download_size {
        println!("  Download size:     {}", size);
    }
    if let Some(minimum) = &snapshot.minimum_launcher_version {
        let current = env!("CARGO_PKG_VERSION");
        if version::is_older(current, minimum) {
            println!("  ⚠ Launcher {} is older than required {}, please update it", current, minimum);
        }
    }
    println!("  Phase:             {}", snapshot.phase);
    if let Some(action) = snapshot.primary_action {
        println!("  Next action:       {:?}", action);
    }

    if let Some(descriptor) = launcher.descriptor().await {
        if let Some(date) = &descriptor.release_date {
            println!("  Released:          {}", date);
        }
        if let Some(changelog) = descriptor.changelog.as_ref().and_then(|c| c.for_language("en")) {
            println!();
            println!("  Changelog:");
            for line in changelog.lines() {
                println!("    {}", line);
            }
        }
    }

    println!();
    println!("  Log:");
    for entry in snapshot.entries.iter().rev() {
        println!("    {}", format_entry(entry));
    }
    Ok(if result.is_err() { 1 } else { 0 })
}

async fn cmd_install(launcher: &Launcher, flags: &[&str]) -> anyhow::Result<i32> {
    let force = flags.contains(&"--force");

    match launcher.run_check().await {
        Ok(Some(InstallStatus::UpToDate)) if !force => {
            println!("✓ Already up to date (use --force to reinstall)");
            return Ok(0);
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("✗ Check failed: {}", e);
            return Ok(1);
        }
    }

    let mut events = launcher.events();
    if let Err(e) = launcher.start_install_or_update().await {
        eprintln!("✗ {}", e);
        return Ok(1);
    }
    println!("⬇ Downloading…");

    let mut cancel_sent = false;
    let mut failed = false;
    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Ok(OrchestratorEvent::Progress(_)) => {
                    let snap = launcher.snapshot();
                    if snap.phase == LifecyclePhase::Downloading {
                        eprint!(
                            "\r  {:>5.1}%  ETA {}  {}      ",
                            snap.percent, snap.eta, snap.throughput
                        );
                    }
                }
                Ok(OrchestratorEvent::PhaseChanged { to, .. }) => match to {
                    LifecyclePhase::Extracting => {
                        eprintln!();
                        println!("📦 Extracting…");
                    }
                    LifecyclePhase::Paused => println!("⏸ Paused"),
                    LifecyclePhase::Done => {
                        eprintln!();
                        println!("✓ Installation complete");
                        break;
                    }
                    LifecyclePhase::Ready => {
                        eprintln!();
                        if failed {
                            println!("✗ Installation failed");
                        } else {
                            println!("✗ Download canceled");
                        }
                        return Ok(1);
                    }
                    _ => {}
                },
                Ok(OrchestratorEvent::Logged(entry)) if entry.severity == Severity::Error => {
                    failed = true;
                    eprintln!();
                    eprintln!("✗ {}", entry.text);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => {
                    tracing::debug!("[CLI] skipped {} events", n);
                    if launcher.phase().await == LifecyclePhase::Done {
                        println!("✓ Installation complete");
                        break;
                    }
                }
                Err(RecvError::Closed) => return Ok(1),
            },
            _ = tokio::signal::ctrl_c(), if !cancel_sent => {
                eprintln!();
                println!("⏹ Canceling…");
                cancel_sent = true;
                if let Err(e) = launcher.cancel().await {
                    eprintln!("✗ {}", e);
                }
            }
        }
    }

    // 완료 후 자동 재확인 결과 대기
    loop {
        match events.recv().await {
            Ok(OrchestratorEvent::CheckCompleted { status }) => {
                print_status_line(status, &launcher.snapshot());
                return Ok(0);
            }
            Ok(OrchestratorEvent::CheckFailed { error, recoverable }) => {
                eprintln!("✗ Recheck failed: {}", error);
                if recoverable {
                    eprintln!("  Run 'pnw-launcher check' again once the connection is back.");
                }
                return Ok(1);
            }
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => return Ok(1),
        }
    }
}

async fn cmd_launch(launcher: &Launcher) -> anyhow::Result<i32> {
    if let Err(e) = launcher.run_check().await {
        // 오프라인이어도 설치되어 있으면 실행할 수 있어야 함
        tracing::warn!("[CLI] Check failed before launch: {}", e);
    }
    match launcher.launch().await {
        Ok(true) => {
            println!("▶ Game started");
            Ok(0)
        }
        Ok(false) => {
            if let Some(entry) = launcher.snapshot().entries.first() {
                eprintln!("✗ {}", entry.text);
            }
            Ok(1)
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            Ok(1)
        }
    }
}

async fn cmd_set_dir(launcher: &Launcher, args: &[&str]) -> anyhow::Result<i32> {
    if args.is_empty() {
        eprintln!("Usage: pnw-launcher set-dir <path>");
        return Ok(1);
    }
    let path = args.join(" ");
    match launcher.choose_install_directory(Some(path.clone())).await {
        Ok(()) => {
            println!("✓ Install directory: {}", path);
            if let Some(status) = launcher.snapshot().install_status {
                print_status_line(status, &launcher.snapshot());
            }
            Ok(0)
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            Ok(1)
        }
    }
}

async fn cmd_detect(launcher: &Launcher) -> anyhow::Result<i32> {
    // 디스크립터의 실행 파일 이름/폴더를 힌트로 쓰기 위해 먼저 확인
    let _ = launcher.run_check().await;
    match launcher.autodetect_install_directory().await {
        Ok(Some(path)) => {
            println!("✓ Detected: {}", path);
            Ok(0)
        }
        Ok(None) => {
            if let Some(entry) = launcher.snapshot().entries.first() {
                println!("⚠ {}", entry.text);
            }
            Ok(2)
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            Ok(1)
        }
    }
}

async fn cmd_watch(launcher: &Launcher, cfg: &LauncherConfig) -> anyhow::Result<i32> {
    let mut events = launcher.events();
    let mut scheduler = RecheckScheduler::new(launcher.clone(), SchedulerConfig::from(cfg));
    scheduler.start();
    println!(
        "👀 Watching (every {}s), Ctrl-C to stop",
        cfg.check_interval_secs
    );

    loop {
        tokio::select! {
            ev = events.recv() => match ev {
                Ok(OrchestratorEvent::Logged(entry)) => println!("{}", format_entry(&entry)),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    scheduler.stop();
    Ok(0)
}

fn cmd_config(config_path: &std::path::Path, args: &[&str]) -> anyhow::Result<i32> {
    match args.first().copied() {
        Some("set") if args.len() >= 3 => {
            let key = args[1];
            let value = args[2..].join(" ");
            set_config_value(config_path, key, &value)?;
            println!("✓ {} = {}", key, value);
        }
        Some("set") => {
            eprintln!("Usage: pnw-launcher config set <key> <value>");
            eprintln!("Keys: {}", pnw_updater_lib::config::CONFIG_KEYS.join(", "));
            return Ok(1);
        }
        Some("--json") => {
            let cfg = LauncherConfig::load_from(config_path)?;
            println!("{}", serde_json::to_string(&cfg)?);
        }
        _ => {
            let cfg = LauncherConfig::load_from(config_path)?;
            println!("📋 Launcher Configuration");
            println!("─────────────────────────────────────────────");
            println!("  manifest_url:           {}", cfg.manifest_url);
            println!(
                "  install_dir:            {}",
                cfg.install_dir
                    .clone()
                    .unwrap_or_else(|| format!("(default: {})", cfg.resolved_install_dir().display()))
            );
            println!("  default_executable:     {}", cfg.default_executable);
            println!("  version_file:           {}", cfg.version_file);
            println!("  check_interval_secs:    {}", cfg.check_interval_secs);
            println!("  log_capacity:           {}", cfg.log_capacity);
            println!("  request_timeout_secs:   {}", cfg.request_timeout_secs);
            println!("  download_timeout_secs:  {}", cfg.download_timeout_secs);
            println!("  checks_during_transfer: {}", cfg.checks_during_transfer);
            println!("  backup_files:           {}", cfg.backup_files.join(", "));
            println!();
            println!("  Config file: {}", config_path.display());
            println!();
            println!("  Change with: pnw-launcher config set <key> <value>");
        }
    }
    Ok(0)
}

// ═══════════════════════════════════════════════════════
// 유틸리티
// ═══════════════════════════════════════════════════════

/// check --json 종료 코드
fn exit_code<T>(result: &Result<Option<InstallStatus>, T>) -> i32 {
    match result {
        Ok(Some(InstallStatus::UpToDate)) => 2,
        Ok(Some(_)) | Ok(None) => 0,
        Err(_) => 1,
    }
}

fn print_status_line(status: InstallStatus, snapshot: &LauncherSnapshot) {
    let local = snapshot.local_version.as_deref().unwrap_or("—");
    let remote = snapshot.remote_version.as_deref().unwrap_or("…");
    match status {
        InstallStatus::NotInstalled => println!("⬇ Not installed (latest: {})", remote),
        InstallStatus::UpdateAvailable => println!("⬆ Update available: {} → {}", local, remote),
        InstallStatus::UpToDate => println!("✓ Up to date ({})", local),
    }
}

fn format_entry(entry: &LogEntry) -> String {
    format!(
        "[{}] {:<5} {}",
        entry.timestamp.format("%H:%M:%S"),
        entry.severity.label(),
        entry.text
    )
}

fn print_help() {
    println!("pnw-launcher: Pokémon New World launcher / updater");
    println!();
    println!("USAGE:");
    println!("  pnw-launcher <command> [args...]");
    println!();
    println!("COMMANDS:");
    println!("  check [--json]              Check install/update status");
    println!("  status [--json]             Show detailed status and log");
    println!("  install [--force]           Download and install the latest version");
    println!("  launch                      Start the game");
    println!("  set-dir <path>              Set the install directory");
    println!("  detect                      Auto-detect an existing installation");
    println!("  watch                       Re-check periodically and print the log");
    println!("  config [--json]             Show launcher configuration");
    println!("  config set <key> <value>    Change a config value");
    println!("  help                        This help message");
    println!();
    println!("EXIT CODES (check --json):");
    println!("  0  install or update needed");
    println!("  1  error");
    println!("  2  up to date");
    println!();
    println!("EXAMPLES:");
    println!("  pnw-launcher check");
    println!("  pnw-launcher set-dir \"D:\\Games\\Pokemon New World\"");
    println!("  pnw-launcher config set check_interval_secs 600");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnw_updater_lib::LauncherError;

    #[test]
    fn check_exit_codes() {
        let up: Result<_, LauncherError> = Ok(Some(InstallStatus::UpToDate));
        let update: Result<_, LauncherError> = Ok(Some(InstallStatus::UpdateAvailable));
        let missing: Result<_, LauncherError> = Ok(Some(InstallStatus::NotInstalled));
        let failed: Result<Option<InstallStatus>, _> =
            Err(LauncherError::ConfigurationFailure("x".into()));
        assert_eq!(exit_code(&up), 2);
        assert_eq!(exit_code(&update), 0);
        assert_eq!(exit_code(&missing), 0);
        assert_eq!(exit_code(&failed), 1);
    }
}
