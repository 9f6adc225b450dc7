//! 에러 타입
//!
//! ## 분류
//! - `FetchError`: 릴리스 디스크립터/로컬 정보 조회 실패 (네트워크, HTTP, 파싱, IO)
//! - `LauncherError`: 오케스트레이터가 호출자에게 돌려주는 실패
//!
//! 사용자에게 보이는 실패는 모두 EventLog 텍스트로도 기록됩니다.

use thiserror::Error;

/// 원격/로컬 조회 실패
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// 네트워크 연결 실패
    #[error("network error: {message}")]
    Network { message: String, recoverable: bool },

    /// 요청 타임아웃
    #[error("timeout after {secs}s: {operation}")]
    Timeout { operation: String, secs: u64 },

    /// 비정상 HTTP 상태 코드
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// 응답 본문 파싱 실패
    #[error("invalid release descriptor: {0}")]
    Parse(String),

    /// 로컬 파일시스템 오류
    #[error("{operation} failed on '{path}': {message}")]
    Io {
        operation: String,
        path: String,
        message: String,
    },
}

impl FetchError {
    /// 다음 스케줄에서 재시도하면 나아질 수 있는 실패인지
    pub fn is_recoverable(&self) -> bool {
        match self {
            FetchError::Network { recoverable, .. } => *recoverable,
            FetchError::Timeout { .. } => true,
            // 5xx 는 서버 쪽 일시 장애, 4xx 는 설정 문제
            FetchError::Http { status, .. } => *status >= 500,
            FetchError::Parse(_) => false,
            FetchError::Io { .. } => false,
        }
    }

    /// reqwest 에러를 FetchError 로 변환
    pub fn from_reqwest(err: &reqwest::Error, operation: &str, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                operation: operation.to_string(),
                secs: timeout_secs,
            }
        } else if let Some(status) = err.status() {
            FetchError::Http {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Network {
                message: err.to_string(),
                recoverable: err.is_connect() || err.is_request(),
            }
        }
    }

    pub fn io(operation: &str, path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        FetchError::Io {
            operation: operation.to_string(),
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// 오케스트레이터 명령/체크 실패
#[derive(Debug, Clone, Error)]
pub enum LauncherError {
    /// 디스크립터 또는 로컬 정보 조회 실패
    #[error("{0}")]
    FetchFailure(#[from] FetchError),

    /// 전송 URL 없음, 혹은 디스크립터를 아직 받지 못함
    #[error("configuration error: {0}")]
    ConfigurationFailure(String),

    /// 현재 상태에서 허용되지 않는 명령
    #[error("{command} is not allowed while {phase}")]
    CommandRejected { command: &'static str, phase: String },

    /// 실행 파일 실행 실패
    #[error("launch failed: {0}")]
    LaunchFailure(String),

    /// 설치 디렉토리 변경/탐색 실패
    #[error("install directory error: {0}")]
    InstallDirectory(String),

    /// 체크 사이클 태스크가 결과 없이 끝남
    #[error("check cycle aborted: {0}")]
    CheckAborted(String),
}

impl LauncherError {
    pub fn rejected(command: &'static str, phase: impl std::fmt::Display) -> Self {
        LauncherError::CommandRejected {
            command,
            phase: phase.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification() {
        assert!(FetchError::Timeout { operation: "fetch".into(), secs: 30 }.is_recoverable());
        assert!(FetchError::Http { status: 503, url: String::new() }.is_recoverable());
        assert!(!FetchError::Http { status: 404, url: String::new() }.is_recoverable());
        assert!(!FetchError::Parse("bad".into()).is_recoverable());
        assert!(FetchError::Network { message: "x".into(), recoverable: true }.is_recoverable());
    }

    #[test]
    fn json_error_becomes_parse() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        assert!(matches!(FetchError::from(err), FetchError::Parse(_)));
    }

    #[test]
    fn display_messages() {
        let e = LauncherError::rejected("pause", "Idle");
        assert_eq!(e.to_string(), "pause is not allowed while Idle");

        let e: LauncherError = FetchError::Http { status: 404, url: "http://x/m.json".into() }.into();
        assert_eq!(e.to_string(), "HTTP 404 from http://x/m.json");
    }
}
