//! 사용자에게 보이는 상태 로그
//!
//! 최신 항목이 맨 앞에 오고, 용량을 넘으면 가장 오래된 항목부터 버립니다.
//! 직전 항목과 같은 텍스트는 다시 쌓지 않습니다.

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Ok,
    Warn,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Ok => "OK",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

/// 로그 한 줄. 추가된 뒤에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub sequence_id: u64,
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_id: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// 항목 추가. 직전 항목과 텍스트가 같으면 무시하고 `None` 을 돌려줍니다.
    pub fn append(&mut self, text: impl Into<String>, severity: Severity) -> Option<&LogEntry> {
        let text = text.into();
        if self.entries.front().map(|e| e.text == text).unwrap_or(false) {
            return None;
        }

        let entry = LogEntry {
            sequence_id: self.next_id,
            timestamp: Local::now(),
            severity,
            text,
        };
        self.next_id += 1;

        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
        self.entries.front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 최신순
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
