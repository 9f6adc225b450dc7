//! 점으로 구분된 숫자 버전 비교 (외부 크레이트 없이)
//!
//! `"1.9"` 와 `"1.10"` 은 사전순이 아니라 세그먼트 숫자로 비교합니다.
//! 누락되었거나 숫자가 아닌 세그먼트는 `0` 으로 취급하므로 실패 경로가 없습니다.

use std::cmp::Ordering;
use std::fmt;

/// 숫자 세그먼트 목록으로 분해된 버전
#[derive(Debug, Clone, Default)]
pub struct DottedVersion {
    segments: Vec<u64>,
}

impl DottedVersion {
    /// 관대한 파싱. 잘못된 세그먼트는 0 이 됩니다.
    pub fn parse(s: &str) -> Self {
        let segments = s
            .trim()
            .split('.')
            .map(|seg| seg.trim().parse::<u64>().unwrap_or(0))
            .collect();
        Self { segments }
    }

    fn segment(&self, idx: usize) -> u64 {
        self.segments.get(idx).copied().unwrap_or(0)
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DottedVersion {}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // 짧은 쪽은 0 세그먼트로 패딩된 것으로 간주
        let len = self.segments.len().max(other.segments.len());
        for idx in 0..len {
            match self.segment(idx).cmp(&other.segment(idx)) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

/// 두 버전 문자열 비교. 순수 함수이며 항상 결과를 반환합니다.
pub fn compare(a: &str, b: &str) -> Ordering {
    DottedVersion::parse(a).cmp(&DottedVersion::parse(b))
}

/// `local` 이 `remote` 보다 오래되었는지
pub fn is_older(local: &str, remote: &str) -> bool {
    compare(local, remote) == Ordering::Less
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zero_segments_are_equal() {
        assert_eq!(compare("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare("1.2.0.0", "1.2"), Ordering::Equal);
    }

    #[test]
    fn numeric_not_lexical() {
        assert_eq!(compare("1.9", "1.10"), Ordering::Less);
        assert_eq!(compare("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare("2.0.0", "10.0.0"), Ordering::Less);
    }

    #[test]
    fn antisymmetric_and_reflexive() {
        let samples = ["0", "1", "1.0", "1.2.3", "1.10", "2", "abc", "", "1.x.3", "3.0.0.1"];
        for a in samples {
            assert_eq!(compare(a, a), Ordering::Equal, "{} vs itself", a);
            for b in samples {
                assert_eq!(compare(a, b), compare(b, a).reverse(), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn malformed_segments_degrade_to_zero() {
        assert_eq!(compare("1.x.3", "1.0.3"), Ordering::Equal);
        assert_eq!(compare("", "0"), Ordering::Equal);
        assert_eq!(compare("v1.2", "0.2"), Ordering::Equal);
        assert_eq!(compare("-1", "0"), Ordering::Equal);
    }

    #[test]
    fn is_older_helper() {
        assert!(is_older("1.0.0", "2.0.0"));
        assert!(!is_older("1.0.0", "1.0.0"));
        assert!(!is_older("1.1", "1.0.9"));
    }

    #[test]
    fn display_keeps_segments() {
        assert_eq!(DottedVersion::parse("1.02.3").to_string(), "1.2.3");
    }
}
