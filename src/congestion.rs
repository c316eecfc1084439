// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 拥堵等级 (CongestionClassifier)

use std::fmt;

use serde::Serialize;

/// 拥堵等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Low,
    Medium,
    High,
}

impl CongestionLevel {
    /// count < 10 → low, 10..25 → medium, >= 25 → high
    pub fn from_count(count: usize) -> Self {
        match count {
            0..=9 => CongestionLevel::Low,
            10..=24 => CongestionLevel::Medium,
            _ => CongestionLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionLevel::Low => "low",
            CongestionLevel::Medium => "medium",
            CongestionLevel::High => "high",
        }
    }
}

impl fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
