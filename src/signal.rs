// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 信号灯时长 (SignalTimer)
//!
//! 分段线性函数, 结果总是限制在 [10, 70] 秒:
//! - count <= 5        → 10
//! - 6 <= count <= 25  → 10 + (count - 5) * 2
//! - count > 25        → 50 + (count - 25) * 0.8

use std::fmt;

use serde::Serialize;

pub const MIN_SECS: f64 = 10.0;
pub const MAX_SECS: f64 = 70.0;

const LOW_TRAFFIC: i64 = 5;
const HEAVY_TRAFFIC: i64 = 25;

/// 信号灯时长 (秒), 总在 [10, 70] 之内
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct SignalDuration(f64);

impl SignalDuration {
    pub fn as_secs_f64(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for SignalDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract().abs() < 1e-9 {
            write!(f, "{:.0}s", self.0)
        } else {
            write!(f, "{:.1}s", self.0)
        }
    }
}

/// 车辆数 → 信号灯时长
///
/// 参数为有符号数, 负数同样被限制到下界。
pub fn signal_duration(count: i64) -> SignalDuration {
    let secs = if count <= LOW_TRAFFIC {
        MIN_SECS
    } else if count <= HEAVY_TRAFFIC {
        MIN_SECS + (count - LOW_TRAFFIC) as f64 * 2.0
    } else {
        50.0 + (count - HEAVY_TRAFFIC) as f64 * 0.8
    };
    SignalDuration(secs.clamp(MIN_SECS, MAX_SECS))
}

/// `VehicleCount` 版本
pub fn duration_for(count: usize) -> SignalDuration {
    signal_duration(i64::try_from(count).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(count: i64) -> f64 {
        signal_duration(count).as_secs_f64()
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(secs(0), 10.0);
        assert_eq!(secs(5), 10.0);
        assert_eq!(secs(6), 12.0);
        assert_eq!(secs(25), 50.0);
        assert!((secs(26) - 50.8).abs() < 1e-9);
        assert!((secs(30) - 54.0).abs() < 1e-9);
        assert_eq!(secs(1000), 70.0);
    }

    #[test]
    fn test_low_and_high_branch_meet_continuously() {
        assert_eq!(secs(5), MIN_SECS);
        assert_eq!(secs(6) - secs(5), 2.0);
        assert_eq!(secs(25), 50.0);
        assert!((secs(26) - secs(25) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_upper_clamp_reached_at_50() {
        assert_eq!(secs(50), 70.0);
        assert_eq!(secs(51), 70.0);
        assert!(secs(49) < 70.0);
    }

    #[test]
    fn test_pathological_inputs_clamped() {
        assert_eq!(secs(-1), 10.0);
        assert_eq!(secs(i64::MIN), 10.0);
        assert_eq!(secs(i64::MAX), 70.0);
        assert_eq!(duration_for(usize::MAX).as_secs_f64(), 70.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(signal_duration(3).to_string(), "10s");
        assert_eq!(signal_duration(26).to_string(), "50.8s");
        assert_eq!(signal_duration(30).to_string(), "54s");
    }

    proptest! {
        #[test]
        fn prop_always_within_bounds(count in any::<i64>()) {
            let d = secs(count);
            prop_assert!((MIN_SECS..=MAX_SECS).contains(&d));
        }

        #[test]
        fn prop_monotonic_non_decreasing(count in 0i64..10_000) {
            prop_assert!(secs(count) <= secs(count + 1));
        }
    }
}
