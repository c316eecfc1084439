// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 工具模块
/// Utility modules
pub mod resize;

pub use resize::resize_rgb;

/// 当前本地时间字符串, 各字段之间用 `delimiter` 分隔 (用作输出目录名)
pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_time_string() {
        let s = gen_time_string("-");
        // 年-月-日-时-分-秒-纳秒
        assert_eq!(s.split('-').count(), 7);
        assert!(s.chars().all(|c| c.is_ascii_digit() || c == '-'));
    }
}
