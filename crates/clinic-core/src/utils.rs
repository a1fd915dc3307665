//! 通用工具函数

use chrono::{Datelike, Days, NaiveDate, NaiveTime};

use crate::models::DayOfWeek;

/// 计算从指定日期起（含当天）下一个落在目标星期的日期
pub fn next_occurrence_on_or_after(today: NaiveDate, day: DayOfWeek) -> NaiveDate {
    let current = today.weekday().num_days_from_monday();
    let target = day.days_from_monday();
    let diff = (target + 7 - current) % 7;
    // 日期加 0-6 天不会越界
    today.checked_add_days(Days::new(diff as u64)).unwrap_or(today)
}

/// 半开区间 [start, end) 重叠判定
pub fn intervals_overlap(
    new_start: NaiveTime,
    new_end: NaiveTime,
    existing_start: NaiveTime,
    existing_end: NaiveTime,
) -> bool {
    new_start < existing_end && new_end > existing_start
}

/// 将时间格式化为 HH:mm
pub fn format_hm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// 解析 HH:mm（兼容 HH:mm:ss）格式的时间
pub fn parse_hm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_next_occurrence_same_day() {
        // 2024-01-01 是周一
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(next_occurrence_on_or_after(monday, DayOfWeek::Monday), monday);
    }

    #[test]
    fn test_next_occurrence_later_in_week() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let friday = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(next_occurrence_on_or_after(monday, DayOfWeek::Friday), friday);
    }

    #[test]
    fn test_next_occurrence_wraps_to_next_week() {
        // 从周三找下一个周二，应落到下周
        let wednesday = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let next_tuesday = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert_eq!(
            next_occurrence_on_or_after(wednesday, DayOfWeek::Tuesday),
            next_tuesday
        );
    }

    #[test]
    fn test_intervals_overlap() {
        // 部分重叠
        assert!(intervals_overlap(t(9, 30), t(10, 30), t(9, 0), t(10, 0)));
        // 完全包含
        assert!(intervals_overlap(t(9, 0), t(11, 0), t(9, 30), t(10, 0)));
        // 首尾相接不算重叠（半开区间）
        assert!(!intervals_overlap(t(10, 0), t(11, 0), t(9, 0), t(10, 0)));
        assert!(!intervals_overlap(t(8, 0), t(9, 0), t(9, 0), t(10, 0)));
        // 完全分离
        assert!(!intervals_overlap(t(13, 0), t(14, 0), t(9, 0), t(10, 0)));
    }

    #[test]
    fn test_format_hm() {
        assert_eq!(format_hm(t(9, 5)), "09:05");
        assert_eq!(format_hm(t(14, 30)), "14:30");
    }

    #[test]
    fn test_parse_hm() {
        assert_eq!(parse_hm("09:05"), Some(t(9, 5)));
        assert_eq!(parse_hm("14:30:00"), Some(t(14, 30)));
        assert_eq!(parse_hm("25:00"), None);
        assert_eq!(parse_hm("not-a-time"), None);
    }
}
