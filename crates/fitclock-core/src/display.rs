//! Presentation helpers shared by every frontend.

/// Render seconds as zero-padded `MM:SS`.
///
/// Minutes do not roll over into hours: 3600 seconds renders as `60:00`.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Message shown when a session finishes.
pub fn completion_notice(label: Option<&str>) -> String {
    match label {
        Some(title) if !title.trim().is_empty() => {
            format!("Workout Complete! You've completed your {} workout!", title.trim())
        }
        _ => "Workout Complete! You've completed your workout!".to_string(),
    }
}

/// Fraction of the session still ahead, 1.0 at start and 0.0 when done.
pub fn remaining_fraction(remaining_secs: u64, total_secs: u64) -> f64 {
    if total_secs == 0 {
        return 0.0;
    }
    (remaining_secs as f64 / total_secs as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_zero_padded() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(5), "00:05");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(30 * 60), "30:00");
    }

    #[test]
    fn clock_has_no_hour_rollover() {
        assert_eq!(format_clock(3600), "60:00");
        assert_eq!(format_clock(3599), "59:59");
        assert_eq!(format_clock(100 * 60 + 1), "100:01");
    }

    #[test]
    fn notice_uses_title_when_present() {
        assert_eq!(
            completion_notice(Some("Morning Run")),
            "Workout Complete! You've completed your Morning Run workout!"
        );
        assert_eq!(
            completion_notice(Some("  ")),
            "Workout Complete! You've completed your workout!"
        );
        assert_eq!(completion_notice(None), completion_notice(Some("")));
    }

    #[test]
    fn remaining_fraction_bounds() {
        assert_eq!(remaining_fraction(60, 60), 1.0);
        assert_eq!(remaining_fraction(0, 60), 0.0);
        assert_eq!(remaining_fraction(30, 60), 0.5);
        assert_eq!(remaining_fraction(5, 0), 0.0);
    }
}
