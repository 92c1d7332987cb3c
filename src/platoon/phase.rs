use chrono::{DateTime, Duration, Utc};

/// Phase in progress at `now`, counted from 1.
///
/// `None` before the event starts, after its last phase, or when the phase
/// duration is not positive.
pub fn current_phase(
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    phase_duration: Duration,
    phase_count: u8,
) -> Option<u8> {
    if now < start || phase_duration <= Duration::zero() {
        return None;
    }
    let elapsed = (now - start).num_seconds();
    let index = elapsed / phase_duration.num_seconds().max(1);
    if index >= i64::from(phase_count) {
        return None;
    }
    u8::try_from(index + 1).ok()
}

/// When the given phase begins
pub fn phase_start(start: DateTime<Utc>, phase_duration: Duration, phase: u8) -> DateTime<Utc> {
    start + phase_duration * i32::from(phase.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap()
    }

    #[test]
    fn phases_advance_every_duration() {
        let day = Duration::hours(24);
        assert_eq!(current_phase(start(), start(), day, 6), Some(1));
        assert_eq!(current_phase(start(), start() + Duration::hours(23), day, 6), Some(1));
        assert_eq!(current_phase(start(), start() + Duration::hours(24), day, 6), Some(2));
        assert_eq!(current_phase(start(), start() + Duration::hours(143), day, 6), Some(6));
    }

    #[test]
    fn outside_the_event_there_is_no_phase() {
        let day = Duration::hours(24);
        assert_eq!(current_phase(start(), start() - Duration::minutes(1), day, 6), None);
        assert_eq!(current_phase(start(), start() + Duration::hours(144), day, 6), None);
        assert_eq!(current_phase(start(), start(), Duration::zero(), 6), None);
    }

    #[test]
    fn phase_start_lines_up_with_current_phase() {
        let day = Duration::hours(24);
        let p3 = phase_start(start(), day, 3);
        assert_eq!(p3, start() + Duration::hours(48));
        assert_eq!(current_phase(start(), p3, day, 6), Some(3));
    }
}
