// src/wellbeing_tests.rs

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::engine::ShiftEngine;
    use crate::limits::minutes_to_hours;
    use crate::scheduler::NewShift;
    use crate::testutil::*;

    const BIZ: &str = "biz_cafe";
    const EMP: &str = "emp_ada";

    /// Schedules and fully punches an 08:00-18:00 shift (no breaks) on the
    /// given date: 10 recorded hours.
    fn punched_ten_hours(engine: &ShiftEngine, clock: &crate::clock::TestClock, date: &str) {
        let shift = engine
            .create_shift(NewShift::new(BIZ, d(date), t("08:00"), t("18:00")).employee(EMP))
            .unwrap();
        clock.set_time(&format!("{} 08:00:00", date));
        engine.check_in(EMP, &shift.id, None).unwrap();
        clock.set_time(&format!("{} 18:00:00", date));
        engine.check_out(EMP, &shift.id, None).unwrap();
    }

    #[test]
    fn fifty_recorded_hours_raise_the_weekly_alert() {
        let (engine, clock) = engine_at("2025-06-02 07:00:00");
        for date in [
            "2025-06-02",
            "2025-06-03",
            "2025-06-04",
            "2025-06-05",
            "2025-06-06",
        ] {
            punched_ten_hours(&engine, &clock, date);
        }

        let stats = engine.wellbeing_stats(EMP);
        assert_eq!(stats.week_hours, dec!(50));
        assert_eq!(stats.month_hours, dec!(50));
        let alert = stats.alert.expect("50 hours should trip the alert");
        assert!(alert.contains("hours this week"));
    }

    #[test]
    fn a_normal_week_stays_quiet() {
        let (engine, clock) = engine_at("2025-06-02 07:00:00");
        for date in ["2025-06-02", "2025-06-03", "2025-06-04", "2025-06-05"] {
            punched_ten_hours(&engine, &clock, date);
        }

        let stats = engine.wellbeing_stats(EMP);
        assert_eq!(stats.week_hours, dec!(40));
        assert!(stats.alert.is_none());
    }

    #[test]
    fn month_totals_span_weeks_but_week_totals_do_not() {
        let (engine, clock) = engine_at("2025-06-02 07:00:00");
        punched_ten_hours(&engine, &clock, "2025-06-02");
        // The following ISO week, same calendar month.
        punched_ten_hours(&engine, &clock, "2025-06-10");

        clock.set_time("2025-06-10 19:00:00");
        let stats = engine.wellbeing_stats(EMP);
        assert_eq!(stats.week_hours, dec!(10));
        assert_eq!(stats.month_hours, dec!(20));
    }

    #[test]
    fn overtime_records_roll_into_the_totals() {
        let (engine, clock) = engine_at("2025-06-02 09:00:00");
        let shift = nine_to_five(&engine, BIZ, EMP, "2025-06-02");
        engine.check_in(EMP, &shift.id, None).unwrap();
        clock.set_time("2025-06-02 17:40:00");
        engine.check_out(EMP, &shift.id, None).unwrap();

        let stats = engine.wellbeing_stats(EMP);
        assert_eq!(stats.week_overtime_hours, minutes_to_hours(40));
        assert_eq!(stats.month_overtime_hours, minutes_to_hours(40));
    }

    #[test]
    fn unpunched_shifts_do_not_count_as_worked_time() {
        let (engine, _clock) = engine_at("2025-06-02 07:00:00");
        let _scheduled_only = nine_to_five(&engine, BIZ, EMP, "2025-06-02");

        let stats = engine.wellbeing_stats(EMP);
        assert_eq!(stats.week_hours, dec!(0));
        assert!(stats.alert.is_none());
    }

    #[test]
    fn week_to_date_counts_a_shift_still_on_the_clock() {
        let (engine, clock) = engine_at("2025-06-02 08:00:00");
        punched_ten_hours(&engine, &clock, "2025-06-02");

        let tuesday = nine_to_five(&engine, BIZ, EMP, "2025-06-03");
        clock.set_time("2025-06-03 09:00:00");
        engine.check_in(EMP, &tuesday.id, None).unwrap();
        clock.set_time("2025-06-03 12:00:00");

        // Monday's 600 punched minutes plus three live hours.
        assert_eq!(engine.week_worked_minutes(EMP, d("2025-06-03")), 780);
    }
}
