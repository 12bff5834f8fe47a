use super::common::*;
use crate::workflows::assessments::lifecycle::{
    accepts_submissions, is_editable, is_results_viewable, resolve_state, resolve_window,
    LifecycleState,
};
use chrono::{Duration, TimeZone, Utc};

#[test]
fn resolves_states_across_a_day_long_window() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

    let before = Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap();
    let during = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let after = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();

    assert_eq!(resolve_window(start, end, before), LifecycleState::Upcoming);
    assert_eq!(resolve_window(start, end, during), LifecycleState::Active);
    assert_eq!(resolve_window(start, end, after), LifecycleState::Completed);
}

#[test]
fn window_boundaries_are_active() {
    let assessment = assessment();

    assert_eq!(
        resolve_state(&assessment, window_open()),
        LifecycleState::Active
    );
    assert_eq!(
        resolve_state(&assessment, window_close()),
        LifecycleState::Active
    );
    assert_eq!(
        resolve_state(&assessment, window_open() - Duration::milliseconds(1)),
        LifecycleState::Upcoming
    );
    assert_eq!(
        resolve_state(&assessment, window_close() + Duration::milliseconds(1)),
        LifecycleState::Completed
    );
}

#[test]
fn predicates_partition_time() {
    let assessment = assessment();
    let mut now = window_open() - Duration::minutes(30);

    while now <= window_close() + Duration::minutes(30) {
        let flags = [
            is_editable(&assessment, now),
            accepts_submissions(&assessment, now),
            is_results_viewable(&assessment, now),
        ];
        assert_eq!(
            flags.iter().filter(|flag| **flag).count(),
            1,
            "exactly one predicate holds at {now}"
        );
        now += Duration::minutes(5);
    }
}

#[test]
fn state_never_moves_backwards() {
    let assessment = assessment();
    let mut previous = resolve_state(&assessment, authoring_time());

    for step in 0..48 {
        let now = authoring_time() + Duration::minutes(step * 5);
        let state = resolve_state(&assessment, now);
        let rank = |s: LifecycleState| LifecycleState::ordered().iter().position(|o| *o == s);
        assert!(rank(state) >= rank(previous));
        previous = state;
    }
    assert_eq!(previous, LifecycleState::Completed);
}

#[test]
fn labels_and_serialization() {
    assert_eq!(LifecycleState::Upcoming.label(), "Upcoming");
    assert_eq!(LifecycleState::Completed.to_string(), "Completed");
    let json = serde_json::to_string(&LifecycleState::Active).expect("serializes");
    assert_eq!(json, "\"active\"");
}

#[test]
fn summary_reflects_derived_state() {
    let assessment = assessment();

    let upcoming = assessment.summary(authoring_time());
    assert!(upcoming.editable);
    assert_eq!(upcoming.state, LifecycleState::Upcoming);

    let active = assessment.summary(window_open());
    assert!(!active.editable);
    assert_eq!(active.state_label, "Active");
}
