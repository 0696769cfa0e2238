use chrono::{Datelike, Duration, NaiveDate};
use proptest::prelude::*;
use serde_json::json;
use week_planner::model::{LoadRange, RawRecord, SourceKind};
use week_planner::sync::{DateWindow, FetchedRecords, PlannerStore};

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (-800i64..800).prop_map(|offset| base() + Duration::days(offset))
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn window_only_grows_and_covers_every_target(
        targets in prop::collection::vec(arb_date(), 1..20),
        slack in 0u32..3,
    ) {
        let mut window = DateWindow::around(base(), slack);
        for target in targets {
            let before = window.range();
            let changed = window.expand_to_include(target);
            let after = window.range();

            prop_assert!(after.start <= before.start);
            prop_assert!(after.end >= before.end);
            prop_assert!(after.contains(target));
            prop_assert_eq!(changed, after != before);
            // Whole months only.
            prop_assert_eq!(after.start.day(), 1);
            prop_assert_eq!((after.end + Duration::days(1)).day(), 1);
        }
    }

    #[test]
    fn store_never_holds_out_of_range_tasks(
        offsets in prop::collection::vec((-120i64..120, 0i64..20), 0..30),
    ) {
        let range = LoadRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
        );
        let mut store = PlannerStore::new(DateWindow::new(range));
        let request = store.begin_fetch().unwrap();

        let scheduled = offsets
            .iter()
            .enumerate()
            .map(|(i, (offset, len))| {
                let start = base() + Duration::days(*offset);
                let end = start + Duration::days(*len);
                let fields = json!({
                    "id": format!("t{i}"),
                    "startDate": start.format("%Y-%m-%d").to_string(),
                    "endDate": end.format("%Y-%m-%d").to_string(),
                    "assigneeIds": ["ana"],
                });
                RawRecord::new(SourceKind::GenericTask, fields.as_object().cloned().unwrap())
            })
            .collect();
        store.complete_fetch(request, Ok(FetchedRecords { scheduled, unscheduled: Vec::new() }));

        for task in store.tasks() {
            prop_assert!(range.intersects(&task.span.unwrap()));
        }
        let expected = offsets
            .iter()
            .filter(|(offset, len)| {
                let start = base() + Duration::days(*offset);
                start <= range.end && start + Duration::days(*len) >= range.start
            })
            .count();
        prop_assert_eq!(store.tasks().len(), expected);
    }
}
