//! Greedy row packing for one week.
//!
//! Tasks are placed in start order (longest first on ties) into the lowest
//! row that is free on every visible day they cover. This is not an optimal
//! interval colouring, but it is stable and cheap enough to rerun every frame.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::model::{DateSpan, OwnerId, Task, TaskKey, WeekWindow, DAYS_PER_WEEK};

const LAST_DAY: i64 = DAYS_PER_WEEK as i64 - 1;

/// Where one task landed in the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement<'a> {
    pub task: &'a Task,
    pub row: usize,
    /// First visible column (0 = Monday).
    pub first_day: usize,
    /// Last visible column, inclusive.
    pub last_day: usize,
    /// Continues in from the previous week.
    pub starts_before_week: bool,
    /// Continues out into the next week.
    pub ends_after_week: bool,
}

impl Placement<'_> {
    pub fn has_start_cap(&self) -> bool {
        !self.starts_before_week
    }

    pub fn has_end_cap(&self) -> bool {
        !self.ends_after_week
    }

    /// The only column that shows the title and icon.
    pub fn label_day(&self) -> usize {
        self.first_day
    }

    pub fn days(&self) -> RangeInclusive<usize> {
        self.first_day..=self.last_day
    }

    pub fn span_days(&self) -> usize {
        self.last_day - self.first_day + 1
    }
}

/// Per-day row slots. A slot holds an index into the placements list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotGrid {
    days: [Vec<Option<usize>>; DAYS_PER_WEEK],
}

impl SlotGrid {
    pub fn slot(&self, day: usize, row: usize) -> Option<usize> {
        self.days
            .get(day)
            .and_then(|rows| rows.get(row).copied().flatten())
    }

    fn is_free(&self, day: usize, row: usize) -> bool {
        self.slot(day, row).is_none()
    }

    fn assign(&mut self, day: usize, row: usize, placement: usize) {
        let rows = &mut self.days[day];
        if rows.len() <= row {
            rows.resize(row + 1, None);
        }
        rows[row] = Some(placement);
    }
}

/// Result of packing one task list into one week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedWeek<'a> {
    pub week: WeekWindow,
    pub grid: SlotGrid,
    /// Rows needed to draw every placement; 0 for an empty week.
    pub row_count: usize,
    /// In placement order.
    pub placements: Vec<Placement<'a>>,
}

impl<'a> PackedWeek<'a> {
    pub fn placement_at(&self, day: usize, row: usize) -> Option<&Placement<'a>> {
        self.grid
            .slot(day, row)
            .and_then(|index| self.placements.get(index))
    }

    pub fn task_at(&self, day: usize, row: usize) -> Option<&'a Task> {
        self.placement_at(day, row).map(|p| p.task)
    }

    pub fn placement_of(&self, key: &TaskKey) -> Option<&Placement<'a>> {
        self.placements.iter().find(|p| p.task.has_key(key))
    }
}

/// Lay out `tasks` for `week`. Pure and deterministic.
///
/// Unscheduled and off-week tasks are dropped. Ordering is by start date,
/// then longer duration first, then id, so the result does not depend on
/// the order of the input.
pub fn pack<'a, I>(tasks: I, week: &WeekWindow) -> PackedWeek<'a>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut visible: Vec<(&'a Task, DateSpan)> = tasks
        .into_iter()
        .filter_map(|task| task.scheduled_span().map(|span| (task, span)))
        .filter(|(_, span)| week.intersects(span))
        .collect();

    visible.sort_by(|(a, a_span), (b, b_span)| {
        (a_span.start, Reverse(a_span.duration_days()), &a.id).cmp(&(
            b_span.start,
            Reverse(b_span.duration_days()),
            &b.id,
        ))
    });

    let mut grid = SlotGrid::default();
    let mut placements: Vec<Placement<'a>> = Vec::with_capacity(visible.len());
    let mut row_count = 0;

    for (task, span) in visible {
        let raw_start = week.day_index(span.start);
        let raw_end = week.day_index(span.end);
        let first = raw_start.clamp(0, LAST_DAY);
        let last = raw_end.clamp(0, LAST_DAY);
        if first > last {
            continue;
        }
        let (first, last) = (first as usize, last as usize);

        let mut row = 0;
        while !(first..=last).all(|day| grid.is_free(day, row)) {
            row += 1;
        }

        let index = placements.len();
        for day in first..=last {
            grid.assign(day, row, index);
        }
        row_count = row_count.max(row + 1);

        placements.push(Placement {
            task,
            row,
            first_day: first,
            last_day: last,
            starts_before_week: raw_start < 0,
            ends_after_week: raw_end > LAST_DAY,
        });
    }

    PackedWeek {
        week: *week,
        grid,
        row_count,
        placements,
    }
}

/// One person's packed row of the week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerLane<'a> {
    pub owner: OwnerId,
    pub packed: PackedWeek<'a>,
}

/// Pack each owner's tasks independently.
///
/// A task with several owners is placed in every one of their lanes. Lanes
/// exist for every owner of a scheduled task in `tasks`, even when nothing
/// of theirs falls in this week, so the lane list stays put while paging.
pub fn pack_by_owner<'a, I>(tasks: I, week: &WeekWindow) -> Vec<OwnerLane<'a>>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut by_owner: BTreeMap<OwnerId, Vec<&'a Task>> = BTreeMap::new();
    for task in tasks {
        if task.scheduled_span().is_none() {
            continue;
        }
        for owner in task.owners.flatten() {
            by_owner.entry(owner).or_default().push(task);
        }
    }

    by_owner
        .into_iter()
        .map(|(owner, owned)| OwnerLane {
            owner,
            packed: pack(owned, week),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Owners, SourceKind};
    use chrono::NaiveDate;

    fn key(id: &str) -> TaskKey {
        TaskKey::new(SourceKind::GenericTask, id)
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn task(id: &str, start: NaiveDate, end: NaiveDate) -> Task {
        Task::new(id, id, start, end, Owners::single(OwnerId::new("ana")))
    }

    // Week of Monday 2024-03-04.
    fn week() -> WeekWindow {
        WeekWindow::containing(d(2024, 3, 4))
    }

    #[test]
    fn overlapping_tasks_take_two_rows() {
        let tasks = vec![
            task("tue-thu", d(2024, 3, 5), d(2024, 3, 7)),
            task("mon-wed", d(2024, 3, 4), d(2024, 3, 6)),
        ];
        let packed = pack(&tasks, &week());

        assert_eq!(packed.row_count, 2);
        let mon_wed = packed.placement_of(&key("mon-wed")).unwrap();
        let tue_thu = packed.placement_of(&key("tue-thu")).unwrap();
        assert_eq!(mon_wed.row, 0);
        assert_eq!(tue_thu.row, 1);
        assert_eq!(packed.task_at(1, 0).unwrap().id.as_str(), "mon-wed");
        assert_eq!(packed.task_at(1, 1).unwrap().id.as_str(), "tue-thu");
        assert!(packed.task_at(0, 1).is_none());
    }

    #[test]
    fn continuation_from_previous_week_is_clamped() {
        // Friday 2024-03-01 through Tuesday 2024-03-05.
        let tasks = vec![task("carry", d(2024, 3, 1), d(2024, 3, 5))];
        let packed = pack(&tasks, &week());
        let p = packed.placement_of(&key("carry")).unwrap();

        assert_eq!(p.days(), 0..=1);
        assert!(!p.has_start_cap());
        assert!(p.has_end_cap());
        assert_eq!(p.label_day(), 0);
        assert!(packed.task_at(2, p.row).is_none());
    }

    #[test]
    fn task_leaving_the_week_has_no_end_cap() {
        let tasks = vec![task("spill", d(2024, 3, 9), d(2024, 3, 14))];
        let packed = pack(&tasks, &week());
        let p = packed.placement_of(&key("spill")).unwrap();

        assert_eq!(p.days(), 5..=6);
        assert!(p.has_start_cap());
        assert!(!p.has_end_cap());
        assert_eq!(p.label_day(), 5);
    }

    #[test]
    fn task_spanning_whole_week_and_beyond() {
        let tasks = vec![task("long", d(2024, 2, 20), d(2024, 3, 20))];
        let packed = pack(&tasks, &week());
        let p = packed.placement_of(&key("long")).unwrap();

        assert_eq!(p.days(), 0..=6);
        assert!(!p.has_start_cap() && !p.has_end_cap());
    }

    #[test]
    fn contained_task_gets_both_caps() {
        let tasks = vec![task("wed", d(2024, 3, 6), d(2024, 3, 6))];
        let packed = pack(&tasks, &week());
        let p = packed.placement_of(&key("wed")).unwrap();
        assert!(p.has_start_cap() && p.has_end_cap());
        assert_eq!(p.span_days(), 1);
        assert_eq!(packed.row_count, 1);
    }

    #[test]
    fn off_week_and_unscheduled_are_dropped() {
        let mut backlog = task("backlog", d(2024, 3, 5), d(2024, 3, 5));
        backlog.is_unscheduled = true;
        let tasks = vec![
            task("last-week", d(2024, 2, 26), d(2024, 3, 3)),
            task("next-week", d(2024, 3, 11), d(2024, 3, 12)),
            backlog,
        ];
        let packed = pack(&tasks, &week());
        assert!(packed.placements.is_empty());
        assert_eq!(packed.row_count, 0);
    }

    #[test]
    fn short_tasks_reuse_gaps() {
        let tasks = vec![
            task("mon", d(2024, 3, 4), d(2024, 3, 4)),
            task("mon-tue", d(2024, 3, 4), d(2024, 3, 5)),
            task("wed", d(2024, 3, 6), d(2024, 3, 6)),
            task("tue", d(2024, 3, 5), d(2024, 3, 5)),
        ];
        let packed = pack(&tasks, &week());

        // The two-day task wins the tie on Monday and takes row 0.
        assert_eq!(packed.placement_of(&key("mon-tue")).unwrap().row, 0);
        assert_eq!(packed.placement_of(&key("mon")).unwrap().row, 1);
        assert_eq!(packed.placement_of(&key("tue")).unwrap().row, 1);
        assert_eq!(packed.placement_of(&key("wed")).unwrap().row, 0);
        assert_eq!(packed.row_count, 2);
    }

    #[test]
    fn input_order_does_not_matter() {
        let mut tasks = vec![
            task("a", d(2024, 3, 4), d(2024, 3, 6)),
            task("b", d(2024, 3, 4), d(2024, 3, 6)),
            task("c", d(2024, 3, 5), d(2024, 3, 8)),
        ];
        let first: Vec<_> = pack(&tasks, &week())
            .placements
            .iter()
            .map(|p| (p.task.id.clone(), p.row))
            .collect();
        tasks.reverse();
        let second: Vec<_> = pack(&tasks, &week())
            .placements
            .iter()
            .map(|p| (p.task.id.clone(), p.row))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn lanes_are_per_owner() {
        let mut shared = task("shared", d(2024, 3, 4), d(2024, 3, 5));
        shared.owners.editors.push(OwnerId::new("bo"));
        let tasks = vec![
            shared,
            task("ana-only", d(2024, 3, 4), d(2024, 3, 4)),
            Task::new(
                "bo-later",
                "bo-later",
                d(2024, 4, 1),
                d(2024, 4, 2),
                Owners::single(OwnerId::new("bo")),
            ),
        ];
        let lanes = pack_by_owner(&tasks, &week());

        assert_eq!(lanes.len(), 2);
        assert_eq!(lanes[0].owner.as_str(), "ana");
        assert_eq!(lanes[0].packed.row_count, 2);
        assert_eq!(lanes[1].owner.as_str(), "bo");
        assert_eq!(lanes[1].packed.row_count, 1);
        assert_eq!(lanes[1].packed.placements[0].task.id.as_str(), "shared");
    }
}
