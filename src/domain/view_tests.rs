#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use crate::domain::task::{OwnerId, Priority, Task, TaskId, TaskStatus};
    use crate::domain::view::{derive_stats, derive_view, Criteria, PriorityFilter, StatusFilter};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn task(title: &str, status: TaskStatus, priority: Priority, due: Option<DateTime<Utc>>, created: DateTime<Utc>) -> Task {
        Task {
            id: TaskId(title.to_string()),
            title: title.to_string(),
            description: None,
            status,
            priority,
            due_date: due,
            created_at: created,
            updated_at: created,
            owner_id: OwnerId("owner".into()),
        }
    }

    fn titles(tasks: &[Task]) -> Vec<&str> { tasks.iter().map(|t| t.title.as_str()).collect() }

    #[test]
    fn status_filter_selects_open_only() {
        let tasks = vec![
            task("Buy milk", TaskStatus::Open, Priority::Low, None, at(0)),
            task("Ship release", TaskStatus::Complete, Priority::High, None, at(1)),
        ];
        let criteria = Criteria { status_filter: StatusFilter::Open, ..Criteria::default() };
        assert_eq!(titles(&derive_view(&tasks, &criteria)), vec!["Buy milk"]);
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let mut with_desc = task("Groceries", TaskStatus::Open, Priority::Medium, None, at(0));
        with_desc.description = Some("Remember the MILK".into());
        let tasks = vec![
            with_desc,
            task("Milkshake", TaskStatus::Open, Priority::Medium, None, at(1)),
            task("Taxes", TaskStatus::Open, Priority::Medium, None, at(2)),
        ];
        let criteria = Criteria { search_text: "milk".into(), ..Criteria::default() };
        assert_eq!(titles(&derive_view(&tasks, &criteria)), vec!["Milkshake", "Groceries"]);
    }

    #[test]
    fn filters_combine_with_and() {
        let tasks = vec![
            task("a", TaskStatus::Open, Priority::High, None, at(0)),
            task("b", TaskStatus::Complete, Priority::High, None, at(1)),
            task("c", TaskStatus::Open, Priority::Low, None, at(2)),
        ];
        let criteria = Criteria {
            search_text: String::new(),
            status_filter: StatusFilter::Open,
            priority_filter: PriorityFilter::High,
        };
        assert_eq!(titles(&derive_view(&tasks, &criteria)), vec!["a"]);
    }

    #[test]
    fn priority_dominates_then_due_date_then_newest() {
        let tasks = vec![
            task("A", TaskStatus::Open, Priority::Low, None, at(10)),
            task("B", TaskStatus::Open, Priority::High, Some(at(600)), at(0)),
            task("C", TaskStatus::Open, Priority::High, Some(at(60)), at(5)),
            task("D", TaskStatus::Open, Priority::Medium, None, at(1)),
            task("E", TaskStatus::Open, Priority::Medium, None, at(2)),
        ];
        assert_eq!(titles(&derive_view(&tasks, &Criteria::default())), vec!["C", "B", "E", "D", "A"]);
    }

    #[test]
    fn mixed_due_dates_fall_back_to_creation_time() {
        let tasks = vec![
            task("older with due", TaskStatus::Open, Priority::High, Some(at(30)), at(0)),
            task("newer without due", TaskStatus::Open, Priority::High, None, at(5)),
        ];
        assert_eq!(
            titles(&derive_view(&tasks, &Criteria::default())),
            vec!["newer without due", "older with due"]
        );
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let tasks = vec![
            task("first", TaskStatus::Open, Priority::Medium, Some(at(30)), at(0)),
            task("second", TaskStatus::Open, Priority::Medium, Some(at(30)), at(9)),
        ];
        assert_eq!(titles(&derive_view(&tasks, &Criteria::default())), vec!["first", "second"]);
    }

    #[test]
    fn overdue_counts_only_open_tasks() {
        let now = at(24 * 60);
        let yesterday = Some(at(0));
        let tasks = vec![
            task("late", TaskStatus::Open, Priority::Medium, yesterday, at(-60)),
            task("late but done", TaskStatus::Complete, Priority::Medium, yesterday, at(-60)),
            task("future", TaskStatus::Open, Priority::Medium, Some(now + Duration::days(1)), at(-60)),
            task("exactly now", TaskStatus::Open, Priority::Medium, Some(now), at(-60)),
        ];
        let stats = derive_stats(&tasks, now);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.overdue, 1);
    }

    #[test]
    fn stats_of_empty_collection_are_zero() {
        assert_eq!(derive_stats(&[], at(0)), Default::default());
    }

    #[test]
    fn filters_parse_from_query_names() {
        assert_eq!("complete".parse::<StatusFilter>().unwrap(), StatusFilter::Complete);
        assert_eq!("all".parse::<PriorityFilter>().unwrap(), PriorityFilter::All);
        assert!("urgent".parse::<PriorityFilter>().is_err());
    }

    fn arb_task() -> impl Strategy<Value = Task> {
        (
            "[a-cA-C ]{1,6}",
            proptest::option::of("[a-cA-C ]{0,6}"),
            any::<bool>(),
            0u8..3,
            proptest::option::of(-1000i64..1000),
            -1000i64..1000,
        )
            .prop_map(|(title, description, done, p, due, created)| {
                let priority = match p { 0 => Priority::Low, 1 => Priority::Medium, _ => Priority::High };
                let status = if done { TaskStatus::Complete } else { TaskStatus::Open };
                let mut t = task(&title, status, priority, due.map(at), at(created));
                t.description = description;
                t
            })
    }

    fn arb_criteria() -> impl Strategy<Value = Criteria> {
        ("[a-cA-C]{0,2}", 0u8..3, 0u8..4).prop_map(|(search_text, s, p)| Criteria {
            search_text,
            status_filter: match s { 0 => StatusFilter::All, 1 => StatusFilter::Open, _ => StatusFilter::Complete },
            priority_filter: match p {
                0 => PriorityFilter::All,
                1 => PriorityFilter::Low,
                2 => PriorityFilter::Medium,
                _ => PriorityFilter::High,
            },
        })
    }

    /// Tasks with distinct ids, so views can be compared as sets.
    fn arb_tasks(task: impl Strategy<Value = Task>) -> impl Strategy<Value = Vec<Task>> {
        prop::collection::vec(task, 0..24).prop_map(|mut tasks| {
            for (i, t) in tasks.iter_mut().enumerate() {
                t.id = TaskId(format!("t{i}"));
            }
            tasks
        })
    }

    fn arb_dated_task() -> impl Strategy<Value = Task> {
        (arb_task(), -1000i64..1000).prop_map(|(mut t, due)| {
            t.due_date = Some(at(due));
            t
        })
    }

    // Written out field by field so it does not share code with `Criteria`.
    fn expected_in_view(task: &Task, criteria: &Criteria) -> bool {
        let needle = criteria.search_text.to_lowercase();
        let text_ok = needle.is_empty()
            || task.title.to_lowercase().contains(&needle)
            || task.description.as_ref().is_some_and(|d| d.to_lowercase().contains(&needle));
        let status_ok = match criteria.status_filter {
            StatusFilter::All => true,
            StatusFilter::Open => task.status == TaskStatus::Open,
            StatusFilter::Complete => task.status == TaskStatus::Complete,
        };
        let priority_ok = match criteria.priority_filter {
            PriorityFilter::All => true,
            PriorityFilter::Low => task.priority == Priority::Low,
            PriorityFilter::Medium => task.priority == Priority::Medium,
            PriorityFilter::High => task.priority == Priority::High,
        };
        text_ok && status_ok && priority_ok
    }

    fn sorted_ids(tasks: &[Task]) -> Vec<String> {
        let mut ids: Vec<String> = tasks.iter().map(|t| t.id.0.clone()).collect();
        ids.sort();
        ids
    }

    proptest! {
        #[test]
        fn view_contains_exactly_the_matching_tasks(tasks in arb_tasks(arb_task()), criteria in arb_criteria()) {
            let view = derive_view(&tasks, &criteria);
            let expected: Vec<Task> = tasks.iter().filter(|t| expected_in_view(t, &criteria)).cloned().collect();
            prop_assert_eq!(sorted_ids(&view), sorted_ids(&expected));
        }

        #[test]
        fn view_is_deterministic_and_priority_ordered(tasks in arb_tasks(arb_task())) {
            let view = derive_view(&tasks, &Criteria::default());
            prop_assert_eq!(&view, &derive_view(&tasks, &Criteria::default()));
            prop_assert!(view.windows(2).all(|w| w[0].priority.rank() >= w[1].priority.rank()));
        }

        #[test]
        fn dated_tasks_of_equal_priority_are_soonest_first(tasks in arb_tasks(arb_dated_task())) {
            let view = derive_view(&tasks, &Criteria::default());
            for w in view.windows(2) {
                prop_assert!(w[0].priority.rank() >= w[1].priority.rank());
                if w[0].priority == w[1].priority {
                    prop_assert!(w[0].due_date <= w[1].due_date);
                }
            }
        }

        #[test]
        fn completed_plus_pending_is_total(tasks in prop::collection::vec(arb_task(), 1..24), now in -1000i64..1000) {
            let stats = derive_stats(&tasks, at(now));
            prop_assert_eq!(stats.completed + stats.pending, stats.total);
            prop_assert!(stats.overdue <= stats.pending);
        }
    }
}
