use procurement_tracker::{
    Market, MarketStatus, MarketType, Register, Task, TaskStatus, derive_all_market_statuses,
    derive_market_status, last_task_added,
};

fn task(id: &str, market: &str, status: TaskStatus) -> Task {
    Task::new(id, market, format!("Task {id}")).with_status(status)
}

#[test]
fn market_without_tasks_is_not_started() {
    assert_eq!(derive_market_status("M1", &[]), MarketStatus::NotStarted);
    let others = vec![task("1", "M2", TaskStatus::Completed)];
    assert_eq!(derive_market_status("M1", &others), MarketStatus::NotStarted);
}

#[test]
fn all_completed_tasks_complete_the_market() {
    let tasks = vec![
        task("1", "M1", TaskStatus::Completed),
        task("2", "M1", TaskStatus::Completed),
    ];
    assert_eq!(derive_market_status("M1", &tasks), MarketStatus::Completed);

    let single = vec![task("1", "M1", TaskStatus::Completed)];
    assert_eq!(derive_market_status("M1", &single), MarketStatus::Completed);
}

#[test]
fn one_in_progress_task_among_not_started_is_in_progress() {
    let tasks = vec![
        task("1", "M1", TaskStatus::NotStarted),
        task("2", "M1", TaskStatus::InProgress),
        task("3", "M1", TaskStatus::NotStarted),
    ];
    assert_eq!(derive_market_status("M1", &tasks), MarketStatus::InProgress);
}

#[test]
fn completed_mixed_with_not_started_is_in_progress() {
    let tasks = vec![
        task("1", "M1", TaskStatus::Completed),
        task("2", "M1", TaskStatus::NotStarted),
    ];
    assert_eq!(derive_market_status("M1", &tasks), MarketStatus::InProgress);
}

#[test]
fn delayed_task_counts_as_started() {
    let tasks = vec![
        task("1", "M1", TaskStatus::Delayed),
        task("2", "M1", TaskStatus::NotStarted),
    ];
    assert_eq!(derive_market_status("M1", &tasks), MarketStatus::InProgress);
}

#[test]
fn unrecognized_statuses_degrade_to_not_started() {
    let tasks = vec![
        Task::new("1", "M1", "Publication").with_status(TaskStatus::from("published")),
        Task::new("2", "M1", "Revue").with_status(TaskStatus::from("review")),
    ];
    assert_eq!(derive_market_status("M1", &tasks), MarketStatus::NotStarted);
}

#[test]
fn completed_plus_unrecognized_is_in_progress_not_completed() {
    let tasks = vec![
        task("1", "M1", TaskStatus::Completed),
        task("2", "M1", TaskStatus::Unrecognized),
    ];
    assert_eq!(derive_market_status("M1", &tasks), MarketStatus::InProgress);
}

#[test]
fn derivation_is_idempotent_and_leaves_input_untouched() {
    let tasks = vec![
        task("1", "M1", TaskStatus::Completed),
        task("2", "M1", TaskStatus::InProgress),
        task("3", "M2", TaskStatus::NotStarted),
    ];
    let snapshot = tasks.clone();
    let first = derive_market_status("M1", &tasks);
    let second = derive_market_status("M1", &tasks);
    assert_eq!(first, second);
    assert_eq!(tasks, snapshot);
}

#[test]
fn parallel_batch_matches_single_market_derivation() {
    let mut tasks = Vec::new();
    for m in 0..40 {
        let market = format!("M{m}");
        for t in 0..(m % 4) {
            let status = match (m + t) % 3 {
                0 => TaskStatus::Completed,
                1 => TaskStatus::InProgress,
                _ => TaskStatus::NotStarted,
            };
            tasks.push(task(&format!("{m}-{t}"), &market, status));
        }
    }
    let refs: Vec<String> = (0..40).map(|m| format!("M{m}")).collect();
    let batch = derive_all_market_statuses(&refs, &tasks);
    assert_eq!(batch.len(), refs.len());
    for ((market_ref, status), expected_ref) in batch.iter().zip(&refs) {
        assert_eq!(market_ref, expected_ref);
        assert_eq!(*status, derive_market_status(market_ref, &tasks));
    }
}

#[test]
fn last_task_added_picks_greatest_id() {
    let tasks = vec![
        task("1712000000005", "M1", TaskStatus::NotStarted),
        task("1712000000010", "M1", TaskStatus::NotStarted),
        task("1712000000099", "M2", TaskStatus::NotStarted),
        task("1712000000007", "M1", TaskStatus::NotStarted),
    ];
    let last = last_task_added("M1", &tasks).unwrap();
    assert_eq!(last.id, "1712000000010");
    assert!(last_task_added("M3", &tasks).is_none());
}

#[test]
fn last_task_added_follows_generated_ids_past_nine() {
    let market = Market::new("M1", "Piste rurale", MarketType::Works, "UCP");
    let mut register = Register::from_parts(vec![market], Vec::new()).unwrap();
    for n in 1..=12 {
        let id = register.next_task_id("M1");
        register
            .upsert_task(Task::new(id, "M1", format!("Etape {n}")))
            .unwrap();
    }

    let last = register.last_task_added("M1").unwrap();
    assert_eq!(last.id, "M1-T12");
    assert_eq!(last.title, "Etape 12");
    assert_eq!(register.next_task_id("M1"), "M1-T13");
}
