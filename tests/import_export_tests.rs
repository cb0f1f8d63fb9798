use chrono::NaiveDate;
use procurement_tracker::{
    JsonFileStore, Market, MarketType, PersistenceError, Priority, Register, RegisterStore, Task,
    TaskStatus, load_register_from_json, load_tasks_from_csv, save_register_to_json,
    save_tasks_to_csv,
};
use tempfile::tempdir;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_register() -> Register {
    let mut market = Market::new("M1", "Etude environnementale", MarketType::ConsultingServices, "UCP");
    market.budget_forecast = Some(125_000_000.0);

    let mut started = Task::new("1712000000001", "M1", "Termes de référence")
        .with_plan(d(2024, 3, 1), d(2024, 3, 10))
        .with_status(TaskStatus::InProgress);
    started.actual_start = Some(d(2024, 3, 3));
    started.assigned_to = Some("Hanta".into());
    started.priority = Priority::High;
    started.progress = Some(40);
    started.description = Some("Rédaction, validation".into());

    let pending = Task::new("1712000000002", "M1", "Avis à manifestation")
        .with_plan(d(2024, 3, 11), d(2024, 3, 25));

    Register::from_parts(vec![market], vec![started, pending]).unwrap()
}

#[test]
fn json_snapshot_preserves_register() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("register.json");
    let register = sample_register();

    save_register_to_json(&register, &path).unwrap();
    let loaded = load_register_from_json(&path).unwrap();
    assert_eq!(loaded, register);
}

#[test]
fn json_store_reports_missing_file_as_none() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("absent.json"));
    assert!(store.load_register().unwrap().is_none());

    store.save_register(&sample_register()).unwrap();
    let loaded = store.load_register().unwrap().unwrap();
    assert_eq!(loaded.tasks().len(), 2);
}

#[test]
fn json_accepts_french_status_labels() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    std::fs::write(
        &path,
        r#"{
            "markets": [{"market_ref": "M1", "title": "Travaux", "market_type": "works", "coordination": "UCP"}],
            "tasks": [
                {"id": "1", "market_ref": "M1", "title": "A", "status": "TERMINE"},
                {"id": "2", "market_ref": "M1", "title": "B", "status": "something else"}
            ]
        }"#,
    )
    .unwrap();

    let register = load_register_from_json(&path).unwrap();
    assert_eq!(register.find_task("1").unwrap().status, TaskStatus::Completed);
    assert_eq!(register.find_task("2").unwrap().status, TaskStatus::Unrecognized);
}

#[test]
fn csv_round_trip_keeps_task_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tasks.csv");
    let register = sample_register();

    save_tasks_to_csv(register.tasks(), &path).unwrap();
    let tasks = load_tasks_from_csv(&path).unwrap();
    assert_eq!(tasks, register.tasks());
}

#[test]
fn csv_with_bad_date_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(
        &path,
        "id,market_ref,title,description,status,priority,assigned_to,planned_start,planned_end,actual_start,actual_end,progress\n\
         1,M1,Publication,,EN_COURS,,,01/03/2024,2024-03-10,,,\n",
    )
    .unwrap();

    let err = load_tasks_from_csv(&path).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[test]
fn csv_with_duplicate_ids_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dup.csv");
    std::fs::write(
        &path,
        "id,market_ref,title,description,status,priority,assigned_to,planned_start,planned_end,actual_start,actual_end,progress\n\
         1,M1,A,,NOT_STARTED,,,2024-03-01,2024-03-10,,,\n\
         1,M1,B,,NOT_STARTED,,,2024-03-01,2024-03-10,,,\n",
    )
    .unwrap();

    assert!(load_tasks_from_csv(&path).is_err());
}
