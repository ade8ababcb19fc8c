//! Integration tests for the database layer.
//!
//! These tests exercise the store operations against an in-memory SQLite
//! database, organized by module.

use chrono::{DateTime, Duration, TimeZone, Utc};
use compliance_tracker::auth::{self, TokenService};
use compliance_tracker::db::Database;
use compliance_tracker::error::{AppError, ErrorCode};
use compliance_tracker::types::{
    AnalyticsFilter, CreateFormInput, CreateFormSubmissionInput, CreateTaskInput,
    CreateUserInput, FieldType, Form, FormFieldInput, LoginInput, RecurrenceType,
    SubmissionData, SubmissionValue, Task, TaskStatus, UpdateFormInput, UpdateUserInput, User,
    UserRole,
};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn code(err: anyhow::Error) -> ErrorCode {
    AppError::from(err).code
}

fn user_input(email: &str, role: UserRole) -> CreateUserInput {
    CreateUserInput {
        email: email.to_string(),
        password: "password123".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lee".to_string(),
        role,
    }
}

fn create_admin(db: &Database) -> User {
    db.create_user(user_input("admin@clinic.test", UserRole::Admin))
        .expect("Failed to create admin")
}

fn create_staff(db: &Database, email: &str) -> User {
    db.create_user(user_input(email, UserRole::StandardUser))
        .expect("Failed to create staff user")
}

fn field(key: &str, field_type: FieldType, order: i32) -> FormFieldInput {
    FormFieldInput {
        field_type,
        field_label: format!("Label {}", key),
        field_key: key.to_string(),
        is_required: true,
        field_options: None,
        field_order: order,
    }
}

fn create_form_with_tags(db: &Database, creator: &User, tags: &[&str]) -> Form {
    db.create_form(
        CreateFormInput {
            title: "Fridge temperature log".to_string(),
            description: Some("Daily cold-chain check".to_string()),
            tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            fields: vec![
                field("temperature", FieldType::NumberInput, 1),
                field("notes", FieldType::TextArea, 2),
            ],
        },
        creator.id,
    )
    .expect("Failed to create form")
}

fn create_form(db: &Database, creator: &User) -> Form {
    create_form_with_tags(db, creator, &["safety"])
}

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap()
}

fn task_input(
    form: &Form,
    assignee: &User,
    due: DateTime<Utc>,
    recurrence_type: RecurrenceType,
    interval: Option<i32>,
) -> CreateTaskInput {
    CreateTaskInput {
        form_id: form.id,
        assigned_to: assignee.id,
        title: "Check fridge".to_string(),
        due_date: due,
        recurrence_type,
        recurrence_interval: interval,
    }
}

/// Admin, one staff user, one form.
fn fixture() -> (Database, User, User, Form) {
    let db = setup_db();
    let admin = create_admin(&db);
    let staff = create_staff(&db, "nurse@clinic.test");
    let form = create_form(&db, &admin);
    (db, admin, staff, form)
}

fn tasks_of(db: &Database, user: &User) -> Vec<Task> {
    db.list_tasks_by_user(user.id).expect("Failed to list tasks")
}

mod user_tests {
    use super::*;

    #[test]
    fn create_user_hashes_password() {
        let db = setup_db();
        let user = create_staff(&db, "nurse@clinic.test");

        assert!(user.is_active);
        assert_eq!(user.role, UserRole::StandardUser);
        assert_ne!(user.password_hash, "password123");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn duplicate_email_conflicts_case_insensitively() {
        let db = setup_db();
        create_staff(&db, "nurse@clinic.test");

        let err = db
            .create_user(user_input("NURSE@clinic.test", UserRole::StandardUser))
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::AlreadyExists);
    }

    #[test]
    fn create_user_validates_input() {
        let db = setup_db();

        let mut short = user_input("a@clinic.test", UserRole::StandardUser);
        short.password = "short".to_string();
        assert_eq!(code(db.create_user(short).unwrap_err()), ErrorCode::InvalidFieldValue);

        let bad_email = user_input("not-an-email", UserRole::StandardUser);
        assert_eq!(
            code(db.create_user(bad_email).unwrap_err()),
            ErrorCode::InvalidFieldValue
        );

        let mut no_name = user_input("b@clinic.test", UserRole::StandardUser);
        no_name.first_name = "  ".to_string();
        assert_eq!(
            code(db.create_user(no_name).unwrap_err()),
            ErrorCode::MissingRequiredField
        );
    }

    #[test]
    fn update_user_applies_provided_fields() {
        let db = setup_db();
        let user = create_staff(&db, "nurse@clinic.test");

        let updated = db
            .update_user(
                user.id,
                UpdateUserInput {
                    last_name: Some("Okafor".to_string()),
                    role: Some(UserRole::Admin),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.first_name, "Ada");
        assert_eq!(updated.last_name, "Okafor");
        assert_eq!(updated.role, UserRole::Admin);
        assert!(updated.updated_at >= user.updated_at);
    }

    #[test]
    fn update_user_rejects_taken_email() {
        let db = setup_db();
        create_staff(&db, "first@clinic.test");
        let second = create_staff(&db, "second@clinic.test");

        let err = db
            .update_user(
                second.id,
                UpdateUserInput {
                    email: Some("first@clinic.test".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::AlreadyExists);

        // Keeping your own email is not a conflict
        db.update_user(
            second.id,
            UpdateUserInput {
                email: Some("second@clinic.test".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn update_missing_user_is_not_found() {
        let db = setup_db();
        let err = db.update_user(99, UpdateUserInput::default()).unwrap_err();
        assert_eq!(code(err), ErrorCode::UserNotFound);
    }

    #[test]
    fn deactivated_users_are_not_listed() {
        let db = setup_db();
        let admin = create_admin(&db);
        let staff = create_staff(&db, "nurse@clinic.test");

        db.update_user(
            staff.id,
            UpdateUserInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        let active = db.list_active_users().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, admin.id);
        let stats = db.organization_analytics(&AnalyticsFilter::default()).unwrap();
        assert_eq!(stats.active_users, 1);
    }
}

mod auth_tests {
    use super::*;

    fn tokens() -> TokenService {
        TokenService::new("integration-secret", 8)
    }

    fn login(db: &Database, email: &str, password: &str) -> anyhow::Result<String> {
        let input = LoginInput {
            email: email.to_string(),
            password: password.to_string(),
        };
        auth::login(db, &tokens(), &input).map(|out| out.token)
    }

    #[test]
    fn login_issues_token_for_valid_credentials() {
        let db = setup_db();
        let admin = create_admin(&db);

        let token = login(&db, "admin@clinic.test", "password123").unwrap();
        let caller = auth::authenticate(&db, &tokens(), &token).unwrap();
        assert_eq!(caller.id, admin.id);
        assert!(caller.is_admin());
    }

    #[test]
    fn unknown_email_and_wrong_password_look_the_same() {
        let db = setup_db();
        create_admin(&db);

        let unknown = AppError::from(login(&db, "nobody@clinic.test", "password123").unwrap_err());
        let wrong = AppError::from(login(&db, "admin@clinic.test", "wrong-password").unwrap_err());

        assert_eq!(unknown.code, ErrorCode::InvalidCredentials);
        assert_eq!(wrong.code, ErrorCode::InvalidCredentials);
        assert_eq!(unknown.message, wrong.message);
    }

    #[test]
    fn deactivated_account_cannot_log_in_or_use_old_token() {
        let db = setup_db();
        let staff = create_staff(&db, "nurse@clinic.test");
        let token = login(&db, "nurse@clinic.test", "password123").unwrap();

        db.update_user(
            staff.id,
            UpdateUserInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        let err = login(&db, "nurse@clinic.test", "password123").unwrap_err();
        assert_eq!(code(err), ErrorCode::AccountDeactivated);

        let err = auth::authenticate(&db, &tokens(), &token).unwrap_err();
        assert_eq!(code(err), ErrorCode::AccountDeactivated);
    }

    #[test]
    fn require_admin_rejects_standard_users() {
        let db = setup_db();
        let staff = create_staff(&db, "nurse@clinic.test");
        let err = auth::require_admin(&staff).unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}

mod form_tests {
    use super::*;

    #[test]
    fn fields_come_back_in_order() {
        let db = setup_db();
        let admin = create_admin(&db);

        let form = db
            .create_form(
                CreateFormInput {
                    title: "Hand hygiene audit".to_string(),
                    description: None,
                    tags: None,
                    fields: vec![
                        field("second", FieldType::Checkbox, 2),
                        FormFieldInput {
                            field_options: Some(vec!["Ward A".into(), "Ward B".into()]),
                            ..field("first", FieldType::SelectDropdown, 1)
                        },
                    ],
                },
                admin.id,
            )
            .unwrap();

        assert!(form.tags.is_empty());
        assert_eq!(form.created_by, admin.id);

        let loaded = db.require_form_with_fields(form.id).unwrap();
        let keys: Vec<&str> = loaded.fields.iter().map(|f| f.field_key.as_str()).collect();
        assert_eq!(keys, vec!["first", "second"]);
        assert_eq!(
            loaded.fields[0].field_options,
            Some(vec!["Ward A".to_string(), "Ward B".to_string()])
        );
        assert_eq!(loaded.fields[1].field_options, None);
    }

    #[test]
    fn duplicate_field_keys_are_rejected() {
        let db = setup_db();
        let admin = create_admin(&db);

        let err = db
            .create_form(
                CreateFormInput {
                    title: "Broken".to_string(),
                    description: None,
                    tags: None,
                    fields: vec![
                        field("dup", FieldType::TextInput, 1),
                        field("dup", FieldType::TextInput, 2),
                    ],
                },
                admin.id,
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::InvalidFieldValue);
        assert!(db.list_active_forms().unwrap().is_empty());
    }

    #[test]
    fn blank_title_is_rejected() {
        let db = setup_db();
        let admin = create_admin(&db);
        let err = db
            .create_form(
                CreateFormInput {
                    title: "   ".to_string(),
                    description: None,
                    tags: None,
                    fields: vec![],
                },
                admin.id,
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::MissingRequiredField);
    }

    #[test]
    fn update_form_applies_partial_changes() {
        let (db, _admin, _staff, form) = fixture();

        let updated = db
            .update_form(
                form.id,
                UpdateFormInput {
                    title: Some("Freezer temperature log".to_string()),
                    description: Some(None),
                    tags: Some(vec![]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Freezer temperature log");
        assert_eq!(updated.description, None);
        assert!(updated.tags.is_empty());
        assert!(updated.is_active);
        assert!(updated.updated_at >= form.updated_at);
    }

    #[test]
    fn update_missing_form_is_not_found() {
        let db = setup_db();
        let err = db.update_form(5, UpdateFormInput::default()).unwrap_err();
        assert_eq!(code(err), ErrorCode::FormNotFound);
        assert!(db.get_form_with_fields(5).unwrap().is_none());
    }

    #[test]
    fn inactive_forms_are_not_listed() {
        let (db, admin, _staff, form) = fixture();
        let other = create_form(&db, &admin);

        db.update_form(
            form.id,
            UpdateFormInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

        let listed: Vec<i64> = db.list_active_forms().unwrap().iter().map(|f| f.id).collect();
        assert_eq!(listed, vec![other.id]);
        // Still retrievable directly
        assert!(db.get_form(form.id).unwrap().is_some());
    }
}

mod task_tests {
    use super::*;

    #[test]
    fn create_task_computes_next_due_date() {
        let (db, admin, staff, form) = fixture();

        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::Daily, Some(2)),
                admin.id,
            )
            .unwrap();

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.assigned_by, admin.id);
        assert_eq!(task.next_due_date, Some(at(2024, 1, 3)));
        assert_eq!(task.spawned_from, None);
    }

    #[test]
    fn non_recurring_task_stores_no_interval() {
        let (db, admin, staff, form) = fixture();

        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::None, Some(4)),
                admin.id,
            )
            .unwrap();

        assert_eq!(task.recurrence_interval, None);
        assert_eq!(task.next_due_date, None);
    }

    #[test]
    fn create_task_checks_references() {
        let (db, admin, staff, form) = fixture();

        let mut missing_form = task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::None, None);
        missing_form.form_id = 999;
        assert_eq!(
            code(db.create_task(missing_form, admin.id).unwrap_err()),
            ErrorCode::FormNotFound
        );

        let mut missing_user = task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::None, None);
        missing_user.assigned_to = 999;
        assert_eq!(
            code(db.create_task(missing_user, admin.id).unwrap_err()),
            ErrorCode::UserNotFound
        );

        let input = task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::None, None);
        assert_eq!(
            code(db.create_task(input, 999).unwrap_err()),
            ErrorCode::UserNotFound
        );
    }

    #[test]
    fn non_positive_interval_is_rejected() {
        let (db, admin, staff, form) = fixture();
        let err = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::Weekly, Some(0)),
                admin.id,
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::InvalidFieldValue);
    }

    #[test]
    fn interval_past_the_date_range_is_rejected() {
        let (db, admin, staff, form) = fixture();
        for interval in [i32::MAX, 5_000_000] {
            let err = db
                .create_task(
                    task_input(
                        &form,
                        &staff,
                        at(2024, 1, 1),
                        RecurrenceType::Monthly,
                        Some(interval),
                    ),
                    admin.id,
                )
                .unwrap_err();
            let err = AppError::from(err);
            assert_eq!(err.code, ErrorCode::InvalidFieldValue);
            assert_eq!(err.field.as_deref(), Some("recurrence_interval"));
        }
        assert!(tasks_of(&db, &staff).is_empty());
    }

    #[test]
    fn large_monthly_interval_still_chains() {
        let (db, admin, staff, form) = fixture();
        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::Monthly, Some(1200)),
                admin.id,
            )
            .unwrap();
        assert_eq!(task.next_due_date, Some(at(2124, 1, 1)));

        db.update_task_status(task.id, TaskStatus::Completed).unwrap();
        let tasks = tasks_of(&db, &staff);
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().any(|t| t.due_date == at(2124, 1, 1)));
    }

    #[test]
    fn completing_daily_task_spawns_successor() {
        let (db, admin, staff, form) = fixture();
        let t1 = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::Daily, Some(2)),
                admin.id,
            )
            .unwrap();

        let completed = db.update_task_status(t1.id, TaskStatus::Completed).unwrap();
        assert_eq!(completed.id, t1.id);
        assert_eq!(completed.status, TaskStatus::Completed);

        let tasks = tasks_of(&db, &staff);
        assert_eq!(tasks.len(), 2);
        let t2 = tasks.iter().find(|t| t.id != t1.id).unwrap();
        assert_eq!(t2.status, TaskStatus::Pending);
        assert_eq!(t2.due_date, at(2024, 1, 3));
        assert_eq!(t2.spawned_from, Some(t1.id));
        assert_eq!(t2.next_due_date, None);
        assert_eq!(t2.form_id, form.id);
        assert_eq!(t2.assigned_by, admin.id);
        assert_eq!(t2.title, t1.title);
        assert_eq!(t2.recurrence_type, RecurrenceType::Daily);
        assert_eq!(t2.recurrence_interval, Some(2));
    }

    #[test]
    fn weekly_and_monthly_successors() {
        let (db, admin, staff, form) = fixture();
        let weekly = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::Weekly, Some(3)),
                admin.id,
            )
            .unwrap();
        let monthly = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 31), RecurrenceType::Monthly, Some(1)),
                admin.id,
            )
            .unwrap();

        db.update_task_status(weekly.id, TaskStatus::Completed).unwrap();
        db.update_task_status(monthly.id, TaskStatus::Completed).unwrap();

        let tasks = tasks_of(&db, &staff);
        let successor_of = |id: i64| tasks.iter().find(|t| t.spawned_from == Some(id)).unwrap();

        assert_eq!(successor_of(weekly.id).due_date, at(2024, 1, 22));
        // Day 31 overflows February into March
        assert_eq!(successor_of(monthly.id).due_date, at(2024, 3, 2));
    }

    #[test]
    fn completing_non_recurring_task_inserts_nothing() {
        let (db, admin, staff, form) = fixture();
        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::None, None),
                admin.id,
            )
            .unwrap();

        db.update_task_status(task.id, TaskStatus::Completed).unwrap();
        assert_eq!(tasks_of(&db, &staff).len(), 1);
    }

    #[test]
    fn recurring_task_without_interval_does_not_chain() {
        let (db, admin, staff, form) = fixture();
        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::Monthly, None),
                admin.id,
            )
            .unwrap();

        db.update_task_status(task.id, TaskStatus::Completed).unwrap();
        assert_eq!(tasks_of(&db, &staff).len(), 1);
    }

    #[test]
    fn in_progress_then_completed_chains() {
        let (db, admin, staff, form) = fixture();
        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::Weekly, Some(1)),
                admin.id,
            )
            .unwrap();

        let started = db.update_task_status(task.id, TaskStatus::InProgress).unwrap();
        assert_eq!(started.status, TaskStatus::InProgress);
        assert_eq!(tasks_of(&db, &staff).len(), 1);

        db.update_task_status(task.id, TaskStatus::Completed).unwrap();
        assert_eq!(tasks_of(&db, &staff).len(), 2);
    }

    #[test]
    fn completed_is_terminal_and_idempotent() {
        let (db, admin, staff, form) = fixture();
        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::Daily, Some(1)),
                admin.id,
            )
            .unwrap();

        db.update_task_status(task.id, TaskStatus::Completed).unwrap();
        let again = db.update_task_status(task.id, TaskStatus::Completed).unwrap();
        assert_eq!(again.status, TaskStatus::Completed);
        assert_eq!(tasks_of(&db, &staff).len(), 2);

        let err = db.update_task_status(task.id, TaskStatus::Pending).unwrap_err();
        assert_eq!(code(err), ErrorCode::InvalidState);
    }

    #[test]
    fn concurrent_completion_spawns_one_successor() {
        let (db, admin, staff, form) = fixture();
        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::Daily, Some(1)),
                admin.id,
            )
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.update_task_status(task.id, TaskStatus::Completed))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let tasks = tasks_of(&db, &staff);
        assert_eq!(tasks.len(), 2);
        assert_eq!(
            tasks.iter().filter(|t| t.spawned_from == Some(task.id)).count(),
            1
        );
    }

    #[test]
    fn update_missing_task_is_not_found() {
        let db = setup_db();
        let err = db.update_task_status(404, TaskStatus::Completed).unwrap_err();
        assert_eq!(code(err), ErrorCode::TaskNotFound);
        assert_eq!(code(db.require_task(404).unwrap_err()), ErrorCode::TaskNotFound);
    }
}

mod sweeper_tests {
    use super::*;

    #[test]
    fn only_past_due_pending_tasks_become_overdue() {
        let (db, admin, staff, form) = fixture();
        let past = Utc::now() - Duration::days(2);
        let future = Utc::now() + Duration::days(2);

        let stale = db
            .create_task(task_input(&form, &staff, past, RecurrenceType::None, None), admin.id)
            .unwrap();
        let started = db
            .create_task(task_input(&form, &staff, past, RecurrenceType::None, None), admin.id)
            .unwrap();
        let upcoming = db
            .create_task(task_input(&form, &staff, future, RecurrenceType::None, None), admin.id)
            .unwrap();
        db.update_task_status(started.id, TaskStatus::InProgress).unwrap();

        assert_eq!(db.sweep_overdue_tasks().unwrap(), 1);

        assert_eq!(db.require_task(stale.id).unwrap().status, TaskStatus::Overdue);
        assert_eq!(db.require_task(started.id).unwrap().status, TaskStatus::InProgress);
        assert_eq!(db.require_task(upcoming.id).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn second_sweep_is_a_no_op() {
        let (db, admin, staff, form) = fixture();
        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::None, None),
                admin.id,
            )
            .unwrap();

        assert_eq!(db.sweep_overdue_tasks().unwrap(), 1);
        let after_first = db.require_task(task.id).unwrap();

        assert_eq!(db.sweep_overdue_tasks().unwrap(), 0);
        let after_second = db.require_task(task.id).unwrap();
        assert_eq!(after_first.updated_at, after_second.updated_at);
    }

    #[test]
    fn sweep_at_uses_strict_cutoff() {
        let (db, admin, staff, form) = fixture();
        let due = at(2024, 6, 1);
        db.create_task(task_input(&form, &staff, due, RecurrenceType::None, None), admin.id)
            .unwrap();

        assert_eq!(db.sweep_overdue_tasks_at(due).unwrap(), 0);
        assert_eq!(db.sweep_overdue_tasks_at(due + Duration::seconds(1)).unwrap(), 1);
    }

    #[test]
    fn list_all_sweeps_but_list_by_user_does_not() {
        let (db, admin, staff, form) = fixture();
        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::None, None),
                admin.id,
            )
            .unwrap();

        assert_eq!(tasks_of(&db, &staff)[0].status, TaskStatus::Pending);

        let all = db.list_all_tasks().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, task.id);
        assert_eq!(all[0].status, TaskStatus::Overdue);
    }

    #[test]
    fn overdue_task_can_still_be_completed() {
        let (db, admin, staff, form) = fixture();
        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::Daily, Some(1)),
                admin.id,
            )
            .unwrap();
        db.sweep_overdue_tasks().unwrap();

        let done = db.update_task_status(task.id, TaskStatus::Completed).unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(tasks_of(&db, &staff).len(), 2);
    }
}

mod submission_tests {
    use super::*;

    fn data() -> SubmissionData {
        let mut data = SubmissionData::new();
        data.insert("temperature".to_string(), SubmissionValue::Number(4.0));
        data.insert("notes".to_string(), SubmissionValue::Text("ok".to_string()));
        data
    }

    #[test]
    fn submission_completes_task_without_chaining() {
        let (db, admin, staff, form) = fixture();
        let task = db
            .create_task(
                task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::Daily, Some(1)),
                admin.id,
            )
            .unwrap();

        let submission = db
            .create_submission(
                CreateFormSubmissionInput {
                    form_id: form.id,
                    task_id: Some(task.id),
                    submission_data: data(),
                },
                staff.id,
            )
            .unwrap();

        assert_eq!(submission.task_id, Some(task.id));
        assert_eq!(submission.submitted_by, staff.id);
        assert_eq!(submission.submission_data, data());
        assert_eq!(db.require_task(task.id).unwrap().status, TaskStatus::Completed);
        assert_eq!(tasks_of(&db, &staff).len(), 1);
    }

    #[test]
    fn submission_checks_references() {
        let (db, _admin, staff, form) = fixture();

        let err = db
            .create_submission(
                CreateFormSubmissionInput {
                    form_id: 999,
                    task_id: None,
                    submission_data: data(),
                },
                staff.id,
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::FormNotFound);

        let err = db
            .create_submission(
                CreateFormSubmissionInput {
                    form_id: form.id,
                    task_id: Some(999),
                    submission_data: data(),
                },
                staff.id,
            )
            .unwrap_err();
        assert_eq!(code(err), ErrorCode::TaskNotFound);
        assert!(db.list_submissions(None).unwrap().is_empty());
    }

    #[test]
    fn list_joins_submitter_and_form() {
        let (db, admin, staff, form) = fixture();
        let other_form = create_form_with_tags(&db, &admin, &[]);

        for form_id in [form.id, other_form.id, form.id] {
            db.create_submission(
                CreateFormSubmissionInput {
                    form_id,
                    task_id: None,
                    submission_data: data(),
                },
                staff.id,
            )
            .unwrap();
        }

        let all = db.list_submissions(None).unwrap();
        assert_eq!(all.len(), 3);
        // Newest first
        assert!(all[0].submission.id > all[1].submission.id);
        assert_eq!(all[0].submitter_name, "Ada Lee");
        assert_eq!(all[0].submitter_email, "nurse@clinic.test");
        assert_eq!(all[0].form_title, "Fridge temperature log");

        let filtered = db.list_submissions(Some(form.id)).unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|r| r.submission.form_id == form.id));
    }

    #[test]
    fn corrupt_payload_fails_the_read() {
        let (db, _admin, staff, form) = fixture();
        db.create_submission(
            CreateFormSubmissionInput {
                form_id: form.id,
                task_id: None,
                submission_data: data(),
            },
            staff.id,
        )
        .unwrap();

        db.with_conn(|conn| {
            conn.execute("UPDATE form_submissions SET submission_data = 'not json'", [])?;
            Ok(())
        })
        .unwrap();

        let err = db.list_submissions(Some(form.id)).unwrap_err();
        assert!(err.downcast_ref::<rusqlite::Error>().is_some());
    }
}

mod analytics_tests {
    use super::*;

    #[test]
    fn organization_rate_over_mixed_statuses() {
        let (db, admin, staff, form) = fixture();
        let future = Utc::now() + Duration::days(7);

        let done = db
            .create_task(task_input(&form, &staff, future, RecurrenceType::None, None), admin.id)
            .unwrap();
        db.create_task(
            task_input(&form, &staff, at(2024, 1, 1), RecurrenceType::None, None),
            admin.id,
        )
        .unwrap();
        db.create_task(task_input(&form, &staff, future, RecurrenceType::None, None), admin.id)
            .unwrap();

        db.update_task_status(done.id, TaskStatus::Completed).unwrap();
        db.sweep_overdue_tasks().unwrap();

        let stats = db.organization_analytics(&AnalyticsFilter::default()).unwrap();
        assert_eq!(stats.total_forms, 1);
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.overdue_tasks, 1);
        assert_eq!(stats.overall_completion_rate, 33.33);
        assert_eq!(stats.active_users, 2);
    }

    #[test]
    fn organization_rate_is_zero_without_tasks() {
        let (db, _admin, _staff, _form) = fixture();
        let stats = db.organization_analytics(&AnalyticsFilter::default()).unwrap();
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.overall_completion_rate, 0.0);
    }

    #[test]
    fn organization_filters_by_assignee_and_date() {
        let (db, admin, staff, form) = fixture();
        let other = create_staff(&db, "porter@clinic.test");

        db.create_task(
            task_input(&form, &staff, at(2030, 1, 1), RecurrenceType::None, None),
            admin.id,
        )
        .unwrap();
        db.create_task(
            task_input(&form, &other, at(2030, 1, 1), RecurrenceType::None, None),
            admin.id,
        )
        .unwrap();

        let by_user = db
            .organization_analytics(&AnalyticsFilter {
                user_id: Some(other.id),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_user.total_tasks, 1);
        assert_eq!(by_user.total_forms, 1);

        let future_window = db
            .organization_analytics(&AnalyticsFilter {
                date_from: Some(Utc::now() + Duration::days(1)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(future_window.total_tasks, 0);
        assert_eq!(future_window.total_forms, 0);
        // Active users are never filtered
        assert_eq!(future_window.active_users, 3);
    }

    #[test]
    fn tag_mismatch_zeroes_form_result() {
        let db = setup_db();
        let admin = create_admin(&db);
        let form = create_form_with_tags(&db, &admin, &["test"]);
        db.create_submission(
            CreateFormSubmissionInput {
                form_id: form.id,
                task_id: None,
                submission_data: SubmissionData::new(),
            },
            admin.id,
        )
        .unwrap();

        let result = db
            .form_analytics(
                form.id,
                &AnalyticsFilter {
                    tags: vec!["nonexistent".to_string()],
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(result.total_submissions, 0);
        assert_eq!(result.completion_rate, 0.0);
        assert_eq!(result.average_completion_time, None);
        assert_eq!(result.tags, vec!["test"]);
        assert_eq!(result.form_title, "Fridge temperature log");
    }

    #[test]
    fn tags_round_trip_through_update() {
        let db = setup_db();
        let admin = create_admin(&db);
        let form = create_form_with_tags(&db, &admin, &["a", "b"]);

        let result = db.form_analytics(form.id, &AnalyticsFilter::default()).unwrap();
        assert_eq!(result.tags, vec!["a", "b"]);

        db.update_form(
            form.id,
            UpdateFormInput {
                tags: Some(vec!["b".to_string(), "a".to_string()]),
                ..Default::default()
            },
        )
        .unwrap();
        let result = db
            .form_analytics(
                form.id,
                &AnalyticsFilter {
                    tags: vec!["a".to_string()],
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.tags, vec!["b", "a"]);
    }

    #[test]
    fn form_rate_and_average_time() {
        let (db, admin, staff, form) = fixture();
        let linked = db
            .create_task(
                task_input(&form, &staff, at(2030, 1, 1), RecurrenceType::None, None),
                admin.id,
            )
            .unwrap();
        db.create_task(
            task_input(&form, &staff, at(2030, 1, 1), RecurrenceType::None, None),
            admin.id,
        )
        .unwrap();

        db.create_submission(
            CreateFormSubmissionInput {
                form_id: form.id,
                task_id: Some(linked.id),
                submission_data: SubmissionData::new(),
            },
            staff.id,
        )
        .unwrap();

        let result = db.form_analytics(form.id, &AnalyticsFilter::default()).unwrap();
        assert_eq!(result.total_submissions, 1);
        assert_eq!(result.completion_rate, 50.0);
        let avg = result.average_completion_time.expect("linked submission has a time");
        assert!(avg >= 0.0);
    }

    #[test]
    fn form_rate_stays_within_bounds() {
        let (db, admin, staff, form) = fixture();

        // No tasks: zero regardless of submissions
        db.create_submission(
            CreateFormSubmissionInput {
                form_id: form.id,
                task_id: None,
                submission_data: SubmissionData::new(),
            },
            staff.id,
        )
        .unwrap();
        let result = db.form_analytics(form.id, &AnalyticsFilter::default()).unwrap();
        assert_eq!(result.completion_rate, 0.0);
        assert_eq!(result.average_completion_time, None);

        // More ad-hoc submissions than tasks
        db.create_task(
            task_input(&form, &staff, at(2030, 1, 1), RecurrenceType::None, None),
            admin.id,
        )
        .unwrap();
        db.create_submission(
            CreateFormSubmissionInput {
                form_id: form.id,
                task_id: None,
                submission_data: SubmissionData::new(),
            },
            staff.id,
        )
        .unwrap();
        let result = db.form_analytics(form.id, &AnalyticsFilter::default()).unwrap();
        assert_eq!(result.total_submissions, 2);
        assert_eq!(result.completion_rate, 100.0);
    }

    #[test]
    fn form_filters_by_submitter() {
        let (db, admin, staff, form) = fixture();
        db.create_task(
            task_input(&form, &staff, at(2030, 1, 1), RecurrenceType::None, None),
            admin.id,
        )
        .unwrap();
        db.create_submission(
            CreateFormSubmissionInput {
                form_id: form.id,
                task_id: None,
                submission_data: SubmissionData::new(),
            },
            admin.id,
        )
        .unwrap();

        let result = db
            .form_analytics(
                form.id,
                &AnalyticsFilter {
                    user_id: Some(staff.id),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(result.total_submissions, 0);
        assert_eq!(result.completion_rate, 0.0);
    }

    #[test]
    fn missing_form_is_not_found() {
        let db = setup_db();
        let err = db.form_analytics(1, &AnalyticsFilter::default()).unwrap_err();
        assert_eq!(code(err), ErrorCode::FormNotFound);
    }
}
