//! Core types for the compliance tracker.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declares a string-backed enum persisted as TEXT.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            #[allow(clippy::should_implement_trait)]
            pub fn from_str(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(self.as_str().into())
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                let text = value.as_str()?;
                $name::from_str(text).ok_or_else(|| {
                    rusqlite::types::FromSqlError::Other(
                        format!("unknown {} value: {}", stringify!($name), text).into(),
                    )
                })
            }
        }
    };
}

text_enum! {
    /// Account role. Admins manage users, assign tasks and see organization analytics.
    pub enum UserRole {
        Admin => "admin",
        StandardUser => "standard_user",
    }
}

text_enum! {
    /// Input widget a form field renders as.
    pub enum FieldType {
        TextInput => "text_input",
        NumberInput => "number_input",
        TextArea => "text_area",
        Checkbox => "checkbox",
        RadioButton => "radio_button",
        SelectDropdown => "select_dropdown",
        DatePicker => "date_picker",
    }
}

text_enum! {
    /// Task lifecycle status.
    pub enum TaskStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Overdue => "overdue",
    }
}

text_enum! {
    /// How a completed task schedules its successor.
    pub enum RecurrenceType {
        None => "none",
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
    }
}

impl RecurrenceType {
    pub fn is_recurring(&self) -> bool {
        !matches!(self, RecurrenceType::None)
    }
}

/// A user account. The password hash never leaves the store layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
        }
    }
}

/// User identity returned alongside a login token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

/// Partial user update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginOutput {
    pub token: String,
    pub user: UserSummary,
}

/// A compliance form template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single field of a form, rendered in `field_order`. `field_options`
/// lists the choices for radio and select fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    pub id: i64,
    pub form_id: i64,
    pub field_type: FieldType,
    pub field_label: String,
    pub field_key: String,
    pub is_required: bool,
    pub field_options: Option<Vec<String>>,
    pub field_order: i32,
    pub created_at: DateTime<Utc>,
}

/// A form with its ordered fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormWithFields {
    #[serde(flatten)]
    pub form: Form,
    pub fields: Vec<FormField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormFieldInput {
    pub field_type: FieldType,
    pub field_label: String,
    pub field_key: String,
    #[serde(default)]
    pub is_required: bool,
    pub field_options: Option<Vec<String>>,
    pub field_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFormInput {
    pub title: String,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub fields: Vec<FormFieldInput>,
}

/// Partial form update. `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFormInput {
    pub title: Option<String>,
    #[serde(default, with = "double_option")]
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// A form assigned to a user with a due date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub form_id: i64,
    pub assigned_to: i64,
    pub assigned_by: i64,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub status: TaskStatus,
    pub recurrence_type: RecurrenceType,
    pub recurrence_interval: Option<i32>,
    pub next_due_date: Option<DateTime<Utc>>,
    /// The task whose completion created this one.
    pub spawned_from: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub form_id: i64,
    pub assigned_to: i64,
    pub title: String,
    pub due_date: DateTime<Utc>,
    #[serde(default = "default_recurrence")]
    pub recurrence_type: RecurrenceType,
    pub recurrence_interval: Option<i32>,
}

fn default_recurrence() -> RecurrenceType {
    RecurrenceType::None
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskStatusInput {
    pub status: TaskStatus,
}

/// One response value in a submission payload.
///
/// Untagged: booleans and numbers keep their JSON type, ISO dates
/// (`YYYY-MM-DD`) become dates, any other string stays text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmissionValue {
    Bool(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

/// Field key to response value.
pub type SubmissionData = BTreeMap<String, SubmissionValue>;

/// An immutable completed form instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSubmission {
    pub id: i64,
    pub form_id: i64,
    pub task_id: Option<i64>,
    pub submitted_by: i64,
    pub submission_data: SubmissionData,
    pub submitted_at: DateTime<Utc>,
}

/// A submission joined with its submitter and form for list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    #[serde(flatten)]
    pub submission: FormSubmission,
    pub submitter_name: String,
    pub submitter_email: String,
    pub form_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFormSubmissionInput {
    pub form_id: i64,
    pub task_id: Option<i64>,
    pub submission_data: SubmissionData,
}

/// Optional narrowing applied to analytics queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsFilter {
    #[serde(default)]
    pub tags: Vec<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub user_id: Option<i64>,
}

/// Completion metrics for one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormAnalytics {
    pub form_id: i64,
    pub form_title: String,
    pub total_submissions: i64,
    /// Percentage in `[0, 100]`, two decimals.
    pub completion_rate: f64,
    /// Mean seconds from task creation to submission.
    pub average_completion_time: Option<f64>,
    pub tags: Vec<String>,
}

/// Organization-wide completion metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationAnalytics {
    pub total_forms: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub overdue_tasks: i64,
    pub overall_completion_rate: f64,
    pub active_users: i64,
}

/// Distinguishes an absent key from an explicit `null` for partial updates.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
