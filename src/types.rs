//! Core data types for the Foresight backend
//!
//! This module defines the fundamental data structures used throughout
//! foresight: users, projects, tasks, dependency edges, comments, and the
//! risk-scoring request/response types.

use crate::error::{ForesightError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Workflow state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
    Delayed,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    /// Stable string form used for database storage and query filters
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Delayed => "delayed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the storage string form
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "not_started" => Ok(TaskStatus::NotStarted),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "delayed" => Ok(TaskStatus::Delayed),
            "blocked" => Ok(TaskStatus::Blocked),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(ForesightError::Validation(format!(
                "invalid task status: {}",
                other
            ))),
        }
    }
}

/// Task priority level
///
/// Maps to the numeric `priority_level` feature consumed by the risk model
/// (Low=1 .. Critical=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    /// Numeric level used as a model feature (1-4)
    pub fn level(&self) -> u8 {
        match self {
            TaskPriority::Low => 1,
            TaskPriority::Medium => 2,
            TaskPriority::High => 3,
            TaskPriority::Critical => 4,
        }
    }

    /// Stable string form used for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }

    /// Parse the storage string form
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "critical" => Ok(TaskPriority::Critical),
            other => Err(ForesightError::Validation(format!(
                "invalid task priority: {}",
                other
            ))),
        }
    }
}

/// An account that can be assigned to tasks
///
/// Credentials and sign-in live outside this service; the API is gated
/// by a static bearer token, so users here are directory entries only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    /// e.g. "user", "manager", "admin"
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_role() -> String {
    "user".to_string()
}

fn default_active() -> bool {
    true
}

/// Partial update for a user; unset fields are left unchanged
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// A project grouping a set of tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    /// Total allocated budget
    pub budget: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub budget: Option<f64>,
}

/// Partial update for a project; unset fields are left unchanged
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub budget: Option<f64>,
}

/// A unit of work within a project
///
/// `dependency_count` is derived at read time from the dependency edges
/// where this task is the dependent side; it is not a stored column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    /// User currently responsible for the work, if any
    pub assignee_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    pub completion_percentage: f64,
    /// Last computed risk score; persisted by callers of the risk
    /// subsystem, never written by the risk subsystem itself
    pub risk_score: f64,
    pub dependency_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub project_id: i64,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: TaskStatus,
    #[serde(default = "default_priority")]
    pub priority: TaskPriority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub actual_hours: f64,
    #[serde(default)]
    pub completion_percentage: f64,
}

fn default_status() -> TaskStatus {
    TaskStatus::NotStarted
}

fn default_priority() -> TaskPriority {
    TaskPriority::Medium
}

/// Partial update for a task; unset fields are left unchanged
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub assignee_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub completion_percentage: Option<f64>,
}

/// A directed dependency edge: the dependent task cannot proceed until
/// the prerequisite task allows it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDependency {
    pub id: i64,
    pub dependent_task_id: i64,
    pub prerequisite_task_id: i64,
    /// Scheduling relation, e.g. "finish-to-start"
    pub dependency_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a dependency edge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDependency {
    pub dependent_task_id: i64,
    pub prerequisite_task_id: i64,
    pub dependency_type: Option<String>,
}

/// A comment attached to a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskComment {
    pub id: i64,
    pub task_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A stored notification for a user
///
/// Written by callers (e.g. assignment or risk-alert flows); read and
/// acknowledged through the store, not served over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    /// e.g. "task_due", "task_assigned", "risk_alert"
    pub notification_type: Option<String>,
    pub related_task_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for recording a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub notification_type: Option<String>,
    pub related_task_id: Option<i64>,
}

/// A ledger line against a project's budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub id: i64,
    pub project_id: i64,
    pub description: Option<String>,
    pub amount: f64,
    /// "planned", "actual", or "forecast"
    pub entry_type: String,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Payload for recording a budget entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBudgetEntry {
    pub project_id: i64,
    pub description: Option<String>,
    pub amount: f64,
    pub entry_type: String,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Caller-supplied inputs to the risk model
///
/// Validated at the API boundary; the risk core assumes validated input
/// and is total over the declared domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactors {
    /// How complex the work is (0-10)
    pub task_complexity: f64,
    /// How available the needed resources are (0-10)
    pub resource_availability: f64,
    /// Number of dependency edges where the task is the dependent side
    pub dependency_count: u32,
    /// Number of past delays attributed to this work
    pub historical_delays: u32,
    /// Estimated effort in hours
    pub estimated_hours: f64,
    /// Priority level (1=low .. 4=critical)
    pub priority_level: u8,
}

impl RiskFactors {
    /// Validate declared ranges before the factors reach the risk core
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=10.0).contains(&self.task_complexity) {
            return Err(ForesightError::Validation(
                "task_complexity must be in [0, 10]".to_string(),
            ));
        }
        if !(0.0..=10.0).contains(&self.resource_availability) {
            return Err(ForesightError::Validation(
                "resource_availability must be in [0, 10]".to_string(),
            ));
        }
        if self.estimated_hours < 0.0 || !self.estimated_hours.is_finite() {
            return Err(ForesightError::Validation(
                "estimated_hours must be a non-negative number".to_string(),
            ));
        }
        if !(1..=4).contains(&self.priority_level) {
            return Err(ForesightError::Validation(
                "priority_level must be in 1..=4".to_string(),
            ));
        }
        Ok(())
    }
}

/// Qualitative risk band derived from the numeric score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Map a score to its band. Thresholds are closed and evaluated in
    /// order: >=7.5 Critical, >=5.0 High, >=2.5 Medium, else Low.
    pub fn from_score(score: f64) -> Self {
        if score >= 7.5 {
            RiskLevel::Critical
        } else if score >= 5.0 {
            RiskLevel::High
        } else if score >= 2.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
            RiskLevel::Critical => write!(f, "Critical"),
        }
    }
}

/// Result of a risk prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPrediction {
    /// Predicted score, clamped to [0, 10]
    pub risk_score: f64,
    /// Qualitative band for the score
    pub risk_level: RiskLevel,
    /// Per-feature importance weights (sum to 1), empty when the model
    /// exposes no importances
    pub contributing_factors: BTreeMap<String, f64>,
    /// 2-4 canned mitigation suggestions, no duplicates
    pub mitigation_suggestions: Vec<String>,
}
