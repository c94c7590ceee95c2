//! SQLite persistence for users, projects, tasks, dependencies, comments,
//! notifications, and budget entries
//!
//! A single bundled-SQLite connection guarded by an async mutex; every
//! query here is a small indexed read or a single-row write, so blocking
//! inside the lock is fine. The schema is created idempotently on open.

use crate::error::{ForesightError, Result};
use crate::types::{
    BudgetEntry, NewBudgetEntry, NewDependency, NewNotification, NewProject, NewTask, NewUser,
    Notification, Project, ProjectUpdate, Task, TaskComment, TaskDependency, TaskStatus,
    TaskUpdate, User, UserUpdate,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL UNIQUE,
    full_name TEXT,
    role TEXT NOT NULL DEFAULT 'user',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT,
    start_date TEXT,
    end_date TEXT,
    status TEXT,
    budget REAL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    assignee_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL,
    priority TEXT NOT NULL,
    start_date TEXT,
    due_date TEXT,
    estimated_hours REAL,
    actual_hours REAL NOT NULL DEFAULT 0,
    completion_percentage REAL NOT NULL DEFAULT 0,
    risk_score REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS task_dependencies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dependent_task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    prerequisite_task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    dependency_type TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS task_comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    notification_type TEXT,
    related_task_id INTEGER REFERENCES tasks(id) ON DELETE SET NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS budget_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    description TEXT,
    amount REAL NOT NULL,
    entry_type TEXT NOT NULL,
    category TEXT,
    date TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assignee_id);
CREATE INDEX IF NOT EXISTS idx_deps_dependent ON task_dependencies(dependent_task_id);
CREATE INDEX IF NOT EXISTS idx_deps_prerequisite ON task_dependencies(prerequisite_task_id);
CREATE INDEX IF NOT EXISTS idx_comments_task ON task_comments(task_id);
CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
CREATE INDEX IF NOT EXISTS idx_budget_entries_project ON budget_entries(project_id);
";

/// Query filters for task listing
#[derive(Debug, Default, Clone)]
pub struct TaskFilter {
    pub project_id: Option<i64>,
    pub status: Option<TaskStatus>,
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema
    pub fn open(path: &str) -> Result<Self> {
        info!("Opening SQLite database at {}", path);
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (tests)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // === Users ===

    /// Create a user, rejecting duplicate emails and usernames
    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let conn = self.conn.lock().await;
        Self::check_user_unique(&conn, &new.email, &new.username, None)?;

        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (email, username, full_name, role, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new.email,
                new.username,
                new.full_name,
                new.role,
                new.is_active,
                now,
                now
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::user_by_id(&conn, id)
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        let conn = self.conn.lock().await;
        Self::user_by_id(&conn, id)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT * FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    pub async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User> {
        let conn = self.conn.lock().await;
        let mut user = Self::user_by_id(&conn, id)?;

        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(full_name) = update.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(is_active) = update.is_active {
            user.is_active = is_active;
        }
        Self::check_user_unique(&conn, &user.email, &user.username, Some(id))?;
        user.updated_at = Utc::now();

        conn.execute(
            "UPDATE users SET email = ?1, username = ?2, full_name = ?3, role = ?4,
             is_active = ?5, updated_at = ?6 WHERE id = ?7",
            params![
                user.email,
                user.username,
                user.full_name,
                user.role,
                user.is_active,
                user.updated_at,
                id
            ],
        )?;
        Ok(user)
    }

    pub async fn delete_user(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(ForesightError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    fn user_by_id(conn: &Connection, id: i64) -> Result<User> {
        conn.query_row("SELECT * FROM users WHERE id = ?1", params![id], row_to_user)
            .optional()?
            .ok_or_else(|| ForesightError::NotFound(format!("user {}", id)))
    }

    /// Reject an email or username already held by a different user
    fn check_user_unique(
        conn: &Connection,
        email: &str,
        username: &str,
        exclude_id: Option<i64>,
    ) -> Result<()> {
        let exclude = exclude_id.unwrap_or(-1);
        let email_taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1 AND id != ?2)",
            params![email, exclude],
            |row| row.get(0),
        )?;
        if email_taken {
            return Err(ForesightError::Conflict(format!(
                "a user with email {} already exists",
                email
            )));
        }
        let username_taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 AND id != ?2)",
            params![username, exclude],
            |row| row.get(0),
        )?;
        if username_taken {
            return Err(ForesightError::Conflict(format!(
                "a user with username {} already exists",
                username
            )));
        }
        Ok(())
    }

    // === Projects ===

    pub async fn create_project(&self, new: NewProject) -> Result<Project> {
        let conn = self.conn.lock().await;
        let now = Utc::now();
        conn.execute(
            "INSERT INTO projects (name, description, start_date, end_date, status, budget, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                new.name,
                new.description,
                new.start_date,
                new.end_date,
                new.status,
                new.budget,
                now,
                now
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::project_by_id(&conn, id)
    }

    pub async fn get_project(&self, id: i64) -> Result<Project> {
        let conn = self.conn.lock().await;
        Self::project_by_id(&conn, id)
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT * FROM projects ORDER BY id")?;
        let projects = stmt
            .query_map([], row_to_project)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    pub async fn update_project(&self, id: i64, update: ProjectUpdate) -> Result<Project> {
        let conn = self.conn.lock().await;
        let mut project = Self::project_by_id(&conn, id)?;

        if let Some(name) = update.name {
            project.name = name;
        }
        if let Some(description) = update.description {
            project.description = Some(description);
        }
        if let Some(start_date) = update.start_date {
            project.start_date = Some(start_date);
        }
        if let Some(end_date) = update.end_date {
            project.end_date = Some(end_date);
        }
        if let Some(status) = update.status {
            project.status = Some(status);
        }
        if let Some(budget) = update.budget {
            project.budget = Some(budget);
        }
        project.updated_at = Utc::now();

        conn.execute(
            "UPDATE projects SET name = ?1, description = ?2, start_date = ?3,
             end_date = ?4, status = ?5, budget = ?6, updated_at = ?7 WHERE id = ?8",
            params![
                project.name,
                project.description,
                project.start_date,
                project.end_date,
                project.status,
                project.budget,
                project.updated_at,
                id
            ],
        )?;
        Ok(project)
    }

    pub async fn delete_project(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(ForesightError::NotFound(format!("project {}", id)));
        }
        Ok(())
    }

    fn project_by_id(conn: &Connection, id: i64) -> Result<Project> {
        conn.query_row(
            "SELECT * FROM projects WHERE id = ?1",
            params![id],
            row_to_project,
        )
        .optional()?
        .ok_or_else(|| ForesightError::NotFound(format!("project {}", id)))
    }

    // === Tasks ===

    pub async fn create_task(&self, new: NewTask) -> Result<Task> {
        let conn = self.conn.lock().await;
        // Creating a task in a missing project or against a missing
        // assignee is a caller error, not a foreign-key surprise
        Self::project_by_id(&conn, new.project_id)?;
        if let Some(assignee_id) = new.assignee_id {
            Self::user_by_id(&conn, assignee_id)?;
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO tasks (project_id, assignee_id, title, description, status, priority,
             start_date, due_date, estimated_hours, actual_hours, completion_percentage,
             risk_score, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, ?13)",
            params![
                new.project_id,
                new.assignee_id,
                new.title,
                new.description,
                new.status.as_str(),
                new.priority.as_str(),
                new.start_date,
                new.due_date,
                new.estimated_hours,
                new.actual_hours,
                new.completion_percentage,
                now,
                now
            ],
        )?;
        let id = conn.last_insert_rowid();
        Self::task_by_id(&conn, id)
    }

    pub async fn get_task(&self, id: i64) -> Result<Task> {
        let conn = self.conn.lock().await;
        Self::task_by_id(&conn, id)
    }

    pub async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>> {
        let conn = self.conn.lock().await;
        let mut sql = String::from(TASK_SELECT);
        let mut clauses = Vec::new();
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(project_id) = filter.project_id {
            clauses.push(format!("t.project_id = ?{}", args.len() + 1));
            args.push(Box::new(project_id));
        }
        if let Some(status) = filter.status {
            clauses.push(format!("t.status = ?{}", args.len() + 1));
            args.push(Box::new(status.as_str().to_string()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY t.id");

        let mut stmt = conn.prepare(&sql)?;
        let params = rusqlite::params_from_iter(args.iter().map(|a| a.as_ref()));
        let tasks = stmt
            .query_map(params, row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    pub async fn update_task(&self, id: i64, update: TaskUpdate) -> Result<Task> {
        let conn = self.conn.lock().await;
        let mut task = Self::task_by_id(&conn, id)?;

        if let Some(assignee_id) = update.assignee_id {
            Self::user_by_id(&conn, assignee_id)?;
            task.assignee_id = Some(assignee_id);
        }
        if let Some(title) = update.title {
            task.title = title;
        }
        if let Some(description) = update.description {
            task.description = Some(description);
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(start_date) = update.start_date {
            task.start_date = Some(start_date);
        }
        if let Some(due_date) = update.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(estimated_hours) = update.estimated_hours {
            task.estimated_hours = Some(estimated_hours);
        }
        if let Some(actual_hours) = update.actual_hours {
            task.actual_hours = actual_hours;
        }
        if let Some(completion_percentage) = update.completion_percentage {
            task.completion_percentage = completion_percentage;
        }
        task.updated_at = Utc::now();

        conn.execute(
            "UPDATE tasks SET assignee_id = ?1, title = ?2, description = ?3, status = ?4,
             priority = ?5, start_date = ?6, due_date = ?7, estimated_hours = ?8,
             actual_hours = ?9, completion_percentage = ?10, updated_at = ?11 WHERE id = ?12",
            params![
                task.assignee_id,
                task.title,
                task.description,
                task.status.as_str(),
                task.priority.as_str(),
                task.start_date,
                task.due_date,
                task.estimated_hours,
                task.actual_hours,
                task.completion_percentage,
                task.updated_at,
                id
            ],
        )?;
        Ok(task)
    }

    pub async fn delete_task(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(ForesightError::NotFound(format!("task {}", id)));
        }
        Ok(())
    }

    /// Persist a computed risk score onto a task row
    ///
    /// The risk subsystem never calls this itself; request handlers do.
    pub async fn set_task_risk_score(&self, id: i64, score: f64) -> Result<()> {
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE tasks SET risk_score = ?1, updated_at = ?2 WHERE id = ?3",
            params![score, Utc::now(), id],
        )?;
        if updated == 0 {
            return Err(ForesightError::NotFound(format!("task {}", id)));
        }
        Ok(())
    }

    fn task_by_id(conn: &Connection, id: i64) -> Result<Task> {
        conn.query_row(
            &format!("{} WHERE t.id = ?1", TASK_SELECT),
            params![id],
            row_to_task,
        )
        .optional()?
        .ok_or_else(|| ForesightError::NotFound(format!("task {}", id)))
    }

    // === Dependencies ===

    /// Create a dependency edge after validating both endpoints
    ///
    /// Rejected: missing tasks, direct self-loops, cross-project edges,
    /// and exact duplicate edges. Transitive cycles are not detected.
    pub async fn create_dependency(&self, new: NewDependency) -> Result<TaskDependency> {
        let conn = self.conn.lock().await;

        if new.dependent_task_id == new.prerequisite_task_id {
            return Err(ForesightError::Validation(
                "a task cannot depend on itself".to_string(),
            ));
        }

        let dependent = Self::task_by_id(&conn, new.dependent_task_id)?;
        let prerequisite = Self::task_by_id(&conn, new.prerequisite_task_id)?;

        if dependent.project_id != prerequisite.project_id {
            return Err(ForesightError::Validation(
                "tasks must belong to the same project".to_string(),
            ));
        }

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM task_dependencies
             WHERE dependent_task_id = ?1 AND prerequisite_task_id = ?2)",
            params![new.dependent_task_id, new.prerequisite_task_id],
            |row| row.get(0),
        )?;
        if exists {
            return Err(ForesightError::Conflict(
                "dependency already exists".to_string(),
            ));
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO task_dependencies (dependent_task_id, prerequisite_task_id, dependency_type, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                new.dependent_task_id,
                new.prerequisite_task_id,
                new.dependency_type,
                now
            ],
        )?;
        let id = conn.last_insert_rowid();

        conn.query_row(
            "SELECT id, dependent_task_id, prerequisite_task_id, dependency_type, created_at
             FROM task_dependencies WHERE id = ?1",
            params![id],
            row_to_dependency,
        )
        .map_err(Into::into)
    }

    /// List dependency edges, optionally restricted to those touching
    /// `task_id` on either side
    pub async fn list_dependencies(&self, task_id: Option<i64>) -> Result<Vec<TaskDependency>> {
        let conn = self.conn.lock().await;
        let base = "SELECT id, dependent_task_id, prerequisite_task_id, dependency_type, created_at
             FROM task_dependencies";

        let deps = match task_id {
            Some(task_id) => {
                Self::task_by_id(&conn, task_id)?;
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE dependent_task_id = ?1 OR prerequisite_task_id = ?1 ORDER BY id",
                    base
                ))?;
                let deps = stmt
                    .query_map(params![task_id], row_to_dependency)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                deps
            }
            None => {
                let mut stmt = conn.prepare(&format!("{} ORDER BY id", base))?;
                let deps = stmt
                    .query_map([], row_to_dependency)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                deps
            }
        };
        Ok(deps)
    }

    pub async fn delete_dependency(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM task_dependencies WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(ForesightError::NotFound(format!("dependency {}", id)));
        }
        Ok(())
    }

    // === Comments ===

    pub async fn add_comment(&self, task_id: i64, content: String) -> Result<TaskComment> {
        let conn = self.conn.lock().await;
        Self::task_by_id(&conn, task_id)?;

        let now = Utc::now();
        conn.execute(
            "INSERT INTO task_comments (task_id, content, created_at) VALUES (?1, ?2, ?3)",
            params![task_id, content, now],
        )?;
        Ok(TaskComment {
            id: conn.last_insert_rowid(),
            task_id,
            content,
            created_at: now,
        })
    }

    pub async fn list_comments(&self, task_id: i64) -> Result<Vec<TaskComment>> {
        let conn = self.conn.lock().await;
        Self::task_by_id(&conn, task_id)?;

        let mut stmt = conn.prepare(
            "SELECT id, task_id, content, created_at FROM task_comments
             WHERE task_id = ?1 ORDER BY id",
        )?;
        let comments = stmt
            .query_map(params![task_id], |row| {
                Ok(TaskComment {
                    id: row.get(0)?,
                    task_id: row.get(1)?,
                    content: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }

    // === Notifications ===

    /// Record a notification for a user
    pub async fn add_notification(&self, new: NewNotification) -> Result<Notification> {
        let conn = self.conn.lock().await;
        Self::user_by_id(&conn, new.user_id)?;
        if let Some(task_id) = new.related_task_id {
            Self::task_by_id(&conn, task_id)?;
        }

        let now = Utc::now();
        conn.execute(
            "INSERT INTO notifications (user_id, title, message, notification_type, related_task_id, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                new.user_id,
                new.title,
                new.message,
                new.notification_type,
                new.related_task_id,
                now
            ],
        )?;
        Ok(Notification {
            id: conn.last_insert_rowid(),
            user_id: new.user_id,
            title: new.title,
            message: new.message,
            notification_type: new.notification_type,
            related_task_id: new.related_task_id,
            is_read: false,
            created_at: now,
        })
    }

    /// List a user's notifications, newest first
    pub async fn list_notifications(&self, user_id: i64) -> Result<Vec<Notification>> {
        let conn = self.conn.lock().await;
        Self::user_by_id(&conn, user_id)?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, message, notification_type, related_task_id, is_read, created_at
             FROM notifications WHERE user_id = ?1 ORDER BY id DESC",
        )?;
        let notifications = stmt
            .query_map(params![user_id], row_to_notification)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notifications)
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().await;
        let updated = conn.execute(
            "UPDATE notifications SET is_read = 1 WHERE id = ?1",
            params![id],
        )?;
        if updated == 0 {
            return Err(ForesightError::NotFound(format!("notification {}", id)));
        }
        Ok(())
    }

    // === Budget entries ===

    /// Record a ledger line against a project's budget
    pub async fn add_budget_entry(&self, new: NewBudgetEntry) -> Result<BudgetEntry> {
        let conn = self.conn.lock().await;
        Self::project_by_id(&conn, new.project_id)?;

        let now = Utc::now();
        conn.execute(
            "INSERT INTO budget_entries (project_id, description, amount, entry_type, category, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new.project_id,
                new.description,
                new.amount,
                new.entry_type,
                new.category,
                new.date,
                now
            ],
        )?;
        Ok(BudgetEntry {
            id: conn.last_insert_rowid(),
            project_id: new.project_id,
            description: new.description,
            amount: new.amount,
            entry_type: new.entry_type,
            category: new.category,
            date: new.date,
            created_at: now,
        })
    }

    pub async fn list_budget_entries(&self, project_id: i64) -> Result<Vec<BudgetEntry>> {
        let conn = self.conn.lock().await;
        Self::project_by_id(&conn, project_id)?;

        let mut stmt = conn.prepare(
            "SELECT id, project_id, description, amount, entry_type, category, date, created_at
             FROM budget_entries WHERE project_id = ?1 ORDER BY id",
        )?;
        let entries = stmt
            .query_map(params![project_id], row_to_budget_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

/// Shared SELECT with the dependency-count subquery tasks are always
/// read with
const TASK_SELECT: &str = "SELECT t.id, t.project_id, t.assignee_id, t.title, t.description,
     t.status, t.priority, t.start_date, t.due_date, t.estimated_hours, t.actual_hours,
     t.completion_percentage, t.risk_score, t.created_at, t.updated_at,
     (SELECT COUNT(*) FROM task_dependencies d WHERE d.dependent_task_id = t.id) AS dependency_count
     FROM tasks t";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        username: row.get("username")?,
        full_name: row.get("full_name")?,
        role: row.get("role")?,
        is_active: row.get("is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        status: row.get("status")?,
        budget: row.get("budget")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status_str: String = row.get("status")?;
    let priority_str: String = row.get("priority")?;
    let status = TaskStatus::parse(&status_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let priority = crate::types::TaskPriority::parse(&priority_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let dependency_count: i64 = row.get("dependency_count")?;

    Ok(Task {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        assignee_id: row.get("assignee_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        priority,
        start_date: row.get("start_date")?,
        due_date: row.get("due_date")?,
        estimated_hours: row.get("estimated_hours")?,
        actual_hours: row.get("actual_hours")?,
        completion_percentage: row.get("completion_percentage")?,
        risk_score: row.get("risk_score")?,
        dependency_count: dependency_count as u32,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_dependency(row: &Row<'_>) -> rusqlite::Result<TaskDependency> {
    Ok(TaskDependency {
        id: row.get(0)?,
        dependent_task_id: row.get(1)?,
        prerequisite_task_id: row.get(2)?,
        dependency_type: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn row_to_notification(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        notification_type: row.get(4)?,
        related_task_id: row.get(5)?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn row_to_budget_entry(row: &Row<'_>) -> rusqlite::Result<BudgetEntry> {
    Ok(BudgetEntry {
        id: row.get(0)?,
        project_id: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        entry_type: row.get(4)?,
        category: row.get(5)?,
        date: row.get(6)?,
        created_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskPriority;
    use chrono::Duration;

    async fn store_with_project() -> (SqliteStore, Project) {
        let store = SqliteStore::open_in_memory().unwrap();
        let project = store
            .create_project(NewProject {
                name: "Apollo".to_string(),
                description: Some("test project".to_string()),
                start_date: None,
                end_date: None,
                status: Some("active".to_string()),
                budget: Some(50_000.0),
            })
            .await
            .unwrap();
        (store, project)
    }

    fn new_task(project_id: i64, title: &str) -> NewTask {
        NewTask {
            project_id,
            assignee_id: None,
            title: title.to_string(),
            description: None,
            status: TaskStatus::NotStarted,
            priority: TaskPriority::Medium,
            start_date: None,
            due_date: None,
            estimated_hours: Some(8.0),
            actual_hours: 0.0,
            completion_percentage: 0.0,
        }
    }

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: username.to_string(),
            full_name: None,
            role: "user".to_string(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_project_crud() {
        let (store, project) = store_with_project().await;
        assert_eq!(project.name, "Apollo");

        let fetched = store.get_project(project.id).await.unwrap();
        assert_eq!(fetched.id, project.id);

        let updated = store
            .update_project(
                project.id,
                ProjectUpdate {
                    name: Some("Artemis".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Artemis");
        assert_eq!(updated.status.as_deref(), Some("active"));

        store.delete_project(project.id).await.unwrap();
        assert!(matches!(
            store.get_project(project.id).await,
            Err(ForesightError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_project_budget_stored_and_updated() {
        let (store, project) = store_with_project().await;
        assert_eq!(project.budget, Some(50_000.0));

        let updated = store
            .update_project(
                project.id,
                ProjectUpdate {
                    budget: Some(75_000.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.budget, Some(75_000.0));
        assert_eq!(updated.name, "Apollo");

        let fetched = store.get_project(project.id).await.unwrap();
        assert_eq!(fetched.budget, Some(75_000.0));
    }

    #[tokio::test]
    async fn test_user_crud() {
        let store = SqliteStore::open_in_memory().unwrap();
        let user = store
            .create_user(new_user("ada@example.com", "ada"))
            .await
            .unwrap();
        assert_eq!(user.role, "user");
        assert!(user.is_active);

        let fetched = store.get_user(user.id).await.unwrap();
        assert_eq!(fetched.email, "ada@example.com");

        let updated = store
            .update_user(
                user.id,
                UserUpdate {
                    full_name: Some("Ada Lovelace".to_string()),
                    role: Some("admin".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(updated.role, "admin");

        assert_eq!(store.list_users().await.unwrap().len(), 1);

        store.delete_user(user.id).await.unwrap();
        assert!(matches!(
            store.get_user(user.id).await,
            Err(ForesightError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_user_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .create_user(new_user("ada@example.com", "ada"))
            .await
            .unwrap();

        let same_email = store
            .create_user(new_user("ada@example.com", "countess"))
            .await;
        assert!(matches!(same_email, Err(ForesightError::Conflict(_))));

        let same_username = store.create_user(new_user("other@example.com", "ada")).await;
        assert!(matches!(same_username, Err(ForesightError::Conflict(_))));

        // Updating a different user into a taken email is rejected too
        let second = store
            .create_user(new_user("grace@example.com", "grace"))
            .await
            .unwrap();
        let collision = store
            .update_user(
                second.id,
                UserUpdate {
                    email: Some("ada@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(collision, Err(ForesightError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_task_assignee_linkage() {
        let (store, project) = store_with_project().await;
        let user = store
            .create_user(new_user("ada@example.com", "ada"))
            .await
            .unwrap();

        let mut new = new_task(project.id, "model review");
        new.assignee_id = Some(user.id);
        let task = store.create_task(new).await.unwrap();
        assert_eq!(task.assignee_id, Some(user.id));

        // A missing assignee is a caller error
        let mut orphan = new_task(project.id, "orphan");
        orphan.assignee_id = Some(999);
        assert!(matches!(
            store.create_task(orphan).await,
            Err(ForesightError::NotFound(_))
        ));

        // Deleting the user unassigns, not cascades
        store.delete_user(user.id).await.unwrap();
        let task = store.get_task(task.id).await.unwrap();
        assert_eq!(task.assignee_id, None);
    }

    #[tokio::test]
    async fn test_reassignment_via_update() {
        let (store, project) = store_with_project().await;
        let ada = store
            .create_user(new_user("ada@example.com", "ada"))
            .await
            .unwrap();
        let grace = store
            .create_user(new_user("grace@example.com", "grace"))
            .await
            .unwrap();

        let mut new = new_task(project.id, "handled off");
        new.assignee_id = Some(ada.id);
        let task = store.create_task(new).await.unwrap();

        let updated = store
            .update_task(
                task.id,
                TaskUpdate {
                    assignee_id: Some(grace.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.assignee_id, Some(grace.id));
    }

    #[tokio::test]
    async fn test_task_crud_and_filters() {
        let (store, project) = store_with_project().await;

        let task = store
            .create_task(new_task(project.id, "design schema"))
            .await
            .unwrap();
        assert_eq!(task.dependency_count, 0);
        assert_eq!(task.risk_score, 0.0);

        let mut second = new_task(project.id, "write migrations");
        second.status = TaskStatus::InProgress;
        second.due_date = Some(Utc::now() + Duration::days(14));
        store.create_task(second).await.unwrap();

        let all = store.list_tasks(TaskFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let in_progress = store
            .list_tasks(TaskFilter {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].title, "write migrations");

        let updated = store
            .update_task(
                task.id,
                TaskUpdate {
                    completion_percentage: Some(60.0),
                    priority: Some(TaskPriority::High),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.completion_percentage, 60.0);
        assert_eq!(updated.priority, TaskPriority::High);

        store.delete_task(task.id).await.unwrap();
        assert!(store.get_task(task.id).await.is_err());
    }

    #[tokio::test]
    async fn test_create_task_requires_project() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.create_task(new_task(999, "orphan")).await;
        assert!(matches!(result, Err(ForesightError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_dependency_validation() {
        let (store, project) = store_with_project().await;
        let a = store.create_task(new_task(project.id, "a")).await.unwrap();
        let b = store.create_task(new_task(project.id, "b")).await.unwrap();

        // Self-loop rejected
        let self_loop = store
            .create_dependency(NewDependency {
                dependent_task_id: a.id,
                prerequisite_task_id: a.id,
                dependency_type: None,
            })
            .await;
        assert!(matches!(self_loop, Err(ForesightError::Validation(_))));

        // Valid edge
        let edge = store
            .create_dependency(NewDependency {
                dependent_task_id: a.id,
                prerequisite_task_id: b.id,
                dependency_type: Some("finish-to-start".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(edge.dependent_task_id, a.id);

        // Exact duplicate rejected
        let duplicate = store
            .create_dependency(NewDependency {
                dependent_task_id: a.id,
                prerequisite_task_id: b.id,
                dependency_type: None,
            })
            .await;
        assert!(matches!(duplicate, Err(ForesightError::Conflict(_))));

        // Reverse edge is a different edge and allowed (no transitive
        // cycle detection)
        let reverse = store
            .create_dependency(NewDependency {
                dependent_task_id: b.id,
                prerequisite_task_id: a.id,
                dependency_type: None,
            })
            .await;
        assert!(reverse.is_ok());

        // Dependency count reflects the dependent side only
        let a = store.get_task(a.id).await.unwrap();
        assert_eq!(a.dependency_count, 1);
    }

    #[tokio::test]
    async fn test_cross_project_dependency_rejected() {
        let (store, project) = store_with_project().await;
        let other = store
            .create_project(NewProject {
                name: "Borealis".to_string(),
                description: None,
                start_date: None,
                end_date: None,
                status: None,
                budget: None,
            })
            .await
            .unwrap();

        let a = store.create_task(new_task(project.id, "a")).await.unwrap();
        let b = store.create_task(new_task(other.id, "b")).await.unwrap();

        let result = store
            .create_dependency(NewDependency {
                dependent_task_id: a.id,
                prerequisite_task_id: b.id,
                dependency_type: None,
            })
            .await;
        assert!(matches!(result, Err(ForesightError::Validation(_))));
    }

    #[tokio::test]
    async fn test_dependency_listing_by_task() {
        let (store, project) = store_with_project().await;
        let a = store.create_task(new_task(project.id, "a")).await.unwrap();
        let b = store.create_task(new_task(project.id, "b")).await.unwrap();
        let c = store.create_task(new_task(project.id, "c")).await.unwrap();

        for (dep, pre) in [(a.id, b.id), (b.id, c.id)] {
            store
                .create_dependency(NewDependency {
                    dependent_task_id: dep,
                    prerequisite_task_id: pre,
                    dependency_type: None,
                })
                .await
                .unwrap();
        }

        // b appears on both sides
        let touching_b = store.list_dependencies(Some(b.id)).await.unwrap();
        assert_eq!(touching_b.len(), 2);

        let touching_c = store.list_dependencies(Some(c.id)).await.unwrap();
        assert_eq!(touching_c.len(), 1);

        let all = store.list_dependencies(None).await.unwrap();
        assert_eq!(all.len(), 2);

        store.delete_dependency(all[0].id).await.unwrap();
        assert_eq!(store.list_dependencies(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_comments() {
        let (store, project) = store_with_project().await;
        let task = store.create_task(new_task(project.id, "a")).await.unwrap();

        store
            .add_comment(task.id, "looks blocked on infra".to_string())
            .await
            .unwrap();
        store
            .add_comment(task.id, "unblocked now".to_string())
            .await
            .unwrap();

        let comments = store.list_comments(task.id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "looks blocked on infra");

        assert!(store.list_comments(999).await.is_err());
    }

    #[tokio::test]
    async fn test_risk_score_persistence() {
        let (store, project) = store_with_project().await;
        let task = store.create_task(new_task(project.id, "a")).await.unwrap();

        store.set_task_risk_score(task.id, 6.4).await.unwrap();
        let task = store.get_task(task.id).await.unwrap();
        assert_eq!(task.risk_score, 6.4);
    }

    #[tokio::test]
    async fn test_notifications() {
        let (store, project) = store_with_project().await;
        let user = store
            .create_user(new_user("ada@example.com", "ada"))
            .await
            .unwrap();
        let task = store.create_task(new_task(project.id, "a")).await.unwrap();

        store
            .add_notification(NewNotification {
                user_id: user.id,
                title: "Task assigned".to_string(),
                message: "You were assigned to a task".to_string(),
                notification_type: Some("task_assigned".to_string()),
                related_task_id: Some(task.id),
            })
            .await
            .unwrap();
        let second = store
            .add_notification(NewNotification {
                user_id: user.id,
                title: "Risk alert".to_string(),
                message: "A task crossed the high-risk band".to_string(),
                notification_type: Some("risk_alert".to_string()),
                related_task_id: None,
            })
            .await
            .unwrap();

        // Newest first
        let notifications = store.list_notifications(user.id).await.unwrap();
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].title, "Risk alert");
        assert!(!notifications[0].is_read);

        store.mark_notification_read(second.id).await.unwrap();
        let notifications = store.list_notifications(user.id).await.unwrap();
        assert!(notifications[0].is_read);

        // Unknown recipient rejected
        let orphan = store
            .add_notification(NewNotification {
                user_id: 999,
                title: "x".to_string(),
                message: "y".to_string(),
                notification_type: None,
                related_task_id: None,
            })
            .await;
        assert!(matches!(orphan, Err(ForesightError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_budget_entries() {
        let (store, project) = store_with_project().await;

        store
            .add_budget_entry(NewBudgetEntry {
                project_id: project.id,
                description: Some("contractor hours".to_string()),
                amount: 12_000.0,
                entry_type: "planned".to_string(),
                category: Some("labor".to_string()),
                date: None,
            })
            .await
            .unwrap();
        store
            .add_budget_entry(NewBudgetEntry {
                project_id: project.id,
                description: None,
                amount: 9_500.0,
                entry_type: "actual".to_string(),
                category: Some("labor".to_string()),
                date: Some(Utc::now()),
            })
            .await
            .unwrap();

        let entries = store.list_budget_entries(project.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_type, "planned");
        assert_eq!(entries[1].amount, 9_500.0);

        assert!(store.list_budget_entries(999).await.is_err());
    }
}
