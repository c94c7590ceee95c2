//! Foresight - Project-Management Backend with Task Risk Scoring
//!
//! A Rust backend for project tracking that provides:
//! - User, project, task, dependency, and comment CRUD over HTTP
//! - Same-project dependency validation (self-loops and duplicate edges
//!   rejected; no transitive cycle detection)
//! - A risk-scoring subsystem: fixed 8-feature extraction, a
//!   random-forest regressor trained at startup, and rule-based
//!   mitigation suggestions
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Types**: Core data structures (Task, Project, RiskFactors, etc.)
//! - **Storage**: SQLite persistence
//! - **Risk**: Feature extraction, regression ensemble, explainer, and
//!   the service facade handlers call into
//! - **Api**: Axum HTTP server and request handlers
//!
//! # Example
//!
//! ```ignore
//! use foresight::{risk::RiskService, types::RiskFactors};
//!
//! let service = RiskService::new(None);
//! let prediction = service.predict_from_factors(&RiskFactors {
//!     task_complexity: 8.0,
//!     resource_availability: 3.0,
//!     dependency_count: 4,
//!     historical_delays: 1,
//!     estimated_hours: 60.0,
//!     priority_level: 3,
//! });
//! println!("{}: {:.1}", prediction.risk_level, prediction.risk_score);
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod risk;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, AppState};
pub use config::Settings;
pub use error::{ForesightError, Result};
pub use risk::RiskService;
pub use storage::{SqliteStore, TaskFilter};
pub use types::{
    BudgetEntry, NewBudgetEntry, NewDependency, NewNotification, NewProject, NewTask, NewUser,
    Notification, Project, ProjectUpdate, RiskFactors, RiskLevel, RiskPrediction, Task,
    TaskComment, TaskDependency, TaskPriority, TaskStatus, TaskUpdate, User, UserUpdate,
};
