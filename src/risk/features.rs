//! Feature extraction for the risk model
//!
//! Turns a persisted task or a caller-supplied factor set into the fixed
//! 8-element feature vector the regressor consumes. The slot order is
//! canonical: the regressor and the explainer index positionally against
//! it and never look features up by name at runtime.

use crate::types::{RiskFactors, Task};
use chrono::Utc;

/// Number of model features; never varies
pub const FEATURE_COUNT: usize = 8;

/// Canonical feature names, in vector slot order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "task_complexity",
    "resource_availability",
    "dependency_count",
    "historical_delays",
    "estimated_hours",
    "priority_level",
    "days_until_due",
    "completion_percentage",
];

/// Days-until-due used when no due date is known
pub const DEFAULT_DAYS_UNTIL_DUE: f64 = 30.0;

// Tasks carry no complexity, availability, or delay-history data yet, so
// the task-derived path fills those slots with fixed constants. This makes
// the three inputs non-discriminating for task-based predictions; a richer
// data source is needed before they can be derived for real.
pub const PLACEHOLDER_COMPLEXITY: f64 = 5.0;
pub const PLACEHOLDER_AVAILABILITY: f64 = 7.0;
pub const PLACEHOLDER_HISTORICAL_DELAYS: f64 = 1.0;

/// Fixed-length numeric encoding consumed by the regressor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Extract features from a persisted task
    ///
    /// Missing estimated hours and completion default to 0.0; a missing
    /// due date defaults to [`DEFAULT_DAYS_UNTIL_DUE`]; days until due is
    /// clamped at zero for overdue tasks. Extraction is total and has no
    /// side effects.
    pub fn from_task(task: &Task) -> Self {
        let days_until_due = match task.due_date {
            Some(due) => (due - Utc::now()).num_days().max(0) as f64,
            None => DEFAULT_DAYS_UNTIL_DUE,
        };

        Self([
            PLACEHOLDER_COMPLEXITY,
            PLACEHOLDER_AVAILABILITY,
            f64::from(task.dependency_count),
            PLACEHOLDER_HISTORICAL_DELAYS,
            task.estimated_hours.unwrap_or(0.0),
            f64::from(task.priority.level()),
            days_until_due,
            task.completion_percentage,
        ])
    }

    /// Extract features from a caller-supplied factor set
    ///
    /// Callers do not supply days-until-due or completion; those slots
    /// are defaulted to [`DEFAULT_DAYS_UNTIL_DUE`] and 0.0.
    pub fn from_factors(factors: &RiskFactors) -> Self {
        Self([
            factors.task_complexity,
            factors.resource_availability,
            f64::from(factors.dependency_count),
            f64::from(factors.historical_delays),
            factors.estimated_hours,
            f64::from(factors.priority_level),
            DEFAULT_DAYS_UNTIL_DUE,
            0.0,
        ])
    }

    /// View the vector as a slice in canonical slot order
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Build the factor set a task implies, using the same placeholder policy
/// as [`FeatureVector::from_task`]
pub fn factors_from_task(task: &Task) -> RiskFactors {
    RiskFactors {
        task_complexity: PLACEHOLDER_COMPLEXITY,
        resource_availability: PLACEHOLDER_AVAILABILITY,
        dependency_count: task.dependency_count,
        historical_delays: PLACEHOLDER_HISTORICAL_DELAYS as u32,
        estimated_hours: task.estimated_hours.unwrap_or(0.0),
        priority_level: task.priority.level(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskPriority, TaskStatus};
    use chrono::{Duration, Utc};

    fn sample_task() -> Task {
        Task {
            id: 1,
            project_id: 1,
            assignee_id: None,
            title: "sample".to_string(),
            description: None,
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            start_date: None,
            due_date: None,
            estimated_hours: Some(16.0),
            actual_hours: 4.0,
            completion_percentage: 25.0,
            risk_score: 0.0,
            dependency_count: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_due_date_defaults_to_30() {
        let task = sample_task();
        let vec = FeatureVector::from_task(&task);
        assert_eq!(vec.0[6], DEFAULT_DAYS_UNTIL_DUE);
    }

    #[test]
    fn test_future_due_date() {
        let mut task = sample_task();
        // An hour of slack so the whole-day count stays at 10 regardless
        // of when within the test the clock is read
        task.due_date = Some(Utc::now() + Duration::days(10) + Duration::hours(1));
        let vec = FeatureVector::from_task(&task);
        assert_eq!(vec.0[6], 10.0);
    }

    #[test]
    fn test_overdue_clamps_to_zero() {
        let mut task = sample_task();
        task.due_date = Some(Utc::now() - Duration::days(5));
        let vec = FeatureVector::from_task(&task);
        assert_eq!(vec.0[6], 0.0);
    }

    #[test]
    fn test_task_slots_in_canonical_order() {
        let task = sample_task();
        let vec = FeatureVector::from_task(&task);
        assert_eq!(vec.0[0], PLACEHOLDER_COMPLEXITY);
        assert_eq!(vec.0[1], PLACEHOLDER_AVAILABILITY);
        assert_eq!(vec.0[2], 3.0);
        assert_eq!(vec.0[3], PLACEHOLDER_HISTORICAL_DELAYS);
        assert_eq!(vec.0[4], 16.0);
        assert_eq!(vec.0[5], 3.0); // High priority
        assert_eq!(vec.0[7], 25.0);
    }

    #[test]
    fn test_missing_hours_default_zero() {
        let mut task = sample_task();
        task.estimated_hours = None;
        let vec = FeatureVector::from_task(&task);
        assert_eq!(vec.0[4], 0.0);
    }

    #[test]
    fn test_factors_extraction() {
        let factors = RiskFactors {
            task_complexity: 9.0,
            resource_availability: 2.0,
            dependency_count: 5,
            historical_delays: 2,
            estimated_hours: 50.0,
            priority_level: 4,
        };
        let vec = FeatureVector::from_factors(&factors);
        assert_eq!(
            vec.0,
            [9.0, 2.0, 5.0, 2.0, 50.0, 4.0, DEFAULT_DAYS_UNTIL_DUE, 0.0]
        );
    }
}
