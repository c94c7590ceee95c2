//! Rule-based explanation of risk predictions
//!
//! Ranks features by the ensemble's importance weights and maps the top
//! ranked ones, subject to threshold tests on the raw factor values, to
//! canned mitigation suggestions.

use crate::risk::features::{FEATURE_COUNT, FEATURE_NAMES};
use crate::types::RiskFactors;
use std::collections::BTreeMap;

/// Features considered for specific suggestions
const TOP_FEATURES: usize = 3;
/// Importance threshold for the schedule-derived features
const SCHEDULE_IMPORTANCE_FLOOR: f64 = 0.1;

const SUGGEST_COMPLEXITY: &str =
    "Consider breaking down this complex task into smaller, more manageable subtasks.";
const SUGGEST_AVAILABILITY: &str =
    "Allocate additional resources or redistribute workload to improve resource availability.";
const SUGGEST_DEPENDENCIES: &str =
    "Review task dependencies to identify potential simplifications or parallel work streams.";
const SUGGEST_DELAYS: &str =
    "Analyze previous delays to identify and address recurring issues.";
const SUGGEST_HOURS: &str =
    "Consider revising time estimates or breaking down the task further.";
const SUGGEST_PRIORITY: &str =
    "Ensure high-priority tasks have adequate resources and monitoring.";
const SUGGEST_TIMELINE: &str =
    "Consider adjusting the timeline or starting the task earlier.";
const SUGGEST_PROGRESS: &str =
    "Implement more frequent progress tracking to ensure timely completion.";
const SUGGEST_GENERIC: &str =
    "Implement regular status updates to track progress and identify issues early.";
const SUGGEST_REVIEW: &str =
    "Schedule a brief risk review with the task owner to validate estimates and assumptions.";
const SUGGEST_ESCALATE: &str =
    "Consider escalating this high-risk task to management for additional oversight.";

/// Importance weights keyed by feature name
///
/// Empty when the model exposes no importances (unfitted ensemble).
pub fn importance_map(weights: Option<&[f64; FEATURE_COUNT]>) -> BTreeMap<String, f64> {
    match weights {
        Some(weights) => FEATURE_NAMES
            .iter()
            .zip(weights.iter())
            .map(|(name, w)| ((*name).to_string(), *w))
            .collect(),
        None => BTreeMap::new(),
    }
}

/// Build mitigation suggestions from the top contributing features
///
/// Features are ranked by importance descending with ties keeping the
/// canonical slot order (stable sort); only the top three are considered,
/// each contributing at most one suggestion. Fallback appends guarantee
/// at least two suggestions and cap the list at four.
pub fn suggest(
    risk_score: f64,
    factors: &RiskFactors,
    weights: Option<&[f64; FEATURE_COUNT]>,
) -> Vec<String> {
    let mut suggestions: Vec<String> = Vec::new();

    if let Some(weights) = weights {
        let mut ranked: Vec<usize> = (0..FEATURE_COUNT).collect();
        // Stable sort keeps canonical order between equal weights
        ranked.sort_by(|&a, &b| {
            weights[b]
                .partial_cmp(&weights[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for &slot in ranked.iter().take(TOP_FEATURES) {
            let fired = match slot {
                0 if factors.task_complexity > 7.0 => Some(SUGGEST_COMPLEXITY),
                1 if factors.resource_availability < 5.0 => Some(SUGGEST_AVAILABILITY),
                2 if factors.dependency_count > 3 => Some(SUGGEST_DEPENDENCIES),
                3 if factors.historical_delays > 0 => Some(SUGGEST_DELAYS),
                4 if factors.estimated_hours > 40.0 => Some(SUGGEST_HOURS),
                5 if factors.priority_level >= 3 => Some(SUGGEST_PRIORITY),
                6 if weights[6] > SCHEDULE_IMPORTANCE_FLOOR => Some(SUGGEST_TIMELINE),
                7 if weights[7] > SCHEDULE_IMPORTANCE_FLOOR => Some(SUGGEST_PROGRESS),
                _ => None,
            };
            if let Some(text) = fired {
                suggestions.push(text.to_string());
            }
        }
    }

    if suggestions.len() < 2 {
        suggestions.push(SUGGEST_GENERIC.to_string());
    }
    // Second filler only when no escalation below will restore the
    // two-suggestion floor
    if suggestions.len() < 2 && risk_score <= 5.0 {
        suggestions.push(SUGGEST_REVIEW.to_string());
    }
    if suggestions.len() < 3 && risk_score > 5.0 {
        suggestions.push(SUGGEST_ESCALATE.to_string());
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn high_risk_factors() -> RiskFactors {
        RiskFactors {
            task_complexity: 9.0,
            resource_availability: 2.0,
            dependency_count: 5,
            historical_delays: 2,
            estimated_hours: 50.0,
            priority_level: 4,
        }
    }

    fn calm_factors() -> RiskFactors {
        RiskFactors {
            task_complexity: 1.0,
            resource_availability: 9.0,
            dependency_count: 0,
            historical_delays: 0,
            estimated_hours: 2.0,
            priority_level: 1,
        }
    }

    #[test]
    fn test_importance_map_names() {
        let weights = [0.125; FEATURE_COUNT];
        let map = importance_map(Some(&weights));
        assert_eq!(map.len(), FEATURE_COUNT);
        assert_eq!(map.get("task_complexity"), Some(&0.125));
        assert_eq!(map.get("completion_percentage"), Some(&0.125));
    }

    #[test]
    fn test_importance_map_empty_without_model() {
        assert!(importance_map(None).is_empty());
    }

    #[test]
    fn test_top_features_fire_when_thresholds_met() {
        // Complexity, availability, and hours dominate the ranking
        let mut weights = [0.01; FEATURE_COUNT];
        weights[0] = 0.4;
        weights[1] = 0.3;
        weights[4] = 0.2;

        let suggestions = suggest(8.0, &high_risk_factors(), Some(&weights));
        assert_eq!(
            suggestions,
            vec![
                SUGGEST_COMPLEXITY.to_string(),
                SUGGEST_AVAILABILITY.to_string(),
                SUGGEST_HOURS.to_string(),
            ]
        );
    }

    #[test]
    fn test_threshold_gates_suppress_suggestions() {
        // Same ranking, but the calm factors fail every threshold test
        let mut weights = [0.01; FEATURE_COUNT];
        weights[0] = 0.4;
        weights[1] = 0.3;
        weights[4] = 0.2;

        let suggestions = suggest(1.0, &calm_factors(), Some(&weights));
        assert_eq!(
            suggestions,
            vec![SUGGEST_GENERIC.to_string(), SUGGEST_REVIEW.to_string()]
        );
    }

    #[test]
    fn test_escalation_appended_for_high_scores() {
        let mut weights = [0.01; FEATURE_COUNT];
        weights[3] = 0.5;

        // Only the delay rule can fire for these factors
        let mut factors = calm_factors();
        factors.historical_delays = 2;

        let suggestions = suggest(7.0, &factors, Some(&weights));
        assert_eq!(
            suggestions,
            vec![
                SUGGEST_DELAYS.to_string(),
                SUGGEST_GENERIC.to_string(),
                SUGGEST_ESCALATE.to_string(),
            ]
        );
    }

    #[test]
    fn test_high_score_with_no_firing_rules_gets_generic_and_escalation() {
        // Calm factors fail every threshold test, so the fillers alone
        // must carry the list: generic plus escalation, nothing more
        let suggestions = suggest(6.0, &calm_factors(), Some(&[0.125; FEATURE_COUNT]));
        assert_eq!(
            suggestions,
            vec![SUGGEST_GENERIC.to_string(), SUGGEST_ESCALATE.to_string()]
        );
    }

    #[test]
    fn test_no_escalation_for_low_scores() {
        let suggestions = suggest(1.0, &calm_factors(), Some(&[0.125; FEATURE_COUNT]));
        assert!(!suggestions.contains(&SUGGEST_ESCALATE.to_string()));
    }

    #[test]
    fn test_schedule_features_use_importance_floor() {
        let mut weights = [0.0; FEATURE_COUNT];
        weights[6] = 0.6;
        weights[7] = 0.4;

        let suggestions = suggest(3.0, &calm_factors(), Some(&weights));
        assert!(suggestions.contains(&SUGGEST_TIMELINE.to_string()));
        assert!(suggestions.contains(&SUGGEST_PROGRESS.to_string()));
    }

    #[test]
    fn test_ties_keep_canonical_order() {
        // All weights equal: top three are the first three canonical slots
        let weights = [0.125; FEATURE_COUNT];
        let suggestions = suggest(8.0, &high_risk_factors(), Some(&weights));
        assert_eq!(suggestions[0], SUGGEST_COMPLEXITY);
        assert_eq!(suggestions[1], SUGGEST_AVAILABILITY);
        assert_eq!(suggestions[2], SUGGEST_DEPENDENCIES);
    }

    #[test]
    fn test_length_and_uniqueness_bounds() {
        let cases = [
            (9.0, high_risk_factors(), Some([0.125; FEATURE_COUNT])),
            (0.5, calm_factors(), Some([0.125; FEATURE_COUNT])),
            (6.0, calm_factors(), None),
            (1.0, calm_factors(), None),
        ];
        for (score, factors, weights) in cases {
            let suggestions = suggest(score, &factors, weights.as_ref());
            assert!(
                (2..=4).contains(&suggestions.len()),
                "got {} suggestions",
                suggestions.len()
            );
            let mut unique = suggestions.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), suggestions.len(), "duplicate suggestion");
        }
    }
}
