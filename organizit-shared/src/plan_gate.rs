/// Plan-based task limits
///
/// The plan gate decides whether a user may create another task. It is a
/// pure function of the user's plan and current task count: no I/O, no side
/// effects. Handlers count the tasks, then ask the gate.
///
/// # Limits by Plan
///
/// **Free Plan:** at most 5 tasks
///
/// **Pro Plan:** unlimited
///
/// # Example
///
/// ```
/// use organizit_shared::models::user::Plan;
/// use organizit_shared::plan_gate::{can_create_task, PlanGate};
///
/// assert!(can_create_task(Plan::Free, 4));
/// assert!(!can_create_task(Plan::Free, 5));
/// assert!(can_create_task(Plan::Pro, 1000));
///
/// let check = PlanGate::check(Plan::Free, 3);
/// assert_eq!(check.remaining, Some(2));
/// ```

use crate::models::user::Plan;
use serde::Serialize;

/// Message shown when a free user hits the task limit
pub const UPGRADE_REQUIRED_MESSAGE: &str =
    "You have reached the maximum number of tasks for the free plan. Please upgrade to Pro to add more tasks.";

/// Returns true if a user on `plan` who owns `task_count` tasks may create one more
pub fn can_create_task(plan: Plan, task_count: u64) -> bool {
    PlanGate::check(plan, task_count).allowed
}

/// Result of a plan check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanCheck {
    /// Whether another task may be created
    pub allowed: bool,

    /// Tasks currently owned
    pub current: u64,

    /// Maximum allowed (`None` = unlimited)
    pub limit: Option<u32>,

    /// Tasks left before the limit (`None` = unlimited)
    pub remaining: Option<u64>,
}

impl PlanCheck {
    /// Creates a result for an unlimited plan
    pub fn unlimited(current: u64) -> Self {
        PlanCheck {
            allowed: true,
            current,
            limit: None,
            remaining: None,
        }
    }

    /// Creates a result indicating the limit is not reached
    pub fn allowed(current: u64, limit: u32) -> Self {
        PlanCheck {
            allowed: true,
            current,
            limit: Some(limit),
            remaining: Some(u64::from(limit).saturating_sub(current)),
        }
    }

    /// Creates a result indicating the limit is reached
    pub fn exceeded(current: u64, limit: u32) -> Self {
        PlanCheck {
            allowed: false,
            current,
            limit: Some(limit),
            remaining: Some(0),
        }
    }
}

/// Task-count gate keyed by plan
pub struct PlanGate;

impl PlanGate {
    /// Checks `task_count` against the limit for `plan`
    pub fn check(plan: Plan, task_count: u64) -> PlanCheck {
        match plan.task_limit() {
            None => PlanCheck::unlimited(task_count),
            Some(limit) if task_count >= u64::from(limit) => {
                PlanCheck::exceeded(task_count, limit)
            }
            Some(limit) => PlanCheck::allowed(task_count, limit),
        }
    }

    /// Whether the client should be offered the upgrade flow
    pub fn should_offer_upgrade(plan: Plan, task_count: u64) -> bool {
        !plan.is_pro() && !Self::check(plan, task_count).allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pro_is_unlimited() {
        for count in [0, 5, 1000] {
            assert!(can_create_task(Plan::Pro, count));
        }

        let check = PlanGate::check(Plan::Pro, 1000);
        assert_eq!(check, PlanCheck::unlimited(1000));
        assert!(check.limit.is_none());
        assert!(check.remaining.is_none());
    }

    #[test]
    fn test_free_limit_boundary() {
        assert!(can_create_task(Plan::Free, 0));
        assert!(can_create_task(Plan::Free, 4));
        assert!(!can_create_task(Plan::Free, 5));
        assert!(!can_create_task(Plan::Free, 6));
    }

    #[test]
    fn test_free_check_remaining() {
        let check = PlanGate::check(Plan::Free, 3);
        assert!(check.allowed);
        assert_eq!(check.limit, Some(5));
        assert_eq!(check.remaining, Some(2));

        let check = PlanGate::check(Plan::Free, 5);
        assert!(!check.allowed);
        assert_eq!(check.remaining, Some(0));
    }

    #[test]
    fn test_should_offer_upgrade() {
        assert!(!PlanGate::should_offer_upgrade(Plan::Free, 2));
        assert!(PlanGate::should_offer_upgrade(Plan::Free, 5));
        assert!(!PlanGate::should_offer_upgrade(Plan::Pro, 50));
    }

    #[test]
    fn test_plan_check_serializes_null_limit() {
        let json = serde_json::to_value(PlanCheck::unlimited(7)).unwrap();
        assert_eq!(json["limit"], serde_json::Value::Null);
        assert_eq!(json["current"], 7);
    }
}
