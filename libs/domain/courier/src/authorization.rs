use openpenpal_models::courier::Courier;

/// Reassignment requires the operator to outrank the current assignee, or
/// be at the same level and be that assignee's parent (spec §4.5 step 3).
pub fn can_reassign(operator: &Courier, current_assignee: &Courier) -> bool {
    operator.level.rank() > current_assignee.level.rank()
        || (operator.level == current_assignee.level && current_assignee.parent_id == Some(operator.id))
}

/// A promotion request may only be reviewed by a courier at
/// `requestedLevel + 1` or higher, or a platform admin (spec §4.5 "Promotion flow").
pub fn can_review_promotion(reviewer: &Courier, requested_level_rank: u8, reviewer_is_admin: bool) -> bool {
    reviewer_is_admin || reviewer.level.rank() >= requested_level_rank + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpenpal_models::courier::{CourierLevel, CourierStats, CourierStatus};
    use std::collections::HashSet;
    use uuid::Uuid;

    fn courier(level: CourierLevel, parent_id: Option<Uuid>) -> Courier {
        Courier {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            level,
            parent_id,
            managed_prefixes: HashSet::new(),
            status: CourierStatus::Active,
            stats: CourierStats::default(),
        }
    }

    #[test]
    fn higher_rank_can_always_reassign() {
        let assignee = courier(CourierLevel::L1, None);
        let operator = courier(CourierLevel::L2, None);
        assert!(can_reassign(&operator, &assignee));
    }

    #[test]
    fn same_rank_requires_parent_relationship() {
        let operator = courier(CourierLevel::L1, None);
        let mut assignee = courier(CourierLevel::L1, None);
        assignee.parent_id = Some(operator.id);
        assert!(can_reassign(&operator, &assignee));

        let unrelated_assignee = courier(CourierLevel::L1, None);
        assert!(!can_reassign(&operator, &unrelated_assignee));
    }

    #[test]
    fn reviewer_must_outrank_requested_level_by_one() {
        let reviewer = courier(CourierLevel::L3, None);
        assert!(can_review_promotion(&reviewer, CourierLevel::L2.rank(), false));
        assert!(!can_review_promotion(&reviewer, CourierLevel::L3.rank(), false));
        assert!(can_review_promotion(&reviewer, CourierLevel::L3.rank(), true));
    }
}
