use openpenpal_directory::courier_can_operate;
use openpenpal_models::courier::{Courier, CourierLevel, CourierStatus};
use openpenpal_models::opcode::OpCode;

/// Escalation order for `DispatchTask` (spec §4.5): exact point first, then
/// widening geographic scope.
pub const ESCALATION_ORDER: [CourierLevel; 4] =
    [CourierLevel::L1, CourierLevel::L2, CourierLevel::L3, CourierLevel::L4];

/// Couriers at `level` active and able to cover `code`, from a candidate
/// pool already filtered to that level by the caller's repository query.
pub fn eligible_candidates<'a>(candidates: &'a [Courier], code: &OpCode) -> Vec<&'a Courier> {
    candidates
        .iter()
        .filter(|c| c.status == CourierStatus::Active && courier_can_operate(&c.managed_prefixes, code))
        .collect()
}

/// Round-robin by smallest open-task count, ties broken by recent success
/// rate (spec §4.5 step 1).
pub fn pick_assignee<'a>(candidates: &[&'a Courier]) -> Option<&'a Courier> {
    candidates
        .iter()
        .copied()
        .min_by(|a, b| {
            a.stats
                .open_task_count
                .cmp(&b.stats.open_task_count)
                .then(b.stats.recent_success_rate.total_cmp(&a.stats.recent_success_rate))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpenpal_models::courier::CourierStats;
    use uuid::Uuid;

    fn courier(open_tasks: u32, success_rate: f64, prefix: &str) -> Courier {
        let mut prefixes = std::collections::HashSet::new();
        prefixes.insert(prefix.to_string());
        Courier {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            level: CourierLevel::L1,
            parent_id: None,
            managed_prefixes: prefixes,
            status: CourierStatus::Active,
            stats: CourierStats { open_task_count: open_tasks, completed_task_count: 0, recent_success_rate: success_rate },
        }
    }

    #[test]
    fn picks_smallest_open_task_count() {
        let a = courier(5, 0.9, "BJDX01");
        let b = courier(2, 0.5, "BJDX01");
        let pool = vec![&a, &b];
        assert_eq!(pick_assignee(&pool).unwrap().id, b.id);
    }

    #[test]
    fn ties_broken_by_higher_success_rate() {
        let a = courier(3, 0.8, "BJDX01");
        let b = courier(3, 0.95, "BJDX01");
        let pool = vec![&a, &b];
        assert_eq!(pick_assignee(&pool).unwrap().id, b.id);
    }

    #[test]
    fn filters_out_couriers_without_coverage() {
        let code = OpCode::parse("BJDX01").unwrap();
        let covering = courier(0, 1.0, "BJDX01");
        let not_covering = courier(0, 1.0, "SHDX01");
        let candidates = vec![covering.clone(), not_covering];
        let eligible = eligible_candidates(&candidates, &code);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, covering.id);
    }
}
