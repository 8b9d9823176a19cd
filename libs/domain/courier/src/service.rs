use crate::authorization::{can_reassign, can_review_promotion};
use crate::dispatch::{eligible_candidates, pick_assignee, ESCALATION_ORDER};
use chrono::Utc;
use openpenpal_directory::child_prefixes_are_valid;
use openpenpal_models::courier::{
    Courier, CourierTask, CourierUpgradeRequest, TaskStatus, UpgradeRequestStatus,
};
use openpenpal_models::error::CoreError;
use openpenpal_models::opcode::OpCode;
use openpenpal_store::{CourierRepository, StoreError};
use tracing::{instrument, warn};
use uuid::Uuid;

/// C5 entry point: task dispatch/lifecycle and the courier promotion
/// workflow (spec §4.5).
#[derive(Clone)]
pub struct CourierService {
    repository: CourierRepository,
}

impl CourierService {
    pub fn new(repository: CourierRepository) -> Self {
        Self { repository }
    }

    /// `DispatchTask(letterID, recipientOPCode) → (task, err)`. Escalates
    /// L1 → L2 → L3 → L4; if no tier covers the code the task is created
    /// `Unassigned` and an alert is logged rather than an error returned.
    #[instrument(skip(self))]
    pub async fn dispatch_task(&self, letter_id: Uuid, recipient_opcode: OpCode) -> Result<CourierTask, CoreError> {
        let mut assignee: Option<Courier> = None;

        for level in ESCALATION_ORDER {
            let candidates = self.repository.list_by_level(level).await.map_err(map_store_error)?;
            let eligible = eligible_candidates(&candidates, &recipient_opcode);
            if let Some(picked) = pick_assignee(&eligible) {
                assignee = Some(picked.clone());
                break;
            }
        }

        let now = Utc::now();
        let task = match &assignee {
            Some(courier) => CourierTask {
                id: Uuid::new_v4(),
                letter_id,
                recipient_opcode: recipient_opcode.clone(),
                assigned_courier_id: Some(courier.id),
                status: TaskStatus::Assigned,
                created_at: now,
                updated_at: now,
            },
            None => {
                warn!(%letter_id, opcode = %recipient_opcode, "no courier at any tier covers this opcode; task unassigned");
                CourierTask {
                    id: Uuid::new_v4(),
                    letter_id,
                    recipient_opcode: recipient_opcode.clone(),
                    assigned_courier_id: None,
                    status: TaskStatus::Unassigned,
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        self.repository.insert_task(&task).await.map_err(map_store_error)?;

        if let Some(mut courier) = assignee {
            courier.stats.open_task_count += 1;
            self.repository.upsert(&courier).await.map_err(map_store_error)?;
        }

        Ok(task)
    }

    pub async fn list_tasks(&self, courier_id: Uuid, status: Option<TaskStatus>) -> Result<Vec<CourierTask>, CoreError> {
        let tasks = self.repository.list_tasks_for_courier(courier_id).await.map_err(map_store_error)?;
        Ok(match status {
            Some(wanted) => tasks.into_iter().filter(|t| t.status == wanted).collect(),
            None => tasks,
        })
    }

    #[instrument(skip(self))]
    pub async fn accept_task(&self, task_id: Uuid, courier_id: Uuid) -> Result<(), CoreError> {
        let task = self.repository.get_task(task_id).await.map_err(map_store_error)?;
        if task.assigned_courier_id != Some(courier_id) {
            return Err(CoreError::Forbidden("task is not assigned to this courier".into()));
        }
        if task.status != TaskStatus::Assigned {
            return Err(CoreError::InvalidTransition { from: format!("{:?}", task.status), to: "Accepted".into() });
        }
        self.repository
            .update_task_status(task_id, TaskStatus::Accepted, task.assigned_courier_id, Utc::now())
            .await
            .map_err(map_store_error)
    }

    #[instrument(skip(self))]
    pub async fn complete_task(&self, task_id: Uuid, courier_id: Uuid) -> Result<(), CoreError> {
        let task = self.repository.get_task(task_id).await.map_err(map_store_error)?;
        if task.assigned_courier_id != Some(courier_id) {
            return Err(CoreError::Forbidden("task is not assigned to this courier".into()));
        }
        if task.status != TaskStatus::Accepted {
            return Err(CoreError::InvalidTransition { from: format!("{:?}", task.status), to: "Completed".into() });
        }
        self.repository
            .update_task_status(task_id, TaskStatus::Completed, task.assigned_courier_id, Utc::now())
            .await
            .map_err(map_store_error)?;

        let mut courier = self.repository.get(courier_id).await.map_err(map_store_error)?;
        courier.stats.open_task_count = courier.stats.open_task_count.saturating_sub(1);
        courier.stats.completed_task_count += 1;
        self.repository.upsert(&courier).await.map_err(map_store_error)
    }

    /// `ReassignTask`: the operator must outrank the current assignee, or
    /// be the same level and that assignee's parent (spec §4.5 step 3).
    #[instrument(skip(self))]
    pub async fn reassign_task(&self, task_id: Uuid, operator_id: Uuid, new_courier_id: Uuid) -> Result<(), CoreError> {
        let task = self.repository.get_task(task_id).await.map_err(map_store_error)?;
        let operator = self.repository.get(operator_id).await.map_err(map_store_error)?;

        if let Some(current_id) = task.assigned_courier_id {
            let current_assignee = self.repository.get(current_id).await.map_err(map_store_error)?;
            if !can_reassign(&operator, &current_assignee) {
                return Err(CoreError::Forbidden("operator may not reassign this task".into()));
            }
        }

        let new_courier = self.repository.get(new_courier_id).await.map_err(map_store_error)?;
        if !openpenpal_directory::courier_can_operate(&new_courier.managed_prefixes, &task.recipient_opcode) {
            return Err(CoreError::PolicyViolation("new courier does not cover this opcode".into()));
        }

        self.repository
            .update_task_status(task_id, TaskStatus::Assigned, Some(new_courier_id), Utc::now())
            .await
            .map_err(map_store_error)
    }

    /// Approval updates the courier's level, recomputes `parentID` to the
    /// reviewer, and validates the courier's existing prefixes still
    /// strictly refine the reviewer's (spec §4.5 "Promotion flow").
    #[instrument(skip(self))]
    pub async fn approve_upgrade_request(
        &self,
        request_id: Uuid,
        reviewer_id: Uuid,
        reviewer_is_admin: bool,
        reviewer_comment: Option<String>,
    ) -> Result<(), CoreError> {
        let mut request = self.repository.get_upgrade_request(request_id).await.map_err(map_store_error)?;
        if request.status != UpgradeRequestStatus::Pending {
            return Err(CoreError::InvalidTransition { from: format!("{:?}", request.status), to: "Approved".into() });
        }

        let reviewer = self.repository.get(reviewer_id).await.map_err(map_store_error)?;
        if !can_review_promotion(&reviewer, request.requested_level.rank(), reviewer_is_admin) {
            return Err(CoreError::Forbidden("reviewer does not outrank the requested level".into()));
        }

        let mut courier = self.repository.get(request.courier_id).await.map_err(map_store_error)?;
        if !child_prefixes_are_valid(&courier.managed_prefixes, &reviewer.managed_prefixes) {
            return Err(CoreError::Conflict("promotion would orphan the courier's managed prefixes".into()));
        }

        courier.level = request.requested_level;
        courier.parent_id = Some(reviewer.id);
        self.repository.upsert(&courier).await.map_err(map_store_error)?;

        request.status = UpgradeRequestStatus::Approved;
        request.reviewer_id = Some(reviewer_id);
        request.reviewer_comment = reviewer_comment;
        request.reviewed_at = Some(Utc::now());
        self.repository.update_upgrade_request(&request).await.map_err(map_store_error)
    }

    #[instrument(skip(self))]
    pub async fn reject_upgrade_request(
        &self,
        request_id: Uuid,
        reviewer_id: Uuid,
        reviewer_is_admin: bool,
        reviewer_comment: Option<String>,
    ) -> Result<(), CoreError> {
        let mut request = self.repository.get_upgrade_request(request_id).await.map_err(map_store_error)?;
        if request.status != UpgradeRequestStatus::Pending {
            return Err(CoreError::InvalidTransition { from: format!("{:?}", request.status), to: "Rejected".into() });
        }

        let reviewer = self.repository.get(reviewer_id).await.map_err(map_store_error)?;
        if !can_review_promotion(&reviewer, request.requested_level.rank(), reviewer_is_admin) {
            return Err(CoreError::Forbidden("reviewer does not outrank the requested level".into()));
        }

        request.status = UpgradeRequestStatus::Rejected;
        request.reviewer_id = Some(reviewer_id);
        request.reviewer_comment = reviewer_comment;
        request.reviewed_at = Some(Utc::now());
        self.repository.update_upgrade_request(&request).await.map_err(map_store_error)
    }

    pub async fn submit_upgrade_request(&self, request: CourierUpgradeRequest) -> Result<(), CoreError> {
        self.repository.insert_upgrade_request(&request).await.map_err(map_store_error)
    }
}

fn map_store_error(err: StoreError) -> CoreError {
    match err {
        StoreError::NotFound => CoreError::NotFound("courier resource".into()),
        StoreError::Conflict(msg) => CoreError::Conflict(msg),
        other => CoreError::Internal(other.to_string()),
    }
}
