//! One operator's editing session on an estimate.
//!
//! The session owns the draft. Ledger edits and gate evaluations run against
//! it synchronously; boundary calls are awaited and their results folded back
//! into the draft before the next edit.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::error::{Action, Precondition, WorkflowError};
use crate::calculations::common::non_negative;
use crate::calculations::{EstimateTotals, ItemEdit, JobCardReadiness, compute_totals};
use crate::db::{RepositoryError, WorkshopRepository};
use crate::models::{
    EstimateDraft, EstimateItem, EstimateStatus, ItemStatus, JobCard, ProductCatalog,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobCardOutcome {
    Created(JobCard),
    /// The estimate already has a job card that is not completed.
    AlreadyActive,
}

impl JobCardOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Created(_) => "Job card created.",
            Self::AlreadyActive => "Job card already active for this estimate.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EstimateSession {
    draft: EstimateDraft,
    catalog: ProductCatalog,
}

impl EstimateSession {
    pub fn new(
        draft: EstimateDraft,
        catalog: ProductCatalog,
    ) -> Self {
        Self { draft, catalog }
    }

    /// Loads the estimate, the product catalog and, when the estimate has an
    /// inspection, its line items. An estimate without lines is seeded from
    /// the inspection; otherwise procurement flags are refreshed from it.
    pub async fn load<R: WorkshopRepository + ?Sized>(
        repo: &R,
        estimate_id: i64,
    ) -> Result<Self, WorkflowError> {
        let load_err = |e| WorkflowError::transport(Action::LoadEstimate, e);

        let record = repo.get_estimate(estimate_id).await.map_err(load_err)?;
        let catalog: ProductCatalog = repo
            .list_products()
            .await
            .map_err(load_err)?
            .into_iter()
            .collect();
        let mut draft = EstimateDraft::from(record);

        if let Some(inspection_id) = draft.estimate.inspection_id {
            let lines = repo
                .list_inspection_line_items(inspection_id)
                .await
                .map_err(load_err)?;
            if draft.items.is_empty() {
                draft.items = lines
                    .iter()
                    .enumerate()
                    .map(|(idx, line)| EstimateItem::from_inspection_line(idx as u32 + 1, line))
                    .collect();
                info!(
                    estimate_id,
                    inspection_id,
                    lines = draft.items.len(),
                    "estimate seeded from inspection"
                );
            } else {
                draft.merge_order_state(&lines);
            }
        }

        Ok(Self::new(draft, catalog))
    }

    pub fn draft(&self) -> &EstimateDraft {
        &self.draft
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn estimate_id(&self) -> i64 {
        self.draft.estimate.id
    }

    pub fn edit_item(
        &mut self,
        index: usize,
        edit: ItemEdit,
    ) -> bool {
        self.draft.edit_item(index, edit)
    }

    pub fn add_item(&mut self) -> usize {
        self.draft.add_item()
    }

    pub fn remove_item(
        &mut self,
        index: usize,
    ) -> bool {
        self.draft.remove_item(index)
    }

    pub fn set_vat_rate(
        &mut self,
        vat_rate: Decimal,
    ) {
        self.draft.estimate.vat_rate = non_negative(vat_rate);
    }

    pub fn set_discount_amount(
        &mut self,
        discount_amount: Decimal,
    ) {
        self.draft.estimate.discount_amount = non_negative(discount_amount);
    }

    pub fn set_status(
        &mut self,
        status: EstimateStatus,
    ) {
        self.draft.estimate.status = status;
    }

    pub fn totals(&self) -> EstimateTotals {
        compute_totals(&self.draft.items, self.draft.estimate.vat_rate)
    }

    pub fn job_card_readiness(&self) -> JobCardReadiness {
        JobCardReadiness::evaluate(&self.draft.items, &self.catalog)
    }

    /// Saves the draft and adopts the row ids the repository assigned, so
    /// the same session can be saved again.
    pub async fn save<R: WorkshopRepository + ?Sized>(
        &mut self,
        repo: &R,
    ) -> Result<(), WorkflowError> {
        let payload = self.draft.to_save();
        let ids = repo
            .save_estimate(self.estimate_id(), &payload)
            .await
            .map_err(|e| WorkflowError::transport(Action::SaveEstimate, e))?;
        self.draft.apply_saved_ids(&ids);
        info!(
            estimate_id = self.estimate_id(),
            status = payload.status.as_str(),
            items = payload.items.len(),
            "estimate saved"
        );
        Ok(())
    }

    /// Trimmed, non-empty part names of approved lines.
    pub fn approved_part_names(&self) -> Vec<String> {
        self.draft
            .items
            .iter()
            .filter(|item| item.status == ItemStatus::Approved)
            .map(|item| item.part_name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Asks procurement to order every approved part, then refreshes the
    /// draft's order state. Returns how many inspection lines were marked.
    pub async fn order_approved_parts<R: WorkshopRepository + ?Sized>(
        &mut self,
        repo: &R,
    ) -> Result<u64, WorkflowError> {
        let inspection_id = self
            .draft
            .estimate
            .inspection_id
            .ok_or(Precondition::InspectionMissing)?;
        let names = self.approved_part_names();
        if names.is_empty() {
            debug!(estimate_id = self.estimate_id(), "no approved parts to order");
            return Ok(0);
        }

        let updated = repo
            .order_approved_parts(inspection_id, &names)
            .await
            .map_err(|e| WorkflowError::transport(Action::OrderApprovedParts, e))?;
        info!(estimate_id = self.estimate_id(), updated, "approved parts ordered");

        self.refresh_order_state(repo).await?;
        Ok(updated)
    }

    /// Re-reads inspection line items and merges their procurement flags.
    /// Lines the server has locked reject edits from here on.
    pub async fn refresh_order_state<R: WorkshopRepository + ?Sized>(
        &mut self,
        repo: &R,
    ) -> Result<usize, WorkflowError> {
        let Some(inspection_id) = self.draft.estimate.inspection_id else {
            return Ok(0);
        };
        let lines = repo
            .list_inspection_line_items(inspection_id)
            .await
            .map_err(|e| WorkflowError::transport(Action::LoadEstimate, e))?;
        let changed = self.draft.merge_order_state(&lines);
        debug!(estimate_id = self.estimate_id(), changed, "order state refreshed");
        Ok(changed)
    }

    /// Creates the job card when the readiness gate allows it.
    pub async fn create_job_card<R: WorkshopRepository + ?Sized>(
        &self,
        repo: &R,
    ) -> Result<JobCardOutcome, WorkflowError> {
        if self.draft.estimate.inspection_id.is_none() {
            return Err(Precondition::InspectionMissing.into());
        }
        if let Some(blocker) = self.job_card_readiness().blocker() {
            return Err(blocker.into());
        }

        match repo.create_job_card(self.estimate_id()).await {
            Ok(card) => {
                info!(estimate_id = self.estimate_id(), job_card_id = card.id, "job card created");
                Ok(JobCardOutcome::Created(card))
            }
            Err(RepositoryError::Conflict(reason)) => {
                info!(estimate_id = self.estimate_id(), %reason, "job card already active");
                Ok(JobCardOutcome::AlreadyActive)
            }
            Err(e) => Err(WorkflowError::transport(Action::CreateJobCard, e)),
        }
    }

    /// Approves the estimate and starts labour: saves, orders the approved
    /// parts, then creates the job card.
    ///
    /// A failure to order parts is logged and does not stop job-card
    /// creation; the gate decides from whatever order state is known.
    pub async fn approve<R: WorkshopRepository + ?Sized>(
        &mut self,
        repo: &R,
    ) -> Result<JobCardOutcome, WorkflowError> {
        let previous = self.draft.estimate.status;
        self.set_status(EstimateStatus::Approved);
        if let Err(err) = self.save(repo).await {
            self.set_status(previous);
            return Err(err);
        }

        if let Err(err) = self.order_approved_parts(repo).await {
            warn!(estimate_id = self.estimate_id(), error = %err, "ordering approved parts failed");
        }

        self.create_job_card(repo).await
    }
}
