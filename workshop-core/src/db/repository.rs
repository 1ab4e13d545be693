use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    CustomerWallet, Estimate, EstimateRecord, EstimateSave, Inspection, InspectionLineItem,
    Invoice, JobCard, JobCardAction, JobCardTimestamps, Lead, PartsOrderLine, Product,
    WalletTopUp,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Boundary to the systems that own leads, inspections, estimates, job
/// cards, invoices and wallets.
#[async_trait]
pub trait WorkshopRepository: Send + Sync {
    // Leads and inspections
    async fn get_lead(&self, lead_id: i64) -> Result<Lead, RepositoryError>;
    async fn get_inspection_for_lead(
        &self,
        lead_id: i64,
    ) -> Result<Option<Inspection>, RepositoryError>;
    async fn list_inspection_line_items(
        &self,
        inspection_id: i64,
    ) -> Result<Vec<InspectionLineItem>, RepositoryError>;

    // Estimates
    async fn get_estimate(&self, estimate_id: i64) -> Result<EstimateRecord, RepositoryError>;
    async fn find_estimate_for_lead(
        &self,
        lead_id: i64,
    ) -> Result<Option<Estimate>, RepositoryError>;
    /// Stores the header and line set. Returns the row id of every line in
    /// payload order, including ids assigned to newly inserted lines.
    async fn save_estimate(
        &self,
        estimate_id: i64,
        save: &EstimateSave,
    ) -> Result<Vec<i64>, RepositoryError>;

    /// Marks the inspection line items whose product name is in
    /// `approved_names` as ordered. Returns how many rows changed.
    async fn order_approved_parts(
        &self,
        inspection_id: i64,
        approved_names: &[String],
    ) -> Result<u64, RepositoryError>;

    // Job cards
    /// Fails with [`RepositoryError::Conflict`] when the estimate already
    /// has an active job card.
    async fn create_job_card(&self, estimate_id: i64) -> Result<JobCard, RepositoryError>;
    async fn get_job_card(&self, job_card_id: i64) -> Result<JobCard, RepositoryError>;
    async fn find_job_card_for_estimate(
        &self,
        estimate_id: i64,
    ) -> Result<Option<JobCard>, RepositoryError>;
    async fn update_job_card(
        &self,
        job_card_id: i64,
        action: &JobCardAction,
    ) -> Result<JobCardTimestamps, RepositoryError>;

    // Parts
    async fn get_parts_status(
        &self,
        lead_id: i64,
    ) -> Result<Option<PartsOrderLine>, RepositoryError>;

    // Invoices
    async fn create_invoice(&self, estimate_id: i64) -> Result<Invoice, RepositoryError>;
    async fn get_invoice(&self, invoice_id: i64) -> Result<Invoice, RepositoryError>;
    async fn find_invoice_for_lead(
        &self,
        lead_id: i64,
    ) -> Result<Option<Invoice>, RepositoryError>;
    /// Settles the invoice from the customer's wallet. Fails with
    /// [`RepositoryError::Conflict`] when the balance no longer covers it.
    async fn pay_invoice(&self, invoice_id: i64) -> Result<(), RepositoryError>;

    // Wallets
    async fn create_wallet_transaction(
        &self,
        customer_id: i64,
        top_up: &WalletTopUp,
    ) -> Result<(), RepositoryError>;
    async fn get_wallet(&self, customer_id: i64) -> Result<CustomerWallet, RepositoryError>;

    // Product catalog
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError>;
}
