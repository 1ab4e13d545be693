//! In-memory repository for unit tests of the workflow layer.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use super::repository::{RepositoryError, WorkshopRepository};
use crate::calculations::compute_totals;
use crate::models::{
    CustomerWallet, Estimate, EstimateRecord, EstimateSave, EstimateStatus, Inspection,
    InspectionLineItem, Invoice, InvoiceStatus, ItemStatus, JobCard, JobCardAction,
    JobCardLineItem, JobCardStatus, JobCardTimestamps, Lead, OrderStatus, PartsOrderLine, Product,
    WalletTopUp, next_invoice_number,
};

#[derive(Debug, Default)]
pub(crate) struct MemoryState {
    pub leads: HashMap<i64, Lead>,
    pub inspections: HashMap<i64, Inspection>,
    pub line_items: Vec<InspectionLineItem>,
    pub estimates: HashMap<i64, EstimateRecord>,
    pub job_cards: HashMap<i64, JobCard>,
    pub parts_status: HashMap<i64, PartsOrderLine>,
    pub invoices: HashMap<i64, Invoice>,
    pub wallets: HashMap<i64, CustomerWallet>,
    pub products: Vec<Product>,
    pub saves: Vec<(i64, EstimateSave)>,
    pub top_ups: Vec<(i64, WalletTopUp)>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

/// Stores everything in a mutex-guarded [`MemoryState`]. Methods named in
/// `failing` return a connection error instead of touching the state.
#[derive(Debug, Default)]
pub(crate) struct MemoryRepository {
    pub state: Mutex<MemoryState>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MemoryRepository {
    pub fn fail(
        &self,
        method: &'static str,
    ) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn with_state<T>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> T,
    ) -> T {
        f(&mut self.state.lock().unwrap())
    }

    fn check(
        &self,
        method: &'static str,
    ) -> Result<(), RepositoryError> {
        if self.failing.lock().unwrap().contains(method) {
            Err(RepositoryError::Connection(format!("{method} unavailable")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WorkshopRepository for MemoryRepository {
    async fn get_lead(&self, lead_id: i64) -> Result<Lead, RepositoryError> {
        self.check("get_lead")?;
        self.with_state(|s| s.leads.get(&lead_id).cloned().ok_or(RepositoryError::NotFound))
    }

    async fn get_inspection_for_lead(
        &self,
        lead_id: i64,
    ) -> Result<Option<Inspection>, RepositoryError> {
        self.check("get_inspection_for_lead")?;
        Ok(self.with_state(|s| {
            s.inspections
                .values()
                .find(|inspection| inspection.lead_id == lead_id)
                .cloned()
        }))
    }

    async fn list_inspection_line_items(
        &self,
        inspection_id: i64,
    ) -> Result<Vec<InspectionLineItem>, RepositoryError> {
        self.check("list_inspection_line_items")?;
        Ok(self.with_state(|s| {
            s.line_items
                .iter()
                .filter(|line| line.inspection_id == inspection_id)
                .cloned()
                .collect()
        }))
    }

    async fn get_estimate(&self, estimate_id: i64) -> Result<EstimateRecord, RepositoryError> {
        self.check("get_estimate")?;
        self.with_state(|s| {
            s.estimates
                .get(&estimate_id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        })
    }

    async fn find_estimate_for_lead(
        &self,
        lead_id: i64,
    ) -> Result<Option<Estimate>, RepositoryError> {
        self.check("find_estimate_for_lead")?;
        Ok(self.with_state(|s| {
            s.estimates
                .values()
                .find(|record| record.estimate.lead_id == Some(lead_id))
                .map(|record| record.estimate.clone())
        }))
    }

    async fn save_estimate(
        &self,
        estimate_id: i64,
        save: &EstimateSave,
    ) -> Result<Vec<i64>, RepositoryError> {
        self.check("save_estimate")?;
        self.with_state(|s| {
            if !s.estimates.contains_key(&estimate_id) {
                return Err(RepositoryError::NotFound);
            }
            let ids = save
                .items
                .iter()
                .map(|item| item.id.unwrap_or_else(|| s.next_id()))
                .collect();
            if let Some(record) = s.estimates.get_mut(&estimate_id) {
                record.estimate.status = save.status;
                record.estimate.vat_rate = save.vat_rate;
                record.estimate.discount_amount = save.discount_amount;
            }
            s.saves.push((estimate_id, save.clone()));
            Ok(ids)
        })
    }

    async fn order_approved_parts(
        &self,
        inspection_id: i64,
        approved_names: &[String],
    ) -> Result<u64, RepositoryError> {
        self.check("order_approved_parts")?;
        Ok(self.with_state(|s| {
            let mut updated = 0;
            for line in s
                .line_items
                .iter_mut()
                .filter(|line| line.inspection_id == inspection_id)
            {
                if approved_names.contains(&line.product_name) {
                    line.part_ordered = true;
                    line.order_status = Some(OrderStatus::Ordered);
                    updated += 1;
                }
            }
            updated
        }))
    }

    async fn create_job_card(&self, estimate_id: i64) -> Result<JobCard, RepositoryError> {
        self.check("create_job_card")?;
        self.with_state(|s| {
            let record = s
                .estimates
                .get(&estimate_id)
                .cloned()
                .ok_or(RepositoryError::NotFound)?;
            if s
                .job_cards
                .values()
                .any(|card| card.estimate_id == estimate_id && card.is_active())
            {
                return Err(RepositoryError::Conflict(
                    "job card already active".to_string(),
                ));
            }
            let id = s.next_id();
            let line_items = record
                .items
                .iter()
                .filter(|item| item.status == ItemStatus::Approved)
                .map(|item| JobCardLineItem {
                    id: item.id.unwrap_or_default(),
                    part_name: item.part_name.clone(),
                    order_status: item.order_status,
                    part_pic: None,
                    scrap_pic: None,
                })
                .collect();
            let card = JobCard {
                id,
                estimate_id,
                lead_id: record.estimate.lead_id,
                status: JobCardStatus::NotStarted,
                start_at: None,
                complete_at: None,
                remarks: None,
                line_items,
            };
            s.job_cards.insert(id, card.clone());
            Ok(card)
        })
    }

    async fn get_job_card(&self, job_card_id: i64) -> Result<JobCard, RepositoryError> {
        self.check("get_job_card")?;
        self.with_state(|s| {
            s.job_cards
                .get(&job_card_id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        })
    }

    async fn find_job_card_for_estimate(
        &self,
        estimate_id: i64,
    ) -> Result<Option<JobCard>, RepositoryError> {
        self.check("find_job_card_for_estimate")?;
        Ok(self.with_state(|s| {
            s.job_cards
                .values()
                .filter(|card| card.estimate_id == estimate_id)
                .max_by_key(|card| card.id)
                .cloned()
        }))
    }

    async fn update_job_card(
        &self,
        job_card_id: i64,
        action: &JobCardAction,
    ) -> Result<JobCardTimestamps, RepositoryError> {
        self.check("update_job_card")?;
        self.with_state(|s| {
            let card = s
                .job_cards
                .get_mut(&job_card_id)
                .ok_or(RepositoryError::NotFound)?;
            match action {
                JobCardAction::Start => {
                    card.status = JobCardStatus::InProgress;
                    card.start_at = Some(Utc::now());
                }
                JobCardAction::Complete { remarks } => {
                    card.status = JobCardStatus::Completed;
                    card.complete_at = Some(Utc::now());
                    card.remarks = Some(remarks.clone());
                }
            }
            Ok(JobCardTimestamps {
                start_at: card.start_at,
                complete_at: card.complete_at,
            })
        })
    }

    async fn get_parts_status(
        &self,
        lead_id: i64,
    ) -> Result<Option<PartsOrderLine>, RepositoryError> {
        self.check("get_parts_status")?;
        Ok(self.with_state(|s| s.parts_status.get(&lead_id).cloned()))
    }

    async fn create_invoice(&self, estimate_id: i64) -> Result<Invoice, RepositoryError> {
        self.check("create_invoice")?;
        self.with_state(|s| {
            let record = s
                .estimates
                .get(&estimate_id)
                .cloned()
                .ok_or(RepositoryError::NotFound)?;
            let totals = compute_totals(&record.items, record.estimate.vat_rate);
            let last = s
                .invoices
                .values()
                .map(|invoice| invoice.invoice_number.clone())
                .max();
            let id = s.next_id();
            let invoice = Invoice {
                id,
                lead_id: record.estimate.lead_id,
                estimate_id,
                customer_id: record.estimate.customer_id,
                status: InvoiceStatus::Draft,
                invoice_number: next_invoice_number(2026, last.as_deref()),
                grand_total: totals.approved.grand_total,
            };
            s.invoices.insert(id, invoice.clone());
            if let Some(record) = s.estimates.get_mut(&estimate_id) {
                record.estimate.status = EstimateStatus::Invoiced;
            }
            Ok(invoice)
        })
    }

    async fn get_invoice(&self, invoice_id: i64) -> Result<Invoice, RepositoryError> {
        self.check("get_invoice")?;
        self.with_state(|s| {
            s.invoices
                .get(&invoice_id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        })
    }

    async fn find_invoice_for_lead(
        &self,
        lead_id: i64,
    ) -> Result<Option<Invoice>, RepositoryError> {
        self.check("find_invoice_for_lead")?;
        Ok(self.with_state(|s| {
            s.invoices
                .values()
                .find(|invoice| invoice.lead_id == Some(lead_id))
                .cloned()
        }))
    }

    async fn pay_invoice(&self, invoice_id: i64) -> Result<(), RepositoryError> {
        self.check("pay_invoice")?;
        self.with_state(|s| {
            let invoice = s
                .invoices
                .get(&invoice_id)
                .cloned()
                .ok_or(RepositoryError::NotFound)?;
            let customer_id = invoice.customer_id.ok_or(RepositoryError::NotFound)?;
            let wallet = s
                .wallets
                .get_mut(&customer_id)
                .ok_or(RepositoryError::NotFound)?;
            if wallet.balance < invoice.grand_total {
                return Err(RepositoryError::Conflict("insufficient balance".to_string()));
            }
            wallet.balance -= invoice.grand_total;
            if let Some(invoice) = s.invoices.get_mut(&invoice_id) {
                invoice.status = InvoiceStatus::Paid;
            }
            Ok(())
        })
    }

    async fn create_wallet_transaction(
        &self,
        customer_id: i64,
        top_up: &WalletTopUp,
    ) -> Result<(), RepositoryError> {
        self.check("create_wallet_transaction")?;
        self.with_state(|s| {
            let wallet = s.wallets.entry(customer_id).or_insert(CustomerWallet {
                customer_id,
                company_id: 1,
                balance: Decimal::ZERO,
            });
            wallet.balance += top_up.amount;
            s.top_ups.push((customer_id, top_up.clone()));
        });
        Ok(())
    }

    async fn get_wallet(&self, customer_id: i64) -> Result<CustomerWallet, RepositoryError> {
        self.check("get_wallet")?;
        self.with_state(|s| {
            s.wallets
                .get(&customer_id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        })
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        self.check("list_products")?;
        Ok(self.with_state(|s| s.products.clone()))
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        self.check("upsert_product")?;
        self.with_state(|s| {
            s.products.retain(|existing| existing.name != product.name);
            s.products.push(product.clone());
        });
        Ok(())
    }
}
