use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Decode, Row, Sqlite, Type};
use tracing::{debug, info};
use workshop_core::calculations::common::round_half_up;
use workshop_core::calculations::compute_totals;
use workshop_core::calculations::gates::approved_spare_parts;
use workshop_core::{
    CustomerWallet, Estimate, EstimateItem, EstimateRecord, EstimateSave, EstimateStatus,
    Inspection, InspectionLineItem, Invoice, InvoiceStatus, ItemSource, ItemStatus, ItemType,
    JobCard, JobCardAction, JobCardLineItem, JobCardStatus, JobCardTimestamps, Lead, LeadStage,
    LeadType, OrderStatus, PartsOrderLine, Product, ProductCatalog, RepositoryError,
    WalletTopUp, WorkshopRepository, next_invoice_number,
};

use crate::decimal::{decimal_to_f64, get_decimal, get_optional_decimal, optional_decimal_to_f64};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens `database_url`, which may be a bare file path, a `sqlite:` URL
    /// or `:memory:`. Files are created when missing.
    ///
    /// An in-memory database lives only as long as its connections, so it
    /// gets a single connection that is never recycled.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Executes every `.sql` file in `seeds_dir`, in filename order.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(seed = %path.display(), "seed file applied");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_job_card_lines(
        &self,
        job_card_id: i64,
    ) -> Result<Vec<JobCardLineItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, part_name, order_status, part_pic, scrap_pic
             FROM job_card_line_items WHERE job_card_id = ? ORDER BY id",
        )
        .bind(job_card_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_job_card_line).collect()
    }

    async fn job_card_from_row(
        &self,
        row: &SqliteRow,
    ) -> Result<JobCard, RepositoryError> {
        let mut card = row_to_job_card(row)?;
        card.line_items = self.load_job_card_lines(card.id).await?;
        Ok(card)
    }
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn column<'r, T>(
    row: &'r SqliteRow,
    name: &str,
) -> Result<T, RepositoryError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RepositoryError::Database(format!("Failed to get {}: {}", name, e)))
}

fn unknown_value(
    name: &str,
    value: &str,
) -> RepositoryError {
    RepositoryError::Database(format!("Unknown {} '{}'", name, value))
}

fn order_status_column(
    row: &SqliteRow,
    name: &str,
) -> Result<Option<OrderStatus>, RepositoryError> {
    let raw: Option<String> = column(row, name)?;
    Ok(raw.as_deref().and_then(OrderStatus::parse))
}

/// Moves the lead to `target` if it currently sits at an earlier stage.
/// Leads that are already further along, or at an unknown stage, are left
/// alone.
async fn advance_stage(
    conn: &mut SqliteConnection,
    lead_id: Option<i64>,
    target: LeadStage,
) -> Result<bool, RepositoryError> {
    let Some(lead_id) = lead_id else {
        return Ok(false);
    };
    let earlier = target.predecessors();
    if earlier.is_empty() {
        return Ok(false);
    }

    let placeholders = vec!["?"; earlier.len()].join(", ");
    let sql = format!(
        "UPDATE leads SET lead_stage = ?, updated_at = ?
         WHERE id = ? AND lead_stage IN ({})",
        placeholders
    );
    let mut query = sqlx::query(&sql)
        .bind(target.as_str())
        .bind(Utc::now())
        .bind(lead_id);
    for stage in &earlier {
        query = query.bind(stage.as_str());
    }

    let result = query.execute(&mut *conn).await.map_err(db_error)?;
    let moved = result.rows_affected() > 0;
    if moved {
        info!(lead_id, stage = target.as_str(), "lead stage advanced");
    }
    Ok(moved)
}

fn row_to_lead(row: &SqliteRow) -> Result<Lead, RepositoryError> {
    let lead_type: String = column(row, "lead_type")?;
    Ok(Lead {
        id: column(row, "id")?,
        company_id: column(row, "company_id")?,
        lead_type: LeadType::parse(&lead_type)
            .ok_or_else(|| unknown_value("lead type", &lead_type))?,
        lead_stage: column(row, "lead_stage")?,
        lead_status: column(row, "lead_status")?,
        customer_id: column(row, "customer_id")?,
        car_id: column(row, "car_id")?,
        checkin_at: column::<Option<DateTime<Utc>>>(row, "checkin_at")?,
        customer_wallet_amount: get_decimal(row, "wallet_balance")?,
    })
}

fn row_to_inspection(row: &SqliteRow) -> Result<Inspection, RepositoryError> {
    Ok(Inspection {
        id: column(row, "id")?,
        lead_id: column(row, "lead_id")?,
        started_at: column::<Option<DateTime<Utc>>>(row, "started_at")?,
        completed_at: column::<Option<DateTime<Utc>>>(row, "completed_at")?,
    })
}

fn row_to_inspection_line(row: &SqliteRow) -> Result<InspectionLineItem, RepositoryError> {
    Ok(InspectionLineItem {
        id: column(row, "id")?,
        inspection_id: column(row, "inspection_id")?,
        product_name: column(row, "product_name")?,
        quantity: get_decimal(row, "quantity")?,
        part_ordered: column(row, "part_ordered")?,
        order_status: order_status_column(row, "order_status")?,
    })
}

fn row_to_estimate(row: &SqliteRow) -> Result<Estimate, RepositoryError> {
    let status: String = column(row, "status")?;
    Ok(Estimate {
        id: column(row, "id")?,
        company_id: column(row, "company_id")?,
        lead_id: column(row, "lead_id")?,
        inspection_id: column(row, "inspection_id")?,
        customer_id: column(row, "customer_id")?,
        car_id: column(row, "car_id")?,
        status: EstimateStatus::parse(&status)
            .ok_or_else(|| unknown_value("estimate status", &status))?,
        vat_rate: get_decimal(row, "vat_rate")?,
        discount_amount: get_decimal(row, "discount_amount")?,
    })
}

fn row_to_estimate_item(row: &SqliteRow) -> Result<EstimateItem, RepositoryError> {
    let line_no: i64 = column(row, "line_no")?;
    let item_type: String = column(row, "item_type")?;
    let status: String = column(row, "status")?;
    let source: String = column(row, "source")?;

    Ok(EstimateItem {
        id: Some(column(row, "id")?),
        line_no: u32::try_from(line_no)
            .map_err(|_| RepositoryError::Database(format!("Invalid line number {}", line_no)))?,
        inspection_item_id: column(row, "inspection_item_id")?,
        part_name: column(row, "part_name")?,
        description: column(row, "description")?,
        item_type: ItemType::parse(&item_type),
        product_type: column(row, "product_type")?,
        quantity: get_decimal(row, "quantity")?,
        cost: get_decimal(row, "cost")?,
        sale: get_decimal(row, "sale")?,
        approved_sale: get_optional_decimal(row, "approved_sale")?,
        discount: get_decimal(row, "discount")?,
        gp_percent: get_optional_decimal(row, "gp_percent")?,
        status: ItemStatus::parse(&status).ok_or_else(|| unknown_value("item status", &status))?,
        source: ItemSource::parse(&source).ok_or_else(|| unknown_value("item source", &source))?,
        part_ordered: column(row, "part_ordered")?,
        order_status: order_status_column(row, "order_status")?,
    })
}

fn row_to_job_card(row: &SqliteRow) -> Result<JobCard, RepositoryError> {
    let status: String = column(row, "status")?;
    Ok(JobCard {
        id: column(row, "id")?,
        estimate_id: column(row, "estimate_id")?,
        lead_id: column(row, "lead_id")?,
        status: JobCardStatus::parse(&status)
            .ok_or_else(|| unknown_value("job card status", &status))?,
        start_at: column::<Option<DateTime<Utc>>>(row, "start_at")?,
        complete_at: column::<Option<DateTime<Utc>>>(row, "complete_at")?,
        remarks: column(row, "remarks")?,
        line_items: Vec::new(),
    })
}

fn row_to_job_card_line(row: &SqliteRow) -> Result<JobCardLineItem, RepositoryError> {
    Ok(JobCardLineItem {
        id: column(row, "id")?,
        part_name: column(row, "part_name")?,
        order_status: order_status_column(row, "order_status")?,
        part_pic: column(row, "part_pic")?,
        scrap_pic: column(row, "scrap_pic")?,
    })
}

fn row_to_invoice(row: &SqliteRow) -> Result<Invoice, RepositoryError> {
    let status: String = column(row, "status")?;
    Ok(Invoice {
        id: column(row, "id")?,
        lead_id: column(row, "lead_id")?,
        estimate_id: column(row, "estimate_id")?,
        customer_id: column(row, "customer_id")?,
        status: InvoiceStatus::parse(&status)
            .ok_or_else(|| unknown_value("invoice status", &status))?,
        invoice_number: column(row, "invoice_number")?,
        grand_total: get_decimal(row, "grand_total")?,
    })
}

const LEAD_SELECT: &str = "SELECT l.id, l.company_id, l.lead_type, l.lead_stage, l.lead_status,
            l.customer_id, l.car_id, l.checkin_at, c.wallet_balance
     FROM leads l LEFT JOIN customers c ON c.id = l.customer_id";

const ESTIMATE_SELECT: &str = "SELECT id, company_id, lead_id, inspection_id, customer_id, car_id,
            status, vat_rate, discount_amount
     FROM estimates";

const JOB_CARD_SELECT: &str =
    "SELECT id, estimate_id, lead_id, status, start_at, complete_at, remarks FROM job_cards";

const INVOICE_SELECT: &str = "SELECT id, lead_id, estimate_id, customer_id, status, invoice_number, grand_total
     FROM invoices";

#[async_trait]
impl WorkshopRepository for SqliteRepository {
    async fn get_lead(&self, lead_id: i64) -> Result<Lead, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE l.id = ?", LEAD_SELECT))
            .bind(lead_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_lead(&row)
    }

    async fn get_inspection_for_lead(
        &self,
        lead_id: i64,
    ) -> Result<Option<Inspection>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, lead_id, started_at, completed_at
             FROM inspections WHERE lead_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_inspection).transpose()
    }

    async fn list_inspection_line_items(
        &self,
        inspection_id: i64,
    ) -> Result<Vec<InspectionLineItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, inspection_id, product_name, quantity, part_ordered, order_status
             FROM inspection_line_items WHERE inspection_id = ? ORDER BY id",
        )
        .bind(inspection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.iter().map(row_to_inspection_line).collect()
    }

    async fn get_estimate(&self, estimate_id: i64) -> Result<EstimateRecord, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", ESTIMATE_SELECT))
            .bind(estimate_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;
        let estimate = row_to_estimate(&row)?;

        // Procurement state lives on the inspection line the item came from.
        let rows = sqlx::query(
            "SELECT ei.id, ei.line_no, ei.inspection_item_id, ei.part_name, ei.description,
                    ei.item_type, ei.product_type, ei.quantity, ei.cost, ei.sale,
                    ei.approved_sale, ei.discount, ei.gp_percent, ei.status, ei.source,
                    COALESCE(ili.part_ordered, 0) AS part_ordered, ili.order_status
             FROM estimate_items ei
             LEFT JOIN inspection_line_items ili ON ili.id = ei.inspection_item_id
             WHERE ei.estimate_id = ?
             ORDER BY ei.line_no, ei.id",
        )
        .bind(estimate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        let items = rows
            .iter()
            .map(row_to_estimate_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EstimateRecord { estimate, items })
    }

    async fn find_estimate_for_lead(
        &self,
        lead_id: i64,
    ) -> Result<Option<Estimate>, RepositoryError> {
        let row = sqlx::query(&format!(
            "{} WHERE lead_id = ? ORDER BY id DESC LIMIT 1",
            ESTIMATE_SELECT
        ))
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_estimate).transpose()
    }

    /// Replaces the header and the full line set. Lines missing from the
    /// payload are deleted; lines without a stored id are inserted.
    async fn save_estimate(
        &self,
        estimate_id: i64,
        save: &EstimateSave,
    ) -> Result<Vec<i64>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query(
            "UPDATE estimates SET status = ?, vat_rate = ?, discount_amount = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(save.status.as_str())
        .bind(decimal_to_f64(save.vat_rate))
        .bind(decimal_to_f64(save.discount_amount))
        .bind(Utc::now())
        .bind(estimate_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let existing: HashSet<i64> =
            sqlx::query_scalar::<_, i64>("SELECT id FROM estimate_items WHERE estimate_id = ?")
                .bind(estimate_id)
                .fetch_all(&mut *tx)
                .await
                .map_err(db_error)?
                .into_iter()
                .collect();
        let kept: HashSet<i64> = save.items.iter().filter_map(|item| item.id).collect();

        for removed in existing.difference(&kept) {
            sqlx::query("DELETE FROM estimate_items WHERE id = ?")
                .bind(removed)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        let mut ids = Vec::with_capacity(save.items.len());
        for item in &save.items {
            let id = match item.id.filter(|id| existing.contains(id)) {
                Some(id) => {
                    sqlx::query(
                        "UPDATE estimate_items SET
                            line_no = ?, inspection_item_id = ?, part_name = ?, description = ?,
                            item_type = ?, quantity = ?, cost = ?, sale = ?, approved_sale = ?,
                            discount = ?, gp_percent = ?, status = ?
                         WHERE id = ?",
                    )
                    .bind(i64::from(item.line_no))
                    .bind(item.inspection_item_id)
                    .bind(&item.part_name)
                    .bind(&item.description)
                    .bind(item.item_type.as_str())
                    .bind(decimal_to_f64(item.quantity))
                    .bind(decimal_to_f64(item.cost))
                    .bind(decimal_to_f64(item.sale))
                    .bind(optional_decimal_to_f64(item.approved_sale))
                    .bind(decimal_to_f64(item.discount))
                    .bind(optional_decimal_to_f64(item.gp_percent))
                    .bind(item.status.as_str())
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error)?;
                    id
                }
                None => {
                    let source = if item.inspection_item_id.is_some() {
                        ItemSource::Inspection
                    } else {
                        ItemSource::Estimate
                    };
                    sqlx::query(
                        "INSERT INTO estimate_items (
                            estimate_id, line_no, inspection_item_id, part_name, description,
                            item_type, quantity, cost, sale, approved_sale, discount,
                            gp_percent, status, source
                        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    )
                    .bind(estimate_id)
                    .bind(i64::from(item.line_no))
                    .bind(item.inspection_item_id)
                    .bind(&item.part_name)
                    .bind(&item.description)
                    .bind(item.item_type.as_str())
                    .bind(decimal_to_f64(item.quantity))
                    .bind(decimal_to_f64(item.cost))
                    .bind(decimal_to_f64(item.sale))
                    .bind(optional_decimal_to_f64(item.approved_sale))
                    .bind(decimal_to_f64(item.discount))
                    .bind(optional_decimal_to_f64(item.gp_percent))
                    .bind(item.status.as_str())
                    .bind(source.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(db_error)?
                    .last_insert_rowid()
                }
            };
            ids.push(id);
        }

        if save.status == EstimateStatus::Approved {
            let lead_id: Option<i64> =
                sqlx::query_scalar("SELECT lead_id FROM estimates WHERE id = ?")
                    .bind(estimate_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(db_error)?;
            advance_stage(&mut tx, lead_id, LeadStage::EstimateApproved).await?;
        }

        tx.commit().await.map_err(db_error)?;
        debug!(estimate_id, items = ids.len(), "estimate saved");
        Ok(ids)
    }

    async fn order_approved_parts(
        &self,
        inspection_id: i64,
        approved_names: &[String],
    ) -> Result<u64, RepositoryError> {
        let names: BTreeSet<&str> = approved_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let lead_id: Option<i64> =
            sqlx::query_scalar("SELECT lead_id FROM inspections WHERE id = ?")
                .bind(inspection_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?
                .ok_or(RepositoryError::NotFound)?;

        let mut updated = 0;
        for name in names {
            let result = sqlx::query(
                "UPDATE inspection_line_items
                 SET part_ordered = 1,
                     order_status = CASE
                         WHEN order_status IN ('Ordered', 'Received', 'Returned') THEN order_status
                         ELSE 'Ordered'
                     END
                 WHERE inspection_id = ? AND product_name = ? AND part_ordered = 0",
            )
            .bind(inspection_id)
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
            updated += result.rows_affected();
        }

        if updated > 0 {
            advance_stage(&mut tx, lead_id, LeadStage::PartsPending).await?;
        }
        tx.commit().await.map_err(db_error)?;
        Ok(updated)
    }

    async fn create_job_card(&self, estimate_id: i64) -> Result<JobCard, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let lead_id: Option<i64> = sqlx::query_scalar("SELECT lead_id FROM estimates WHERE id = ?")
            .bind(estimate_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_cards WHERE estimate_id = ? AND status != 'Completed'",
        )
        .bind(estimate_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        if active > 0 {
            return Err(RepositoryError::Conflict(format!(
                "estimate {} already has an active job card",
                estimate_id
            )));
        }

        let job_card_id = sqlx::query(
            "INSERT INTO job_cards (estimate_id, lead_id, status, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(estimate_id)
        .bind(lead_id)
        .bind(JobCardStatus::NotStarted.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .last_insert_rowid();

        let approved = sqlx::query(
            "SELECT ei.id, ei.part_name, ili.order_status
             FROM estimate_items ei
             LEFT JOIN inspection_line_items ili ON ili.id = ei.inspection_item_id
             WHERE ei.estimate_id = ? AND ei.status = 'approved'
             ORDER BY ei.line_no, ei.id",
        )
        .bind(estimate_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error)?;

        let mut line_items = Vec::with_capacity(approved.len());
        for row in &approved {
            let estimate_item_id: i64 = column(row, "id")?;
            let part_name: String = column(row, "part_name")?;
            let order_status = order_status_column(row, "order_status")?;
            let id = sqlx::query(
                "INSERT INTO job_card_line_items (job_card_id, estimate_item_id, part_name, order_status)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(job_card_id)
            .bind(estimate_item_id)
            .bind(&part_name)
            .bind(order_status.map(|status| status.as_str()))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .last_insert_rowid();

            line_items.push(JobCardLineItem {
                id,
                part_name,
                order_status,
                part_pic: None,
                scrap_pic: None,
            });
        }

        advance_stage(&mut tx, lead_id, LeadStage::AssignedForWork).await?;
        tx.commit().await.map_err(db_error)?;

        Ok(JobCard {
            id: job_card_id,
            estimate_id,
            lead_id,
            status: JobCardStatus::NotStarted,
            start_at: None,
            complete_at: None,
            remarks: None,
            line_items,
        })
    }

    async fn get_job_card(&self, job_card_id: i64) -> Result<JobCard, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", JOB_CARD_SELECT))
            .bind(job_card_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        self.job_card_from_row(&row).await
    }

    async fn find_job_card_for_estimate(
        &self,
        estimate_id: i64,
    ) -> Result<Option<JobCard>, RepositoryError> {
        let row = sqlx::query(&format!(
            "{} WHERE estimate_id = ? ORDER BY id DESC LIMIT 1",
            JOB_CARD_SELECT
        ))
        .bind(estimate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        match row {
            Some(row) => self.job_card_from_row(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn update_job_card(
        &self,
        job_card_id: i64,
        action: &JobCardAction,
    ) -> Result<JobCardTimestamps, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let (result, target, refusal) = match action {
            JobCardAction::Start => (
                sqlx::query(
                    "UPDATE job_cards SET status = 'in progress', start_at = ?
                     WHERE id = ? AND status = 'not started' AND start_at IS NULL",
                )
                .bind(now)
                .bind(job_card_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?,
                LeadStage::WorkStarted,
                "job card has already been started",
            ),
            JobCardAction::Complete { remarks } => (
                sqlx::query(
                    "UPDATE job_cards SET status = 'Completed', complete_at = ?, remarks = ?
                     WHERE id = ? AND status = 'in progress'",
                )
                .bind(now)
                .bind(remarks.trim())
                .bind(job_card_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?,
                LeadStage::WorkCompleted,
                "job card is not in progress",
            ),
        };

        let row = sqlx::query("SELECT lead_id, start_at, complete_at FROM job_cards WHERE id = ?")
            .bind(job_card_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(refusal.to_string()));
        }

        let lead_id: Option<i64> = column(&row, "lead_id")?;
        let timestamps = JobCardTimestamps {
            start_at: column::<Option<DateTime<Utc>>>(&row, "start_at")?,
            complete_at: column::<Option<DateTime<Utc>>>(&row, "complete_at")?,
        };
        advance_stage(&mut tx, lead_id, target).await?;
        tx.commit().await.map_err(db_error)?;

        Ok(timestamps)
    }

    /// Derived from the lead's latest estimate: approved spare parts only,
    /// classified against the product catalog.
    async fn get_parts_status(
        &self,
        lead_id: i64,
    ) -> Result<Option<PartsOrderLine>, RepositoryError> {
        let Some(estimate) = self.find_estimate_for_lead(lead_id).await? else {
            return Ok(None);
        };
        let record = self.get_estimate(estimate.id).await?;
        let catalog: ProductCatalog = self.list_products().await?.into_iter().collect();

        let mut status = PartsOrderLine {
            lead_id,
            inspection_item_id: None,
            ordered_count: 0,
            received_count: 0,
            approved_spare_pending_count: 0,
        };
        for item in approved_spare_parts(&record.items, &catalog) {
            if item.is_procured() {
                status.ordered_count += 1;
            } else {
                status.approved_spare_pending_count += 1;
            }
            if item.order_status == Some(OrderStatus::Received) {
                status.received_count += 1;
            }
        }
        Ok(Some(status))
    }

    /// Issues the next `INV-<year>-NNNN` number for the estimate's approved
    /// grand total and marks the estimate invoiced.
    async fn create_invoice(&self, estimate_id: i64) -> Result<Invoice, RepositoryError> {
        let record = self.get_estimate(estimate_id).await?;
        let estimate = &record.estimate;
        let grand_total = round_half_up(
            compute_totals(&record.items, estimate.vat_rate)
                .approved
                .grand_total,
        );
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let open: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invoices WHERE estimate_id = ? AND status != 'cancelled'",
        )
        .bind(estimate_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        if open > 0 {
            return Err(RepositoryError::Conflict(format!(
                "estimate {} is already invoiced",
                estimate_id
            )));
        }

        let year = now.year();
        let last: Option<String> = sqlx::query_scalar(
            "SELECT MAX(invoice_number) FROM invoices WHERE invoice_number LIKE ?",
        )
        .bind(format!("INV-{}-%", year))
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        let invoice_number = next_invoice_number(year, last.as_deref());

        let id = sqlx::query(
            "INSERT INTO invoices (
                company_id, lead_id, estimate_id, customer_id, invoice_number,
                invoice_date, status, vat_rate, grand_total
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(estimate.company_id)
        .bind(estimate.lead_id)
        .bind(estimate_id)
        .bind(estimate.customer_id)
        .bind(&invoice_number)
        .bind(now)
        .bind(InvoiceStatus::Draft.as_str())
        .bind(decimal_to_f64(estimate.vat_rate))
        .bind(decimal_to_f64(grand_total))
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .last_insert_rowid();

        sqlx::query("UPDATE estimates SET status = ?, updated_at = ? WHERE id = ?")
            .bind(EstimateStatus::Invoiced.as_str())
            .bind(now)
            .bind(estimate_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        advance_stage(&mut tx, estimate.lead_id, LeadStage::InvoiceIssued).await?;
        tx.commit().await.map_err(db_error)?;

        Ok(Invoice {
            id,
            lead_id: estimate.lead_id,
            estimate_id,
            customer_id: estimate.customer_id,
            status: InvoiceStatus::Draft,
            invoice_number,
            grand_total,
        })
    }

    async fn get_invoice(&self, invoice_id: i64) -> Result<Invoice, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", INVOICE_SELECT))
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_invoice(&row)
    }

    async fn find_invoice_for_lead(
        &self,
        lead_id: i64,
    ) -> Result<Option<Invoice>, RepositoryError> {
        let row = sqlx::query(&format!(
            "{} WHERE lead_id = ? ORDER BY id DESC LIMIT 1",
            INVOICE_SELECT
        ))
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.as_ref().map(row_to_invoice).transpose()
    }

    /// The balance check and the debit are one conditional UPDATE, so two
    /// payments racing for the same wallet cannot both succeed.
    async fn pay_invoice(&self, invoice_id: i64) -> Result<(), RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = sqlx::query(&format!("{} WHERE id = ?", INVOICE_SELECT))
            .bind(invoice_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;
        let invoice = row_to_invoice(&row)?;

        match invoice.status {
            InvoiceStatus::Paid => {
                return Err(RepositoryError::Conflict("invoice already paid".to_string()));
            }
            InvoiceStatus::Cancelled => {
                return Err(RepositoryError::Conflict("invoice is cancelled".to_string()));
            }
            InvoiceStatus::Draft | InvoiceStatus::Issued => {}
        }
        let customer_id = invoice
            .customer_id
            .ok_or_else(|| RepositoryError::Conflict("invoice has no customer".to_string()))?;
        let company_id: i64 = sqlx::query_scalar("SELECT company_id FROM customers WHERE id = ?")
            .bind(customer_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        let amount = decimal_to_f64(invoice.grand_total);
        let debited = sqlx::query(
            "UPDATE customers SET wallet_balance = ROUND(wallet_balance - ?, 2)
             WHERE id = ? AND ROUND(wallet_balance, 2) >= ROUND(?, 2)",
        )
        .bind(amount)
        .bind(customer_id)
        .bind(amount)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        if debited.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "insufficient wallet balance".to_string(),
            ));
        }

        sqlx::query(
            "INSERT INTO wallet_transactions (
                customer_id, company_id, kind, amount, method, transaction_date,
                invoice_id, created_at
            ) VALUES (?, ?, 'payment', ?, 'wallet', ?, ?, ?)",
        )
        .bind(customer_id)
        .bind(company_id)
        .bind(-amount)
        .bind(now.date_naive())
        .bind(invoice_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query("UPDATE invoices SET status = ?, paid_at = ? WHERE id = ?")
            .bind(InvoiceStatus::Paid.as_str())
            .bind(now)
            .bind(invoice_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        advance_stage(&mut tx, invoice.lead_id, LeadStage::HandoverPending).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn create_wallet_transaction(
        &self,
        customer_id: i64,
        top_up: &WalletTopUp,
    ) -> Result<(), RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let company_id: i64 = sqlx::query_scalar("SELECT company_id FROM customers WHERE id = ?")
            .bind(customer_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        let amount = decimal_to_f64(top_up.amount);
        sqlx::query(
            "INSERT INTO wallet_transactions (
                customer_id, company_id, kind, amount, method, transaction_date,
                proof_file_id, created_at
            ) VALUES (?, ?, 'topup', ?, ?, ?, ?, ?)",
        )
        .bind(customer_id)
        .bind(company_id)
        .bind(amount)
        .bind(top_up.method.as_str())
        .bind(top_up.date.unwrap_or_else(|| now.date_naive()))
        .bind(&top_up.proof_file_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        sqlx::query("UPDATE customers SET wallet_balance = ROUND(wallet_balance + ?, 2) WHERE id = ?")
            .bind(amount)
            .bind(customer_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(())
    }

    async fn get_wallet(&self, customer_id: i64) -> Result<CustomerWallet, RepositoryError> {
        let row = sqlx::query("SELECT id, company_id, wallet_balance FROM customers WHERE id = ?")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(RepositoryError::NotFound)?;

        Ok(CustomerWallet {
            customer_id: column(&row, "id")?,
            company_id: column(&row, "company_id")?,
            balance: get_decimal(&row, "wallet_balance")?,
        })
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query("SELECT name, product_type FROM products ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter()
            .map(|row| {
                Ok(Product {
                    name: column(row, "name")?,
                    product_type: column(row, "product_type")?,
                })
            })
            .collect()
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO products (name, product_type) VALUES (?, ?)
             ON CONFLICT(name) DO UPDATE SET product_type = excluded.product_type",
        )
        .bind(product.name.trim())
        .bind(product.product_type.trim())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use workshop_core::{EstimateDraft, PaymentMethod};

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool);
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    async fn execute(
        repo: &SqliteRepository,
        sql: &str,
    ) {
        sqlx::raw_sql(sql)
            .execute(repo.pool())
            .await
            .expect("Failed to execute fixture SQL");
    }

    /// Customer 1 (wallet 50), lead 1 at estimate_pending with a completed
    /// inspection of two lines, and an empty estimate 1.
    async fn insert_lead_fixture(repo: &SqliteRepository) {
        execute(
            repo,
            "INSERT INTO customers (id, company_id, name, wallet_balance) VALUES (1, 7, 'Amira', 50.0);
             INSERT INTO leads (id, company_id, lead_type, lead_stage, lead_status, customer_id, car_id, checkin_at)
                 VALUES (1, 7, 'workshop', 'estimate_pending', 'open', 1, 3, '2026-01-05T08:30:00Z');
             INSERT INTO inspections (id, lead_id, started_at, completed_at)
                 VALUES (1, 1, '2026-01-05T09:00:00Z', '2026-01-05T09:45:00Z');
             INSERT INTO inspection_line_items (id, inspection_id, product_name, quantity)
                 VALUES (11, 1, 'Brake Pads', 2), (12, 1, 'Wheel Alignment', 1);
             INSERT INTO estimates (id, company_id, lead_id, inspection_id, customer_id, car_id)
                 VALUES (1, 7, 1, 1, 1, 3);
             INSERT INTO products (name, product_type) VALUES ('Brake Pads', 'Spare Part');",
        )
        .await;
    }

    async fn lead_stage(repo: &SqliteRepository) -> String {
        repo.get_lead(1).await.expect("Should load lead").lead_stage
    }

    /// Saves an approved brake pads line (2 x 45) and a pending labour line.
    async fn save_priced_estimate(
        repo: &SqliteRepository,
        status: EstimateStatus,
    ) -> Vec<i64> {
        let lines: Vec<InspectionLineItem> = repo
            .list_inspection_line_items(1)
            .await
            .expect("Should list line items");
        let record = repo.get_estimate(1).await.expect("Should load estimate");
        let mut draft = EstimateDraft::from(record);
        draft.items = lines
            .iter()
            .enumerate()
            .map(|(idx, line)| EstimateItem::from_inspection_line(idx as u32 + 1, line))
            .collect();
        draft.items[0].cost = dec!(30);
        draft.items[0].sale = dec!(45);
        draft.items[0].status = ItemStatus::Approved;
        draft.items[1].item_type = ItemType::Repair;
        draft.items[1].sale = dec!(60);
        draft.estimate.status = status;

        repo.save_estimate(1, &draft.to_save())
            .await
            .expect("Should save estimate")
    }

    // ========================================================================
    // Leads and inspections
    // ========================================================================

    #[tokio::test]
    async fn get_lead_includes_wallet_amount() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;

        let lead = repo.get_lead(1).await.expect("Should load lead");

        assert_eq!(lead.company_id, 7);
        assert_eq!(lead.lead_type, LeadType::Workshop);
        assert_eq!(lead.lead_stage, "estimate_pending");
        assert_eq!(lead.customer_id, Some(1));
        assert_eq!(lead.customer_wallet_amount, dec!(50));
        assert!(lead.checkin_at.is_some());
    }

    #[tokio::test]
    async fn get_lead_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_lead(404).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn inspection_and_line_items_for_lead() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;

        let inspection = repo
            .get_inspection_for_lead(1)
            .await
            .expect("Should query inspection")
            .expect("Lead should have an inspection");
        let lines = repo
            .list_inspection_line_items(inspection.id)
            .await
            .expect("Should list line items");

        assert!(inspection.is_completed());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_name, "Brake Pads");
        assert_eq!(lines[0].quantity, dec!(2));
        assert!(!lines[0].part_ordered);
        assert_eq!(lines[0].order_status, None);
    }

    #[tokio::test]
    async fn lead_without_inspection_has_none() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;

        let inspection = repo
            .get_inspection_for_lead(2)
            .await
            .expect("Should query inspection");

        assert_eq!(inspection, None);
    }

    // ========================================================================
    // Estimates
    // ========================================================================

    #[tokio::test]
    async fn save_inserts_then_updates_lines() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        let ids = save_priced_estimate(&repo, EstimateStatus::Draft).await;

        let mut record = repo.get_estimate(1).await.expect("Should load estimate");
        assert_eq!(record.items.len(), 2);
        let stored: Vec<Option<i64>> = record.items.iter().map(|item| item.id).collect();
        assert_eq!(stored, ids.into_iter().map(Some).collect::<Vec<_>>());
        assert_eq!(record.items[0].source, ItemSource::Inspection);
        assert_eq!(record.items[0].inspection_item_id, Some(11));
        assert_eq!(record.items[1].item_type, ItemType::Repair);

        record.items[1].sale = dec!(75.5);
        let draft = EstimateDraft::from(record);
        let resaved = repo
            .save_estimate(1, &draft.to_save())
            .await
            .expect("Should save again");
        assert_eq!(resaved, stored.into_iter().flatten().collect::<Vec<_>>());

        let reloaded = repo.get_estimate(1).await.expect("Should reload");
        assert_eq!(reloaded.items.len(), 2);
        assert_eq!(reloaded.items[1].sale, dec!(75.5));
        assert_eq!(reloaded.items[0].id, draft.items[0].id);
    }

    #[tokio::test]
    async fn save_deletes_lines_omitted_from_payload() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        save_priced_estimate(&repo, EstimateStatus::Draft).await;

        let mut draft = EstimateDraft::from(repo.get_estimate(1).await.expect("Should load"));
        draft.items.truncate(1);
        repo.save_estimate(1, &draft.to_save())
            .await
            .expect("Should save");

        let reloaded = repo.get_estimate(1).await.expect("Should reload");
        assert_eq!(reloaded.items.len(), 1);
        assert_eq!(reloaded.items[0].part_name, "Brake Pads");
    }

    #[tokio::test]
    async fn save_unknown_estimate_is_not_found() {
        let repo = setup_test_db().await;
        let save = EstimateSave {
            status: EstimateStatus::Draft,
            vat_rate: dec!(5),
            discount_amount: Decimal::ZERO,
            items: Vec::new(),
        };

        assert_eq!(
            repo.save_estimate(99, &save).await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn approving_estimate_advances_lead_stage() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;

        save_priced_estimate(&repo, EstimateStatus::Approved).await;

        assert_eq!(lead_stage(&repo).await, "estimate_approved");
        let estimate = repo
            .find_estimate_for_lead(1)
            .await
            .expect("Should query estimate")
            .expect("Lead should have an estimate");
        assert_eq!(estimate.status, EstimateStatus::Approved);
        assert_eq!(estimate.vat_rate, dec!(5));
    }

    // ========================================================================
    // Parts
    // ========================================================================

    #[tokio::test]
    async fn order_approved_parts_marks_matching_lines_once() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        save_priced_estimate(&repo, EstimateStatus::Approved).await;
        let names = vec!["Brake Pads".to_string(), "Brake Pads".to_string()];

        let first = repo
            .order_approved_parts(1, &names)
            .await
            .expect("Should order parts");
        let second = repo
            .order_approved_parts(1, &names)
            .await
            .expect("Should order parts again");

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        let record = repo.get_estimate(1).await.expect("Should load estimate");
        assert!(record.items[0].part_ordered);
        assert_eq!(record.items[0].order_status, Some(OrderStatus::Ordered));
        assert!(!record.items[1].part_ordered);
        assert_eq!(lead_stage(&repo).await, "parts_pending");
    }

    #[tokio::test]
    async fn parts_status_counts_approved_spare_parts() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        save_priced_estimate(&repo, EstimateStatus::Approved).await;

        let before = repo
            .get_parts_status(1)
            .await
            .expect("Should compute status")
            .expect("Lead has an estimate");
        repo.order_approved_parts(1, &["Brake Pads".to_string()])
            .await
            .expect("Should order parts");
        let after = repo
            .get_parts_status(1)
            .await
            .expect("Should compute status")
            .expect("Lead has an estimate");

        assert_eq!(before.approved_spare_pending_count, 1);
        assert!(!before.is_ready());
        assert_eq!(after.ordered_count, 1);
        assert!(after.is_ready());
    }

    #[tokio::test]
    async fn parts_status_without_estimate_is_none() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_parts_status(1).await, Ok(None));
    }

    // ========================================================================
    // Job cards
    // ========================================================================

    #[tokio::test]
    async fn job_card_lifecycle() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        save_priced_estimate(&repo, EstimateStatus::Approved).await;

        let card = repo.create_job_card(1).await.expect("Should create job card");
        assert_eq!(card.status, JobCardStatus::NotStarted);
        assert_eq!(card.line_items.len(), 1);
        assert_eq!(card.line_items[0].part_name, "Brake Pads");
        assert_eq!(lead_stage(&repo).await, "assigned_for_work");

        let started = repo
            .update_job_card(card.id, &JobCardAction::Start)
            .await
            .expect("Should start");
        assert!(started.start_at.is_some());
        assert_eq!(lead_stage(&repo).await, "work_started");

        let completed = repo
            .update_job_card(
                card.id,
                &JobCardAction::Complete {
                    remarks: "  Pads fitted  ".to_string(),
                },
            )
            .await
            .expect("Should complete");
        assert!(completed.complete_at.is_some());

        let reloaded = repo.get_job_card(card.id).await.expect("Should reload");
        assert_eq!(reloaded.status, JobCardStatus::Completed);
        assert_eq!(reloaded.remarks.as_deref(), Some("Pads fitted"));
        assert_eq!(reloaded.line_items, card.line_items);
        assert_eq!(lead_stage(&repo).await, "work_completed");
    }

    #[tokio::test]
    async fn second_active_job_card_conflicts() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        save_priced_estimate(&repo, EstimateStatus::Approved).await;
        repo.create_job_card(1).await.expect("Should create job card");

        let result = repo.create_job_card(1).await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn completing_unstarted_job_card_conflicts() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        save_priced_estimate(&repo, EstimateStatus::Approved).await;
        let card = repo.create_job_card(1).await.expect("Should create job card");

        let result = repo
            .update_job_card(
                card.id,
                &JobCardAction::Complete {
                    remarks: "done".to_string(),
                },
            )
            .await;

        assert_eq!(
            result,
            Err(RepositoryError::Conflict(
                "job card is not in progress".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn updating_missing_job_card_is_not_found() {
        let repo = setup_test_db().await;

        let result = repo.update_job_card(5, &JobCardAction::Start).await;

        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn find_job_card_returns_latest() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        save_priced_estimate(&repo, EstimateStatus::Approved).await;

        assert_eq!(repo.find_job_card_for_estimate(1).await, Ok(None));
        let card = repo.create_job_card(1).await.expect("Should create job card");

        let found = repo
            .find_job_card_for_estimate(1)
            .await
            .expect("Should query job card");
        assert_eq!(found.map(|card| card.id), Some(card.id));
    }

    // ========================================================================
    // Invoices and wallets
    // ========================================================================

    #[tokio::test]
    async fn invoice_uses_approved_grand_total() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        save_priced_estimate(&repo, EstimateStatus::Approved).await;

        let invoice = repo.create_invoice(1).await.expect("Should create invoice");

        // 2 x 45 = 90, plus 5% VAT.
        assert_eq!(invoice.grand_total, dec!(94.50));
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert!(invoice.invoice_number.ends_with("-0001"));
        assert_eq!(repo.get_invoice(invoice.id).await, Ok(invoice.clone()));
        assert_eq!(repo.find_invoice_for_lead(1).await, Ok(Some(invoice)));
        assert_eq!(lead_stage(&repo).await, "invoice_issued");
        let record = repo.get_estimate(1).await.expect("Should load estimate");
        assert_eq!(record.estimate.status, EstimateStatus::Invoiced);
    }

    #[tokio::test]
    async fn invoicing_twice_conflicts() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        save_priced_estimate(&repo, EstimateStatus::Approved).await;
        repo.create_invoice(1).await.expect("Should create invoice");

        let result = repo.create_invoice(1).await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn short_wallet_refuses_payment() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        save_priced_estimate(&repo, EstimateStatus::Approved).await;
        let invoice = repo.create_invoice(1).await.expect("Should create invoice");

        let result = repo.pay_invoice(invoice.id).await;

        assert_eq!(
            result,
            Err(RepositoryError::Conflict(
                "insufficient wallet balance".to_string()
            ))
        );
        let wallet = repo.get_wallet(1).await.expect("Should load wallet");
        assert_eq!(wallet.balance, dec!(50));
    }

    #[tokio::test]
    async fn top_up_then_pay_debits_wallet() {
        let repo = setup_test_db().await;
        insert_lead_fixture(&repo).await;
        save_priced_estimate(&repo, EstimateStatus::Approved).await;
        let invoice = repo.create_invoice(1).await.expect("Should create invoice");
        let top_up = WalletTopUp {
            amount: dec!(44.5),
            method: PaymentMethod::Card,
            date: None,
            proof_file_id: Some("receipt-17".to_string()),
        };

        repo.create_wallet_transaction(1, &top_up)
            .await
            .expect("Should top up");
        repo.pay_invoice(invoice.id).await.expect("Should pay");

        let wallet = repo.get_wallet(1).await.expect("Should load wallet");
        assert_eq!(round_half_up(wallet.balance), dec!(0));
        let paid = repo.get_invoice(invoice.id).await.expect("Should reload");
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(lead_stage(&repo).await, "handover_pending");

        let kinds: Vec<String> =
            sqlx::query_scalar("SELECT kind FROM wallet_transactions ORDER BY id")
                .fetch_all(repo.pool())
                .await
                .expect("Should list transactions");
        assert_eq!(kinds, vec!["topup".to_string(), "payment".to_string()]);

        assert!(matches!(
            repo.pay_invoice(invoice.id).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn top_up_for_unknown_customer_is_not_found() {
        let repo = setup_test_db().await;
        let top_up = WalletTopUp {
            amount: dec!(10),
            method: PaymentMethod::Cash,
            date: None,
            proof_file_id: None,
        };

        let result = repo.create_wallet_transaction(42, &top_up).await;

        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    // ========================================================================
    // Products and seeds
    // ========================================================================

    #[tokio::test]
    async fn upsert_product_replaces_type_case_insensitively() {
        let repo = setup_test_db().await;

        repo.upsert_product(&Product {
            name: "Oil Filter".to_string(),
            product_type: "Consumable".to_string(),
        })
        .await
        .expect("Should insert product");
        repo.upsert_product(&Product {
            name: "oil filter".to_string(),
            product_type: "Spare Part".to_string(),
        })
        .await
        .expect("Should update product");

        let products = repo.list_products().await.expect("Should list products");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Oil Filter");
        assert_eq!(products[0].product_type, "Spare Part");
    }

    #[tokio::test]
    async fn test_run_seeds() {
        let repo = setup_test_db().await;

        repo.run_seeds(Path::new("./seeds"))
            .await
            .expect("Should run seeds successfully");
        // Seeds are idempotent.
        repo.run_seeds(Path::new("./seeds"))
            .await
            .expect("Should run seeds twice");

        let products = repo.list_products().await.expect("Should list products");
        assert_eq!(products.len(), 8);
        let lead = repo.get_lead(1).await.expect("Should find demo lead");
        assert_eq!(lead.lead_stage, "estimate_pending");
        assert_eq!(lead.customer_wallet_amount, dec!(50));
    }

    #[tokio::test]
    async fn test_run_seeds_nonexistent_directory() {
        let repo = setup_test_db().await;

        let result = repo.run_seeds(Path::new("./nonexistent")).await;

        let err = result.expect_err("Should fail for nonexistent directory");
        assert_eq!(
            err.to_string(),
            "Failed to read seeds directory './nonexistent'"
        );
    }
}
