mod estimate;
mod estimate_item;
mod inspection;
mod invoice;
mod job_card;
mod lead;
mod parts_order;
mod product;
mod stage;
mod wallet;

pub use estimate::{
    DEFAULT_VAT_RATE, Estimate, EstimateDraft, EstimateItemSave, EstimateRecord, EstimateSave,
    EstimateStatus,
};
pub use estimate_item::{EstimateItem, ItemSource, ItemStatus, ItemType, OrderStatus};
pub use inspection::{Inspection, InspectionLineItem};
pub use invoice::{Invoice, InvoiceStatus, next_invoice_number};
pub use job_card::{JobCard, JobCardAction, JobCardLineItem, JobCardStatus, JobCardTimestamps};
pub use lead::{Lead, LeadType};
pub use parts_order::PartsOrderLine;
pub use product::{Product, ProductCatalog};
pub use stage::{LeadStage, Phase, UnknownStageError};
pub use wallet::{CustomerWallet, PaymentMethod, WalletTopUp};
