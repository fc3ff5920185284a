//! Turn already-OCR'd receipt text into per-category purchase records.

mod extract;

pub(crate) use extract::{extract_items, extract_market_info, ReceiptItem};

use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;

use crate::categorize::Categorizer;
use crate::db::Store;
use crate::error::{AppResult, ValidationError};
use crate::models::{PurchaseRecord, PurchaseRecordDraft};
use crate::service;

pub(crate) const RECEIPT_SOURCE: &str = "ocr";

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ReceiptRequest {
    pub(crate) user_id: Option<String>,
    pub(crate) vendor: Option<String>,
    pub(crate) text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReceiptOutcome {
    /// One stored record per category found on the receipt.
    Recorded(Vec<PurchaseRecord>),
    /// The text could not be parsed; the user has to type the purchase in.
    ManualEntry,
}

impl ReceiptOutcome {
    pub(crate) fn is_manual_entry(&self) -> bool {
        matches!(self, Self::ManualEntry)
    }

    pub(crate) fn records(&self) -> &[PurchaseRecord] {
        match self {
            Self::Recorded(records) => records,
            Self::ManualEntry => &[],
        }
    }
}

impl Serialize for ReceiptOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ReceiptOutcome", 2)?;
        s.serialize_field("records", self.records())?;
        s.serialize_field("manualEntry", &self.is_manual_entry())?;
        s.end()
    }
}

/// Items of one category, in receipt order.
struct CategoryTotal<'a> {
    category: &'a str,
    amount: Decimal,
    names: Vec<&'a str>,
}

/// Parse `request.text`, categorize each line and store one purchase per
/// category.
///
/// Unparseable text yields [`ReceiptOutcome::ManualEntry`] and nothing is
/// stored. Validation and storage errors from ingestion are returned as is.
pub(crate) fn process_receipt(
    store: &mut impl Store,
    categorizer: &Categorizer,
    request: ReceiptRequest,
) -> AppResult<ReceiptOutcome> {
    let user_id = request
        .user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or(ValidationError::MissingField("user_id"))?;

    let Some(text) = request.text.filter(|t| !t.trim().is_empty()) else {
        log::warn!("Receipt for {user_id} has no text, manual entry required");
        return Ok(ReceiptOutcome::ManualEntry);
    };
    let Some(items) = extract_items(&text) else {
        log::warn!("Receipt for {user_id} could not be parsed, manual entry required");
        return Ok(ReceiptOutcome::ManualEntry);
    };

    let Some(totals) = totals_by_category(categorizer, &items) else {
        log::warn!("Receipt for {user_id} totals overflow, manual entry required");
        return Ok(ReceiptOutcome::ManualEntry);
    };
    log::debug!(
        "Receipt for {user_id}: {} items in {} categories",
        items.len(),
        totals.len()
    );

    let mut records = Vec::with_capacity(totals.len());
    for total in totals {
        let draft = PurchaseRecordDraft {
            user_id: Some(user_id.clone()),
            amount: Some(total.amount),
            category: Some(total.category.to_string()),
            purchase_date: None,
            market: request.vendor.clone(),
            description: Some(total.names.join(", ")),
            source: Some(RECEIPT_SOURCE.to_string()),
        };
        records.push(service::insert_purchase_record(store, draft)?);
    }
    Ok(ReceiptOutcome::Recorded(records))
}

/// `None` when a category total does not fit in a `Decimal`.
fn totals_by_category<'a>(
    categorizer: &'a Categorizer,
    items: &'a [ReceiptItem],
) -> Option<Vec<CategoryTotal<'a>>> {
    let mut totals: Vec<CategoryTotal<'a>> = Vec::new();
    for item in items {
        let category = categorizer.categorize_or_default(&item.name);
        match totals.iter_mut().find(|t| t.category == category) {
            Some(total) => {
                total.amount = total.amount.checked_add(item.price)?;
                total.names.push(&item.name);
            }
            None => totals.push(CategoryTotal {
                category,
                amount: item.price,
                names: vec![&item.name],
            }),
        }
    }
    Some(totals)
}
