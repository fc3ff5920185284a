//! Shape and business-rule checks run before any storage call.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::models::{BudgetDraft, PurchaseRecordDraft};

pub(crate) const MAX_PAGE_LIMIT: u32 = 100;
/// Upper bound for a single amount or budget limit. Keeps sums and
/// percentages well inside `Decimal` range.
pub(crate) const MAX_AMOUNT: i64 = 1_000_000_000;

/// Check a purchase draft. Required fields are reported in the fixed order
/// `user_id`, `amount`, `category`.
pub(crate) fn validate_record(draft: &PurchaseRecordDraft) -> Result<(), ValidationError> {
    if is_missing(draft.user_id.as_deref()) {
        return Err(ValidationError::MissingField("user_id"));
    }
    let Some(amount) = draft.amount else {
        return Err(ValidationError::MissingField("amount"));
    };
    let Some(category) = draft.category.as_deref() else {
        return Err(ValidationError::MissingField("category"));
    };

    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount);
    }
    if amount > Decimal::from(MAX_AMOUNT) {
        return Err(ValidationError::AmountTooLarge);
    }
    if category.trim().is_empty() {
        return Err(ValidationError::EmptyCategory);
    }
    if let Some(date) = draft.purchase_date.as_deref() {
        validate_date(date)?;
    }
    Ok(())
}

/// Check a budget draft. `user_id` is always required.
pub(crate) fn validate_budget(draft: &BudgetDraft) -> Result<(), ValidationError> {
    if is_missing(draft.user_id.as_deref()) {
        return Err(ValidationError::MissingField("user_id"));
    }
    let Some(category) = draft.category.as_deref() else {
        return Err(ValidationError::MissingField("category"));
    };
    let Some(limit) = draft.limit else {
        return Err(ValidationError::MissingField("limit"));
    };

    if limit <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveLimit);
    }
    if limit > Decimal::from(MAX_AMOUNT) {
        return Err(ValidationError::LimitTooLarge);
    }
    if category.trim().is_empty() {
        return Err(ValidationError::EmptyCategory);
    }
    if let Some(month) = draft.month.as_deref() {
        validate_month(month)?;
    }
    Ok(())
}

pub(crate) fn require_user_id(user_id: &str) -> Result<(), ValidationError> {
    if user_id.trim().is_empty() {
        return Err(ValidationError::UserIdRequired);
    }
    Ok(())
}

/// Return the trimmed value or a missing-field error naming `field`.
pub(crate) fn required_text(value: Option<&str>, field: &'static str) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

pub(crate) fn validate_date(date: &str) -> Result<NaiveDate, ValidationError> {
    if date.len() != 10 {
        return Err(ValidationError::InvalidDate(date.to_string()));
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(date.to_string()))
}

pub(crate) fn validate_month(month: &str) -> Result<(), ValidationError> {
    if month.len() != 7 {
        return Err(ValidationError::InvalidMonth(month.to_string()));
    }
    NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidMonth(month.to_string()))
}

pub(crate) fn validate_page(limit: u32, offset: i64) -> Result<(), ValidationError> {
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ValidationError::InvalidPageLimit);
    }
    if offset < 0 {
        return Err(ValidationError::InvalidPageOffset);
    }
    Ok(())
}

/// Strip a CNPJ to its digits and verify length and both check digits.
pub(crate) fn validate_cnpj(raw: &str) -> Result<String, ValidationError> {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != 14 {
        return Err(ValidationError::InvalidCnpj("must have exactly 14 digits"));
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return Err(ValidationError::InvalidCnpj("cannot have all identical digits"));
    }
    if cnpj_check_digit(&digits[..12]) != digits[12]
        || cnpj_check_digit(&digits[..13]) != digits[13]
    {
        return Err(ValidationError::InvalidCnpj("checksum is invalid"));
    }

    Ok(digits.iter().map(|d| char::from(b'0' + *d as u8)).collect())
}

/// Weights run 5..2 then 9..2 for the first digit, 6..2 then 9..2 for the second.
fn cnpj_check_digit(digits: &[u32]) -> u32 {
    let mut weight = if digits.len() == 12 { 5 } else { 6 };
    let mut sum = 0;
    for d in digits {
        sum += d * weight;
        weight = if weight == 2 { 9 } else { weight - 1 };
    }
    let rem = sum % 11;
    if rem < 2 {
        0
    } else {
        11 - rem
    }
}

/// GTIN/EAN barcodes: 8 to 14 digits once separators are removed.
pub(crate) fn validate_barcode(raw: &str) -> Result<String, ValidationError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if !(8..=14).contains(&digits.len()) {
        return Err(ValidationError::InvalidBarcode);
    }
    Ok(digits)
}

fn is_missing(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}
