use chrono::{DateTime, Duration, Utc};

use crate::db::Store;
use crate::error::{AppResult, ValidationError};
use crate::models::CompanyCacheEntry;

pub(crate) const CACHE_TTL_HOURS: i64 = 24;

/// Return the registry document for `cnpj`, refreshing it through `fetch`
/// when the cached copy is missing or older than [`CACHE_TTL_HOURS`].
///
/// Two concurrent misses may both fetch and both write; the later write wins.
pub(crate) fn lookup_company<F>(
    store: &mut impl Store,
    cnpj: &str,
    now: DateTime<Utc>,
    fetch: F,
) -> AppResult<serde_json::Value>
where
    F: FnOnce(&str) -> anyhow::Result<serde_json::Value>,
{
    let cnpj: String = cnpj.chars().filter(|c| c.is_ascii_digit()).collect();
    if cnpj.len() < 14 {
        return Err(ValidationError::InvalidCnpj("must have at least 14 digits").into());
    }

    if let Some(entry) = store.cached_company(&cnpj)? {
        if is_fresh(&entry.updated_at, now) {
            log::debug!("Company cache hit for {cnpj}");
            return Ok(entry.data);
        }
    }

    log::warn!("Company cache miss for {cnpj}, fetching from registry");
    let data = fetch(&cnpj)?;
    store.store_company(&CompanyCacheEntry {
        cnpj,
        data: data.clone(),
        updated_at: now.to_rfc3339(),
    })?;
    Ok(data)
}

fn is_fresh(updated_at: &str, now: DateTime<Utc>) -> bool {
    DateTime::parse_from_rfc3339(updated_at)
        .map(|t| now.signed_duration_since(t.with_timezone(&Utc)) < Duration::hours(CACHE_TTL_HOURS))
        .unwrap_or(false)
}
