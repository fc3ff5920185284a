use std::collections::{BTreeMap, HashMap};

use crate::db::Store;
use crate::error::AppResult;
use crate::models::{Deal, DealFilter, Market, MarketDraft, Product, ProductDraft};
use crate::validate;

pub(crate) fn create_market(store: &mut impl Store, draft: MarketDraft) -> AppResult<Market> {
    let market = Market::from_draft(draft)?;
    let stored = store.insert_market(&market)?;
    log::info!("Registered market '{}' for {}", stored.name, stored.user_id);
    Ok(stored)
}

pub(crate) fn list_markets(store: &impl Store, user_id: &str) -> AppResult<Vec<Market>> {
    validate::require_user_id(user_id)?;
    Ok(store.fetch_markets(user_id)?)
}

pub(crate) fn create_product(store: &mut impl Store, draft: ProductDraft) -> AppResult<Product> {
    let product = Product::from_draft(draft)?;
    let stored = store.insert_product(&product)?;
    log::info!("Registered product '{}' for {}", stored.name, stored.user_id);
    Ok(stored)
}

pub(crate) fn list_products(store: &impl Store, user_id: &str) -> AppResult<Vec<Product>> {
    validate::require_user_id(user_id)?;
    Ok(store.fetch_products(user_id)?)
}

/// Cheapest offer per product name (case-insensitive) across the user's
/// markets, ordered by name. Unpriced products are ignored; on equal prices
/// the offer listed first by the store is kept.
pub(crate) fn best_deals(store: &impl Store, user_id: &str, filter: &DealFilter) -> AppResult<Vec<Deal>> {
    validate::require_user_id(user_id)?;

    let market_names: HashMap<i64, String> = store
        .fetch_markets(user_id)?
        .into_iter()
        .filter_map(|m| m.id.map(|id| (id, m.name)))
        .collect();

    let category_filter = filter.category.as_deref().map(str::to_lowercase);
    let mut deals: BTreeMap<String, Deal> = BTreeMap::new();

    for product in store.fetch_products(user_id)? {
        let Some(price) = product.price else {
            continue;
        };
        if category_filter
            .as_deref()
            .is_some_and(|c| product.category.to_lowercase() != c)
        {
            continue;
        }
        if filter.market_id.is_some() && product.market_id != filter.market_id {
            continue;
        }

        let key = product.name.to_lowercase();
        match deals.get_mut(&key) {
            Some(deal) => {
                deal.offers += 1;
                if price < deal.price {
                    deal.price = price;
                    deal.market_id = product.market_id;
                    deal.market_name = product
                        .market_id
                        .and_then(|id| market_names.get(&id).cloned());
                }
            }
            None => {
                deals.insert(
                    key,
                    Deal {
                        market_name: product
                            .market_id
                            .and_then(|id| market_names.get(&id).cloned()),
                        name: product.name,
                        category: product.category,
                        price,
                        market_id: product.market_id,
                        offers: 1,
                    },
                );
            }
        }
    }

    Ok(deals
        .into_values()
        .filter(|d| filter.max_price.map_or(true, |max| d.price <= max))
        .collect())
}
