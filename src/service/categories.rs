use crate::db::Store;
use crate::error::AppResult;
use crate::models::Category;
use crate::validate;

/// List the user's categories, seeding the defaults the first time.
pub(crate) fn purchase_categories(store: &mut impl Store, user_id: &str) -> AppResult<Vec<Category>> {
    validate::require_user_id(user_id)?;

    let categories = store.fetch_purchase_categories(user_id)?;
    if !categories.is_empty() {
        return Ok(categories);
    }

    let seeded = store.seed_default_categories(user_id)?;
    log::info!("Seeded {} default categories for {user_id}", seeded.len());
    Ok(seeded)
}
