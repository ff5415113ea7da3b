use crate::models::ModelSearchQuery;
use crate::services::query::TableQuery;

pub const DEFAULT_PAGE_SIZE: u16 = 24;
pub const MAX_PAGE_SIZE: u16 = 100;

/// Translate directory filters into a table query
///
/// Ordering is fixed (newest first, id as tie-breaker) so paging is stable
/// and identical filters always render the same string.
pub fn build_model_query(search: &ModelSearchQuery) -> TableQuery {
    let mut query = TableQuery::new();

    if let Some(city) = search.city.as_deref().filter(|c| !c.trim().is_empty()) {
        query = query.ilike_contains("city", city);
    }
    if let Some(gender) = search.gender.as_deref().filter(|g| !g.trim().is_empty()) {
        query = query.eq("gender", gender.trim().to_lowercase());
    }
    if let Some(min) = search.min_height_cm {
        query = query.gte("height_cm", min);
    }
    if let Some(max) = search.max_height_cm {
        query = query.lte("height_cm", max);
    }
    if let Some(agency) = search.agency_id {
        query = query.eq("agency_id", agency);
    }
    if search.available_only.unwrap_or(false) {
        query = query.eq("is_available", true);
    }

    let limit = search.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    query
        .order("created_at", false)
        .order("id", true)
        .limit(limit as usize)
        .offset(search.offset.unwrap_or(0) as usize)
}
