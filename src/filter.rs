use crate::access::AccessGrant;
use crate::schema::{FilterState, FinancialRecord};
use log::debug;
use std::collections::BTreeSet;

/// Narrows records to what the viewer may see and has selected.
///
/// Access containment runs first and unconditionally: a record whose entity is
/// not in `accessible` never survives, whatever the selections say. Empty
/// selection sets mean "no additional narrowing". Output keeps input order.
pub fn filter_records(
    records: &[FinancialRecord],
    accessible: &BTreeSet<String>,
    selected_entities: &BTreeSet<String>,
    selected_persons: &BTreeSet<String>,
) -> Vec<FinancialRecord> {
    let filtered: Vec<FinancialRecord> = records
        .iter()
        .filter(|r| accessible.contains(&r.entity_id))
        .filter(|r| selected_entities.is_empty() || selected_entities.contains(&r.entity_id))
        .filter(|r| selected_persons.is_empty() || r.touched_by_any(selected_persons))
        .cloned()
        .collect();

    debug!(
        "Filtered {} records down to {} ({} accessible, {} entities and {} persons selected)",
        records.len(),
        filtered.len(),
        accessible.len(),
        selected_entities.len(),
        selected_persons.len()
    );

    filtered
}

/// [`filter_records`] against a grant, then the optional date range on
/// `last_modified`.
pub fn apply_filter_state(
    records: &[FinancialRecord],
    grant: &AccessGrant,
    state: &FilterState,
) -> Vec<FinancialRecord> {
    let mut filtered = filter_records(
        records,
        &grant.entity_ids,
        &state.selected_entities,
        &state.selected_persons,
    );

    if let Some(range) = &state.date_range {
        filtered.retain(|r| range.contains(r.last_modified.date_naive()));
    }

    filtered
}
