use std::collections::HashSet;

use hubsync_domain::ContactRecord;

/// Local records first, then remote records with unseen ids, capped at
/// `limit`.
///
/// Returns the merged list and the remote records that were not already in
/// `local`.
pub fn merge_contacts(
    local: Vec<ContactRecord>,
    remote: Vec<ContactRecord>,
    limit: usize,
) -> (Vec<ContactRecord>, Vec<ContactRecord>) {
    let mut seen: HashSet<String> = local.iter().map(|c| c.id.clone()).collect();
    let mut merged = local;
    merged.truncate(limit);

    let mut newly_observed = Vec::new();
    for record in remote {
        if !seen.insert(record.id.clone()) {
            continue;
        }
        if merged.len() < limit {
            merged.push(record.clone());
        }
        newly_observed.push(record);
    }

    (merged, newly_observed)
}
