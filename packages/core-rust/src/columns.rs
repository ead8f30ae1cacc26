//! Display column ordering for free-form items.

use std::collections::BTreeSet;

/// Orders the union of `keys` for display.
///
/// Groups, each sorted alphabetically: the identifier field, names containing
/// `id`, names containing `name`, everything else. Matching is
/// case-insensitive and a key lands in the first group it qualifies for.
#[must_use]
pub fn order_columns<I, S>(keys: I, id_field: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();

    let mut id = Vec::new();
    let mut id_like = Vec::new();
    let mut name_like = Vec::new();
    let mut rest = Vec::new();

    // BTreeSet iteration is already sorted, so each group stays alphabetical.
    for key in unique {
        let lower = key.to_lowercase();
        if key == id_field {
            id.push(key);
        } else if lower.contains("id") {
            id_like.push(key);
        } else if lower.contains("name") {
            name_like.push(key);
        } else {
            rest.push(key);
        }
    }

    id.into_iter()
        .chain(id_like)
        .chain(name_like)
        .chain(rest)
        .collect()
}
