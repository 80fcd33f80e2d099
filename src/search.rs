use crate::api::UserRecord;

/// Records whose name or email contains `term`, ignoring case, in their
/// original order. An empty term keeps everything.
pub fn filter_users<'a>(users: &'a [UserRecord], term: &str) -> Vec<&'a UserRecord> {
    if term.is_empty() {
        return users.iter().collect();
    }
    let q = term.to_lowercase();
    users
        .iter()
        .filter(|u| u.name.to_lowercase().contains(&q) || u.email.to_lowercase().contains(&q))
        .collect()
}
