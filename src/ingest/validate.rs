//! Record validation.

use super::resolve::ResolvedRecord;

/// A record is kept iff it has a name and an email containing `@`.
pub fn is_valid(record: &ResolvedRecord) -> bool {
    let has_name = !record.full_name.trim().is_empty();
    let email = record.email.trim();
    has_name && !email.is_empty() && email.contains('@')
}

/// Split records into the valid ones and a count of the dropped ones.
pub fn filter_valid(records: Vec<ResolvedRecord>) -> (Vec<ResolvedRecord>, usize) {
    let total = records.len();
    let valid: Vec<_> = records.into_iter().filter(is_valid).collect();
    let dropped = total - valid.len();
    (valid, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, email: &str) -> ResolvedRecord {
        ResolvedRecord {
            full_name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_record() {
        assert!(is_valid(&record("Ana", "ana@x.com")));
        // no deeper syntax check at this stage
        assert!(is_valid(&record("Ana", "@")));
    }

    #[test]
    fn test_rejects_blank_name() {
        assert!(!is_valid(&record("   ", "ana@x.com")));
    }

    #[test]
    fn test_rejects_email_without_at() {
        assert!(!is_valid(&record("Ana", "ana.x.com")));
        assert!(!is_valid(&record("Ana", "  ")));
    }

    #[test]
    fn test_other_fields_never_matter() {
        let mut r = record("Ana", "ana@x.com");
        r.document_id.clear();
        r.phone.clear();
        r.role.clear();
        assert!(is_valid(&r));
    }

    #[test]
    fn test_filter_valid_counts_dropped() {
        let (valid, dropped) = filter_valid(vec![
            record("Ana", "ana@x.com"),
            record("", "b@x.com"),
            record("Carlos", "carlos"),
        ]);
        assert_eq!(valid.len(), 1);
        assert_eq!(dropped, 2);
    }
}
