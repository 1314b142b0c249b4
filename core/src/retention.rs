/// Keep-last-N retention over a listing that is already ordered oldest-first.
///
/// Archive names embed a sortable timestamp, so the store's lexical listing
/// order is also chronological. Entries that compare equal keep the store's
/// order; no extra tie-break is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_backups: i64,
}

impl RetentionPolicy {
    /// `max_backups <= 0` disables pruning.
    pub fn new(max_backups: i64) -> Self {
        Self { max_backups }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_backups > 0
    }

    /// The oldest entries that exceed the retention count.
    pub fn select_for_deletion<'a, T>(&self, objects: &'a [T]) -> &'a [T] {
        select_for_deletion(objects, self.max_backups)
    }
}

pub fn select_for_deletion<T>(objects: &[T], keep: i64) -> &[T] {
    let keep = match usize::try_from(keep) {
        Ok(keep) if keep > 0 => keep,
        _ => return &[],
    };

    match objects.len().checked_sub(keep) {
        Some(excess) if excess > 0 => objects.split_at(excess).0,
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n)
            .map(|day| format!("backup-2020-01-{:02}.00-00-00.zip", day))
            .collect()
    }

    #[test]
    fn test_disabled_when_keep_not_positive() {
        let objects = names(4);
        for keep in [0, -1, -100, i64::MIN] {
            assert!(select_for_deletion(&objects, keep).is_empty(), "keep = {}", keep);
        }
        assert!(!RetentionPolicy::new(0).is_enabled());
    }

    #[test]
    fn test_nothing_when_within_limit() {
        for n in 0..=5 {
            let objects = names(n);
            assert!(select_for_deletion(&objects, 5).is_empty(), "n = {}", n);
        }
        assert!(select_for_deletion(&names(3), i64::MAX).is_empty());
    }

    #[test]
    fn test_selects_oldest_excess() {
        for keep in 1..6i64 {
            for n in (keep as usize + 1)..10 {
                let objects = names(n);
                let selected = select_for_deletion(&objects, keep);

                assert_eq!(selected.len(), n - keep as usize);
                assert_eq!(selected, &objects[..n - keep as usize]);
                for kept in &objects[n - keep as usize..] {
                    assert!(!selected.contains(kept));
                }
            }
        }
    }

    #[test]
    fn test_policy_keeps_most_recent_two() {
        let objects = names(3);
        let selected = RetentionPolicy::new(2).select_for_deletion(&objects);

        assert_eq!(selected, &["backup-2020-01-01.00-00-00.zip".to_string()]);
    }

    #[test]
    fn test_ties_keep_listing_order() {
        let objects = vec!["b-same", "a-same", "c-later"];
        let selected = select_for_deletion(&objects, 1);

        assert_eq!(selected, &["b-same", "a-same"]);
    }
}
