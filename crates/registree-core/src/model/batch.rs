use crate::errors::RegisTreeError;

/// Outcome of a non-atomic batch
///
/// Earlier successes stay committed when a later item fails.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport<K> {
    pub succeeded: Vec<K>,
    pub failed: Vec<(K, RegisTreeError)>,
}

impl<K> BatchReport<K> {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record_success(&mut self, key: K) {
        self.succeeded.push(key);
    }

    pub fn record_failure(&mut self, key: K, err: RegisTreeError) {
        self.failed.push((key, err));
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<K> Default for BatchReport<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut report = BatchReport::new();
        report.record_success("r1");
        report.record_failure("r2", RegisTreeError::persistence("disk full"));
        report.record_success("r3");

        assert_eq!(report.succeeded_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.total(), 3);
        assert!(!report.is_complete_success());
    }
}
