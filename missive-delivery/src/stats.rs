use missive_store::{NotificationRecord, NotificationStatus};
use serde::Serialize;

/// Counts of records by status, taken from one snapshot of the store
///
/// `total == sent + failed + pending` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub pending: usize,
    /// Percentage of records that were sent, rounded to two decimal places
    pub success_rate: f64,
}

impl Statistics {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a NotificationRecord>) -> Self {
        let mut stats = Self::default();

        for record in records {
            stats.total += 1;
            match record.status() {
                NotificationStatus::Pending => stats.pending += 1,
                NotificationStatus::Sent => stats.sent += 1,
                NotificationStatus::Failed => stats.failed += 1,
            }
        }

        stats.success_rate = success_rate(stats.sent, stats.total);
        stats
    }
}

#[allow(clippy::cast_precision_loss)]
fn success_rate(sent: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }

    let rate = sent as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}
