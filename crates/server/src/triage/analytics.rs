use shared_types::{AppError, Report, StatusCounts};

use crate::repo::ReportStore;

/// Count reports by status.
pub fn tally<'a>(reports: impl IntoIterator<Item = &'a Report>) -> StatusCounts {
    reports
        .into_iter()
        .fold(StatusCounts::default(), |mut counts, report| {
            counts.record(report.status);
            counts
        })
}

/// Current status partition of the whole store. Read-only and uncached.
#[tracing::instrument(skip_all)]
pub async fn status_counts(store: &dyn ReportStore) -> Result<StatusCounts, AppError> {
    let counts = store.status_counts().await?;
    debug_assert_eq!(
        counts.total,
        counts.pending + counts.in_progress + counts.resolved
    );
    Ok(counts)
}
