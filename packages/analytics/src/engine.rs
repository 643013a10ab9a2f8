//! Parallel timeline scans.
//!
//! Each input file is scanned on the blocking pool into a private
//! [`Aggregates`] partial. Partials are folded on the calling task in file
//! order, so the result does not depend on which worker finishes first.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use price_map_source::progress::ProgressCallback;
use price_map_source::scan::{ScanSummary, discover_files, scan_file};
use price_map_source::timeline_def::TimelineDefinition;
use price_map_source_models::RejectReason;

use crate::AnalyticsError;
use crate::aggregate::Aggregates;

/// Per-reason rejected-row counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectCounts {
    counts: BTreeMap<RejectReason, u64>,
}

impl RejectCounts {
    /// Counts one rejected row.
    pub fn record(&mut self, reason: RejectReason) {
        *self.counts.entry(reason).or_insert(0) += 1;
    }

    /// Adds another counter set into this one.
    pub fn merge(&mut self, other: &Self) {
        for (reason, count) in &other.counts {
            *self.counts.entry(*reason).or_insert(0) += count;
        }
    }

    /// Rows rejected for `reason`.
    #[must_use]
    pub fn get(&self, reason: RejectReason) -> u64 {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    /// Total rejected rows.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Result of scanning every input file of one timeline.
#[derive(Debug, Default)]
pub struct TimelineScan {
    /// Aggregated buckets.
    pub aggregates: Aggregates,
    /// Rejected rows by reason.
    pub rejects: RejectCounts,
    /// Summed row counts across files.
    pub summary: ScanSummary,
    /// Number of files scanned.
    pub files: usize,
}

impl TimelineScan {
    fn absorb(&mut self, partial: FileScan) {
        self.aggregates.merge(partial.aggregates);
        self.rejects.merge(&partial.rejects);
        self.summary.accepted += partial.summary.accepted;
        self.summary.rejected += partial.summary.rejected;
        self.summary.malformed += partial.summary.malformed;
        self.files += 1;
    }

    /// Logs row totals and per-reason rejection counts.
    pub fn log_summary(&self, def: &TimelineDefinition) {
        log::info!(
            "{}: {} files, {} rows accepted, {} months",
            def.name,
            self.files,
            self.summary.accepted,
            self.aggregates.month_count()
        );
        if self.summary.malformed > 0 {
            log::info!("  {} malformed records", self.summary.malformed);
        }
        for reason in RejectReason::ALL {
            let count = self.rejects.get(reason);
            if count > 0 {
                log::info!("  rejected {reason}: {count}");
            }
        }
    }
}

struct FileScan {
    aggregates: Aggregates,
    rejects: RejectCounts,
    summary: ScanSummary,
}

/// Scans every input file of `def` under `root`.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if a required input directory is missing, a
/// file cannot be opened, or a worker task fails.
pub async fn scan_timeline(
    root: &Path,
    def: &TimelineDefinition,
    progress: Arc<dyn ProgressCallback>,
) -> Result<TimelineScan, AnalyticsError> {
    let files = discover_files(root, def)?;
    log::info!("Scanning {} {} files", files.len(), def.name);

    progress.set_total(files.len() as u64);
    progress.set_message(format!("Scanning {}", def.name));

    let handles: Vec<_> = files
        .into_iter()
        .map(|file| {
            let schema = def.schema.clone();
            let progress = Arc::clone(&progress);
            tokio::task::spawn_blocking(move || {
                log::info!("  Reading {}", file.path.display());
                let mut aggregates = Aggregates::default();
                let mut rejects = RejectCounts::default();
                let summary = scan_file(
                    &file.path,
                    &schema,
                    |obs| aggregates.add(obs),
                    |reason| rejects.record(reason),
                )?;
                progress.inc(1);
                Ok::<_, AnalyticsError>(FileScan {
                    aggregates,
                    rejects,
                    summary,
                })
            })
        })
        .collect();

    let mut scan = TimelineScan::default();
    for handle in handles {
        scan.absorb(handle.await??);
    }

    progress.finish(format!(
        "{}: {} months",
        def.name,
        scan.aggregates.month_count()
    ));
    scan.log_summary(def);

    Ok(scan)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use price_map_geography_models::GeoLevel;
    use price_map_source::progress::null_progress;
    use price_map_source::registry::find_timeline;

    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("price_map_analytics_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn folds_files_into_shared_buckets() {
        let root = temp_root("fold");
        let ppd = root.join("PPD");
        fs::create_dir_all(&ppd).unwrap();
        fs::write(
            ppd.join("2023.csv"),
            "a,100,2023-12-01 00:00,E1 6AN\nb,bad,2023-12-01 00:00,E1 6AN\n",
        )
        .unwrap();
        fs::write(
            ppd.join("2024.csv"),
            "c,300,2023-12-20 00:00,E1 6AN\nd,500,2024-01-02 00:00,E1 7AA\ne,1\n",
        )
        .unwrap();

        let def = find_timeline("historical").unwrap();
        let scan = scan_timeline(&root, &def, null_progress()).await.unwrap();

        assert_eq!(scan.files, 2);
        assert_eq!(scan.summary.accepted, 3);
        assert_eq!(scan.rejects.get(RejectReason::BadPrice), 1);
        assert_eq!(scan.rejects.get(RejectReason::TooFewFields), 1);
        assert_eq!(scan.rejects.total(), 2);
        assert_eq!(
            scan.aggregates.prices(GeoLevel::District, "2023-12", "E1"),
            &[100, 300]
        );
        let months: Vec<&str> = scan.aggregates.months().collect();
        assert_eq!(months, vec!["2023-12", "2024-01"]);
    }

    #[tokio::test]
    async fn predicted_months_use_target_year() {
        let root = temp_root("predicted");
        let dir = root.join("predictions");
        fs::create_dir_all(&dir).unwrap();
        let mut row = vec![""; 18];
        row[2] = "2025-10-16 00:00";
        row[3] = "SE1 7PB";
        row[16] = "2028";
        row[17] = "450000.4";
        fs::write(
            dir.join("bulk_property_predictions_2028.csv"),
            format!("{}\n", row.join(",")),
        )
        .unwrap();

        let def = find_timeline("predicted").unwrap();
        let scan = scan_timeline(&root, &def, null_progress()).await.unwrap();

        assert_eq!(
            scan.aggregates.prices(GeoLevel::Sector, "2028-10", "SE1 7"),
            &[450_000]
        );
    }

    #[tokio::test]
    async fn missing_required_input_fails() {
        let root = temp_root("missing");
        let def = find_timeline("historical").unwrap();
        assert!(matches!(
            scan_timeline(&root, &def, null_progress()).await,
            Err(AnalyticsError::Source(_))
        ));
    }
}
