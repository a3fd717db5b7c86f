//! Verdict report: one JSON object per executed test, appended to a
//! JSON-lines file when one is configured.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use flight_test_types::Verdict;
use serde::Serialize;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct ReportLine<'a> {
    run_id: Uuid,
    recorded_at: DateTime<Utc>,
    #[serde(flatten)]
    verdict: &'a Verdict,
}

/// Drains the verdict channel until every sender is gone.
/// Returns the number of verdicts received.
pub async fn run_report_writer(
    run_id: Uuid,
    path: Option<PathBuf>,
    mut rx: mpsc::Receiver<Verdict>,
) -> usize {
    let mut file = match &path {
        Some(p) => match OpenOptions::new().create(true).append(true).open(p).await {
            Ok(f) => {
                info!("📝 Writing verdict report to {}", p.display());
                Some(f)
            }
            Err(e) => {
                warn!("Report: could not open {}: {e}", p.display());
                None
            }
        },
        None => None,
    };

    let mut received = 0;
    while let Some(verdict) = rx.recv().await {
        received += 1;
        let Some(f) = file.as_mut() else { continue };

        let line = ReportLine { run_id, recorded_at: Utc::now(), verdict: &verdict };
        let line = match serde_json::to_string(&line) {
            Ok(l) => format!("{l}\n"),
            Err(e) => {
                warn!("Report: failed to serialize verdict: {e}");
                continue;
            }
        };
        if let Err(e) = f.write_all(line.as_bytes()).await {
            warn!("Report: write failed: {e}");
        }
    }

    if let Some(f) = file.as_mut() {
        if let Err(e) = f.flush().await {
            warn!("Report: flush failed: {e}");
        }
    }
    received
}

#[cfg(test)]
mod tests {
    use super::*;
    use flight_test_types::{TestDimension, TypeMask, VerdictValue};

    #[tokio::test]
    async fn writes_one_json_line_per_verdict() {
        let path = std::env::temp_dir().join(format!("verdicts-{}.jsonl", Uuid::new_v4()));
        let run_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(4);
        let writer = tokio::spawn(run_report_writer(run_id, Some(path.clone()), rx));

        tx.send(Verdict::new(
            3,
            TestDimension::Type,
            false,
            VerdictValue::Mask(TypeMask(2552)),
            VerdictValue::Mask(TypeMask(1528)),
        ))
        .await
        .unwrap();
        drop(tx);
        assert_eq!(writer.await.unwrap(), 1);

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let json: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(json["run_id"], run_id.to_string());
        assert_eq!(json["waypoint"], 3);
        assert_eq!(json["test_type"], "target_type");
        assert_eq!(json["passed"], false);
        assert_eq!(json["observed"], 1528);
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn counts_verdicts_without_a_file() {
        let (tx, rx) = mpsc::channel(4);
        let writer = tokio::spawn(run_report_writer(Uuid::new_v4(), None, rx));
        tx.send(Verdict::new(
            4,
            TestDimension::Timeout,
            true,
            VerdictValue::Seconds(5.0),
            VerdictValue::Seconds(5.0),
        ))
        .await
        .unwrap();
        drop(tx);
        assert_eq!(writer.await.unwrap(), 1);
    }
}
