//! Batched submission of evaluation records

use tracing::{debug, info, warn};

use crate::client::ComplianceRegistry;
use crate::config::MAX_BATCH_SIZE;
use crate::contracts::{EvaluationRecord, SubmittedEvaluation};
use crate::error::Result;

/// Longest annotation the registry stores
pub const MAX_ANNOTATION_LEN: usize = 256;

/// Convert a record into its wire form: ISO-8601 timestamp, annotation cut
/// to the registry limit
pub fn normalize(record: &EvaluationRecord) -> SubmittedEvaluation {
    SubmittedEvaluation {
        compliance_resource_type: record.resource_type().to_string(),
        compliance_resource_id: record.resource_id().to_string(),
        compliance_type: record.compliance_type(),
        annotation: truncate_annotation(record.annotation()),
        ordering_timestamp: record.ordering_timestamp().to_iso8601(),
    }
}

fn truncate_annotation(annotation: &str) -> String {
    match annotation.char_indices().nth(MAX_ANNOTATION_LEN) {
        Some((cut, _)) => annotation[..cut].to_string(),
        None => annotation.to_string(),
    }
}

/// Submits records to the registry in order, in chunks
pub struct EvaluationSubmitter<'a> {
    registry: &'a dyn ComplianceRegistry,
    batch_size: usize,
}

impl<'a> EvaluationSubmitter<'a> {
    pub fn new(registry: &'a dyn ComplianceRegistry) -> Self {
        Self {
            registry,
            batch_size: MAX_BATCH_SIZE,
        }
    }

    /// Chunk size, clamped to 1..=100
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Submit every record under `result_token`.
    ///
    /// Nothing is sent for an empty slice. The first failing chunk aborts
    /// the submission; chunks already sent stay recorded.
    pub async fn submit(&self, records: &[EvaluationRecord], result_token: &str) -> Result<()> {
        if records.is_empty() {
            debug!("No evaluations to submit");
            return Ok(());
        }

        let batches = records.len().div_ceil(self.batch_size);
        for (index, chunk) in records.chunks(self.batch_size).enumerate() {
            let evaluations: Vec<SubmittedEvaluation> = chunk.iter().map(normalize).collect();
            debug!(batch = index + 1, of = batches, size = evaluations.len(), "Submitting evaluations");

            let outcome = self.registry.put_evaluations(evaluations, result_token).await?;
            if !outcome.failed_resource_ids.is_empty() {
                warn!(
                    batch = index + 1,
                    failed = ?outcome.failed_resource_ids,
                    "Registry rejected evaluations"
                );
            }
        }

        info!(count = records.len(), batches, "Submitted evaluations");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, MockComplianceRegistry, SubmissionOutcome};
    use crate::contracts::{ComplianceType, OrderingTimestamp, MONITORED_RESOURCE_TYPE};
    use crate::error::MonitorError;
    use chrono::{TimeZone, Utc};
    use mockall::Sequence;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    fn records(count: usize) -> Vec<EvaluationRecord> {
        (0..count)
            .map(|i| {
                EvaluationRecord::new(
                    MONITORED_RESOURCE_TYPE,
                    format!("/test/log{}", i),
                    ComplianceType::Compliant,
                    "Test",
                    OrderingTimestamp::from("2024-01-01T00:00:00Z"),
                )
            })
            .collect()
    }

    /// Registry mock that records the size and token of every batch
    fn recording_registry() -> (MockComplianceRegistry, Arc<Mutex<Vec<(Vec<String>, String)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();
        let mut registry = MockComplianceRegistry::new();
        registry
            .expect_put_evaluations()
            .returning(move |evaluations, token| {
                let ids = evaluations
                    .into_iter()
                    .map(|e| e.compliance_resource_id)
                    .collect();
                seen.lock().unwrap().push((ids, token.to_string()));
                Ok(SubmissionOutcome::default())
            });
        (registry, calls)
    }

    #[test]
    fn test_normalize_structured_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let record = EvaluationRecord::new(
            MONITORED_RESOURCE_TYPE,
            "/test/log",
            ComplianceType::NonCompliant,
            "Test",
            OrderingTimestamp::from(at),
        );

        let submitted = normalize(&record);
        assert_eq!(submitted.ordering_timestamp, "2024-01-01T12:00:00Z");
        assert_eq!(submitted.compliance_type, ComplianceType::NonCompliant);
        assert_eq!(submitted.compliance_resource_type, MONITORED_RESOURCE_TYPE);
    }

    #[test]
    fn test_normalize_keeps_text_timestamp() {
        let submitted = normalize(&records(1)[0]);
        assert_eq!(submitted.ordering_timestamp, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_annotation_truncated_on_char_boundary() {
        let long = "é".repeat(300);
        let truncated = truncate_annotation(&long);
        assert_eq!(truncated.chars().count(), MAX_ANNOTATION_LEN);

        let short = "Log group '/test/log' has 7 days retention.";
        assert_eq!(truncate_annotation(short), short);
    }

    #[tokio::test]
    async fn test_submit_250_records_in_three_batches() {
        let (registry, calls) = recording_registry();
        let input = records(250);

        EvaluationSubmitter::new(&registry)
            .submit(&input, "test-token")
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        let sizes: Vec<_> = calls.iter().map(|(ids, _)| ids.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert!(calls.iter().all(|(_, token)| token == "test-token"));

        let submitted: Vec<_> = calls.iter().flat_map(|(ids, _)| ids.iter().cloned()).collect();
        let expected: Vec<_> = input.iter().map(|r| r.resource_id().to_string()).collect();
        assert_eq!(submitted, expected);
    }

    #[tokio::test]
    async fn test_submit_nothing_makes_no_call() {
        let mut registry = MockComplianceRegistry::new();
        registry.expect_put_evaluations().never();

        EvaluationSubmitter::new(&registry)
            .submit(&[], "test-token")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_submit_stops_at_first_failure() {
        let mut registry = MockComplianceRegistry::new();
        let mut seq = Sequence::new();
        registry
            .expect_put_evaluations()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(SubmissionOutcome::default()));
        registry
            .expect_put_evaluations()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(ClientError::service("PutEvaluations", "throttled")));

        let err = EvaluationSubmitter::new(&registry)
            .submit(&records(250), "test-token")
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::Client(_)));
    }

    #[tokio::test]
    async fn test_rejected_evaluations_do_not_fail_submission() {
        let mut registry = MockComplianceRegistry::new();
        registry.expect_put_evaluations().times(1).returning(|_, _| {
            Ok(SubmissionOutcome {
                failed_resource_ids: vec!["/test/log0".to_string()],
            })
        });

        let result = EvaluationSubmitter::new(&registry)
            .submit(&records(3), "test-token")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_custom_batch_size_is_clamped() {
        let (registry, calls) = recording_registry();
        EvaluationSubmitter::new(&registry)
            .with_batch_size(500)
            .submit(&records(150), "test-token")
            .await
            .unwrap();
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    proptest! {
        #[test]
        fn prop_batches_bounded_and_complete(count in 0usize..400) {
            let (registry, calls) = recording_registry();
            let input = records(count);
            tokio_test::block_on(EvaluationSubmitter::new(&registry).submit(&input, "token")).unwrap();

            let calls = calls.lock().unwrap();
            prop_assert_eq!(calls.len(), count.div_ceil(MAX_BATCH_SIZE));
            prop_assert!(calls.iter().all(|(ids, _)| !ids.is_empty() && ids.len() <= MAX_BATCH_SIZE));
            prop_assert_eq!(calls.iter().map(|(ids, _)| ids.len()).sum::<usize>(), count);
        }
    }
}
