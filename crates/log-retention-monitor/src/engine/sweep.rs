//! Full-inventory sweep with stale evaluation cleanup

use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{evaluate_retention, RetentionThreshold};
use crate::client::{ClientResult, ComplianceRegistry, InventorySource};
use crate::contracts::{EvaluationRecord, OrderingTimestamp};
use crate::error::Result;

/// Evaluates every current log group and retires evaluations of log groups
/// that no longer exist
pub struct InventoryReconciler<'a> {
    inventory: &'a dyn InventorySource,
    registry: &'a dyn ComplianceRegistry,
    resource_type: &'a str,
}

impl<'a> InventoryReconciler<'a> {
    pub fn new(
        inventory: &'a dyn InventorySource,
        registry: &'a dyn ComplianceRegistry,
        resource_type: &'a str,
    ) -> Self {
        Self {
            inventory,
            registry,
            resource_type,
        }
    }

    /// Run a sweep.
    ///
    /// Every record carries `ordering_timestamp`, the notification time of
    /// the scheduled invocation. A failed inventory listing fails the sweep.
    /// A failed lookup of prior evaluations only skips the cleanup: the
    /// current evaluations are still returned.
    pub async fn sweep(
        &self,
        threshold: RetentionThreshold,
        rule_name: Option<&str>,
        ordering_timestamp: &OrderingTimestamp,
    ) -> Result<Vec<EvaluationRecord>> {
        let mut evaluations = self.evaluate_inventory(threshold, ordering_timestamp).await?;
        info!(
            count = evaluations.len(),
            threshold_days = threshold.days(),
            "Evaluated log groups"
        );

        let Some(rule_name) = rule_name else {
            warn!("Invocation carries no configRuleName, skipping stale evaluation cleanup");
            return Ok(evaluations);
        };

        let evaluated: HashSet<String> = evaluations
            .iter()
            .map(|record| record.resource_id().to_string())
            .collect();

        match self
            .stale_evaluations(rule_name, evaluated, ordering_timestamp)
            .await
        {
            Ok(stale) => {
                if !stale.is_empty() {
                    info!(count = stale.len(), "Marking deleted log groups as NOT_APPLICABLE");
                }
                evaluations.extend(stale);
            }
            Err(e) => {
                warn!(error = %e, "Could not list previous evaluations, skipping stale evaluation cleanup");
            }
        }

        Ok(evaluations)
    }

    /// Drain the inventory and evaluate each log group
    async fn evaluate_inventory(
        &self,
        threshold: RetentionThreshold,
        ordering_timestamp: &OrderingTimestamp,
    ) -> Result<Vec<EvaluationRecord>> {
        let mut evaluations = Vec::new();
        let mut next_token = None;

        loop {
            let page = self.inventory.list_log_groups(next_token).await?;
            debug!(log_groups = page.log_groups.len(), "Fetched log group page");

            evaluations.extend(page.log_groups.into_iter().map(|group| {
                evaluate_retention(
                    self.resource_type,
                    &group.name,
                    group.retention_in_days,
                    threshold,
                    ordering_timestamp.clone(),
                )
            }));

            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(evaluations)
    }

    /// NOT_APPLICABLE records for previously evaluated log groups missing
    /// from `evaluated`
    async fn stale_evaluations(
        &self,
        rule_name: &str,
        mut evaluated: HashSet<String>,
        ordering_timestamp: &OrderingTimestamp,
    ) -> ClientResult<Vec<EvaluationRecord>> {
        let mut stale = Vec::new();
        let mut next_token = None;

        loop {
            let page = self
                .registry
                .list_prior_evaluations(rule_name, next_token)
                .await?;

            for prior in page.evaluations {
                // Account-level results are not log groups
                if prior.resource_type != self.resource_type {
                    continue;
                }
                // insert() is false for log groups already evaluated or already retired
                if evaluated.insert(prior.resource_id.clone()) {
                    stale.push(EvaluationRecord::not_applicable(
                        self.resource_type,
                        &prior.resource_id,
                        format!("Log group '{}' no longer exists.", prior.resource_id),
                        ordering_timestamp.clone(),
                    ));
                }
            }

            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        Ok(stale)
    }
}
