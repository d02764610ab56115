//! Annotation service implementing the command and query driving ports.
//!
//! Applies the completion rule, the inter-pass gate and the freeze on
//! completed records on top of a [`RecordRepository`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::{Map, Value, json};
use tracing::{error, info};

use crate::domain::case_order::permuted;
use crate::domain::ports::{
    AnnotationCommand, AnnotationQuery, CaseAccess, CaseView, CaseViewRequest, Dashboard,
    DashboardCase, DashboardRequest, RecordRepository, RecordRepositoryError, SubmitOutcome,
    SubmitRequest, UserProgress,
};
use crate::domain::{
    AnnotationPayload, CaseCatalogue, CaseId, CompletionRule, Error, PassGate, Progress,
    ProgressSummary, Record, RecordKey, RecordWrite, Username, Variant,
};

/// Reason string returned for writes to unconfigured cases.
pub const CASE_NOT_FOUND_REASON: &str = "case_id not found";

/// Rules applied by [`AnnotationService`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationPolicy {
    pub completion_rule: CompletionRule,
    /// Two-pass mode is enabled when a gate is configured.
    pub gate: Option<PassGate>,
}

impl AnnotationPolicy {
    #[must_use]
    pub fn two_pass(&self) -> bool {
        self.gate.is_some()
    }
}

/// Case annotation use-cases over a record repository.
#[derive(Clone)]
pub struct AnnotationService<R> {
    records: Arc<R>,
    catalogue: Arc<CaseCatalogue>,
    policy: AnnotationPolicy,
    clock: Arc<dyn Clock>,
}

impl<R> AnnotationService<R> {
    /// Create a service.
    ///
    /// ```rust,no_run
    /// # use std::sync::Arc;
    /// # use casedesk::domain::{AnnotationPolicy, AnnotationService, CaseCatalogue, CompletionRule};
    /// # use casedesk::outbound::memory::InMemoryRecordRepository;
    /// # use mockable::DefaultClock;
    /// # fn example(catalogue: Arc<CaseCatalogue>) {
    /// let clock = Arc::new(DefaultClock);
    /// let service = AnnotationService::new(
    ///     Arc::new(InMemoryRecordRepository::new(clock.clone())),
    ///     catalogue,
    ///     AnnotationPolicy { completion_rule: CompletionRule::PayloadSize, gate: None },
    ///     clock,
    /// );
    /// # let _ = service;
    /// # }
    /// ```
    pub fn new(
        records: Arc<R>,
        catalogue: Arc<CaseCatalogue>,
        policy: AnnotationPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            catalogue,
            policy,
            clock,
        }
    }
}

pub(crate) fn map_repository_error(err: RecordRepositoryError) -> Error {
    match err {
        RecordRepositoryError::Connection { message } => {
            error!(%message, "record store unreachable");
            Error::service_unavailable("record store unavailable")
        }
        RecordRepositoryError::Query { message } => {
            error!(%message, "record store query failed");
            Error::internal(format!("record store query failed: {message}"))
        }
    }
}

impl<R> AnnotationService<R>
where
    R: RecordRepository,
{
    fn resolve_case(&self, raw: &str, reason: impl FnOnce() -> String) -> Result<CaseId, Error> {
        self.catalogue
            .case(raw)
            .cloned()
            .ok_or_else(|| Error::not_found(reason()))
    }

    fn resolve_user(&self, raw: &str) -> Result<Username, Error> {
        self.catalogue
            .user(raw)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("User: {raw} not found.")))
    }

    fn ensure_variant_enabled(&self, variant: Variant) -> Result<(), Error> {
        if variant == Variant::WithAid && !self.policy.two_pass() {
            return Err(Error::invalid_request(
                "the with-aid pass is not enabled on this server",
            ));
        }
        Ok(())
    }

    async fn fetch(&self, key: &RecordKey) -> Result<Option<Record>, Error> {
        self.records.get(key).await.map_err(map_repository_error)
    }

    /// Deny access to a gated with-aid pass. A no-op for the pass without aid.
    async fn check_gate(&self, key: &RecordKey) -> Result<(), Error> {
        let Some(gate) = self.policy.gate else {
            return Ok(());
        };
        if key.variant != Variant::WithAid {
            return Ok(());
        }
        let first_pass = self.fetch(&key.with_variant(Variant::WithoutAid)).await?;
        gate.check(first_pass.as_ref(), self.clock.utc())
            .map_err(|denial| {
                Error::forbidden(denial.to_string())
                    .with_details(json!({ "code": denial.code() }))
            })
    }

    /// Shared validation of submit and fix.
    async fn prepare_write(
        &self,
        request: &SubmitRequest,
    ) -> Result<(RecordKey, AnnotationPayload), Error> {
        let case_id = self.resolve_case(&request.case_id, || CASE_NOT_FOUND_REASON.to_owned())?;
        self.ensure_variant_enabled(request.variant)?;
        let payload = AnnotationPayload::parse(&request.body)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let key = RecordKey::new(request.username.clone(), case_id, request.variant);

        if self.fetch(&key).await?.is_some_and(|record| record.completed) {
            return Err(Error::conflict("record already completed"));
        }
        self.check_gate(&key).await?;
        Ok((key, payload))
    }

    fn stored_values(record: &Record) -> Result<Map<String, Value>, Error> {
        AnnotationPayload::decode_stored(&record.payload).map_err(|err| {
            error!(key = %record.key, error = %err, "stored payload is unreadable");
            Error::internal(format!("stored payload for {} is unreadable", record.key))
        })
    }

    fn summarise(&self, done_without_aid: usize, done_with_aid: usize) -> ProgressSummary {
        let total = self.catalogue.total_cases();
        let without_aid = Progress {
            done: done_without_aid,
            total,
        };
        if self.policy.two_pass() {
            ProgressSummary::TwoPass {
                without_aid,
                with_aid: Progress {
                    done: done_with_aid,
                    total,
                },
            }
        } else {
            ProgressSummary::SinglePass(without_aid)
        }
    }
}

#[async_trait]
impl<R> AnnotationCommand for AnnotationService<R>
where
    R: RecordRepository,
{
    async fn submit(&self, request: SubmitRequest) -> Result<SubmitOutcome, Error> {
        let (key, payload) = self.prepare_write(&request).await?;
        let completed = self
            .policy
            .completion_rule
            .completes_on_submit(payload.item_count(), self.catalogue.item_count());

        let write = RecordWrite {
            key,
            payload: payload.to_stored_bytes(),
            elapsed_time: payload.elapsed_time(),
            completed,
        };
        self.records
            .upsert(&write)
            .await
            .map_err(map_repository_error)?;
        info!(key = %write.key, completed, items = payload.item_count(), "record submitted");
        Ok(SubmitOutcome { completed })
    }

    async fn fix(&self, request: SubmitRequest) -> Result<SubmitOutcome, Error> {
        let (key, payload) = self.prepare_write(&request).await?;
        let stored = payload.to_stored_bytes();
        let mut writes = vec![RecordWrite {
            key: key.clone(),
            payload: stored.clone(),
            elapsed_time: payload.elapsed_time(),
            completed: true,
        }];

        if self.policy.two_pass() && key.variant == Variant::WithoutAid {
            let second_key = key.with_variant(Variant::WithAid);
            // A finished second pass stays frozen.
            let second_pass_done = self
                .fetch(&second_key)
                .await?
                .is_some_and(|record| record.completed);
            if !second_pass_done {
                writes.push(RecordWrite {
                    key: second_key,
                    payload: stored,
                    elapsed_time: 0,
                    completed: false,
                });
            }
        }

        self.records
            .upsert_batch(&writes)
            .await
            .map_err(map_repository_error)?;
        info!(key = %key, seeded = writes.len() > 1, "record fixed");
        Ok(SubmitOutcome { completed: true })
    }

    async fn import_snapshot(&self, records: Vec<Record>) -> Result<usize, Error> {
        self.records
            .import_all(&records)
            .await
            .map_err(map_repository_error)?;
        info!(rows = records.len(), "snapshot imported");
        Ok(records.len())
    }
}

#[async_trait]
impl<R> AnnotationQuery for AnnotationService<R>
where
    R: RecordRepository,
{
    async fn case_view(&self, request: CaseViewRequest) -> Result<CaseView, Error> {
        let username = self.resolve_user(&request.username)?;
        let case_id = self.resolve_case(&request.case_id, || {
            format!("Case \"{}\" not found.", request.case_id)
        })?;
        self.ensure_variant_enabled(request.variant)?;
        let key = RecordKey::new(username, case_id, request.variant);
        let read_only = request.access == CaseAccess::ReadOnly;
        if !read_only {
            self.check_gate(&key).await?;
        }

        let record = self.fetch(&key).await?;
        let (values, elapsed_time, completed, last_update) = match &record {
            Some(record) => (
                Self::stored_values(record)?,
                record.elapsed_time,
                record.completed,
                Some(record.last_update),
            ),
            None => (Map::new(), 0, false, None),
        };
        let reference = if read_only || key.variant == Variant::WithAid {
            self.catalogue
                .reference_for(&key.case_id)
                .map(|answers| answers.clone().into_iter().collect())
        } else {
            None
        };

        Ok(CaseView {
            username: key.username,
            case_id: key.case_id,
            variant: key.variant,
            values,
            elapsed_time,
            completed,
            last_update,
            read_only,
            reference,
            items: self.catalogue.items().to_vec(),
            diagnosis_items: self.catalogue.diagnosis_items().to_vec(),
        })
    }

    async fn dashboard(&self, request: DashboardRequest) -> Result<Dashboard, Error> {
        let username = self.resolve_user(&request.username)?;
        let records = self
            .records
            .list_for_user(&username)
            .await
            .map_err(map_repository_error)?;

        let completion: HashMap<(&CaseId, Variant), bool> = records
            .iter()
            .map(|record| ((&record.key.case_id, record.key.variant), record.completed))
            .collect();
        let done = |variant: Variant| {
            records
                .iter()
                .filter(|record| record.key.variant == variant && record.completed)
                .count()
        };
        let progress = self.summarise(done(Variant::WithoutAid), done(Variant::WithAid));

        let order = match request.seed {
            Some(seed) => permuted(self.catalogue.case_ids(), seed),
            None => self.catalogue.case_ids().to_vec(),
        };
        let is_done = |case_id: &CaseId, variant: Variant| {
            completion
                .get(&(case_id, variant))
                .copied()
                .unwrap_or(false)
        };
        let cases = order
            .into_iter()
            .map(|case_id| DashboardCase {
                completed: is_done(&case_id, Variant::WithoutAid),
                completed_with_aid: self
                    .policy
                    .two_pass()
                    .then(|| is_done(&case_id, Variant::WithAid)),
                case_id,
            })
            .collect();

        Ok(Dashboard {
            username,
            cases,
            progress: progress.to_string(),
        })
    }

    async fn users_overview(&self) -> Result<Vec<UserProgress>, Error> {
        let mut overview = Vec::new();
        for username in self.catalogue.annotators() {
            let without_aid = self
                .records
                .count_completed(username, Variant::WithoutAid)
                .await
                .map_err(map_repository_error)?;
            let with_aid = if self.policy.two_pass() {
                self.records
                    .count_completed(username, Variant::WithAid)
                    .await
                    .map_err(map_repository_error)?
            } else {
                0
            };
            let summary = self.summarise(without_aid, with_aid);
            overview.push(UserProgress {
                username: username.clone(),
                progress: summary.to_string(),
                completed: summary.is_finished(),
            });
        }
        Ok(overview)
    }

    async fn export_snapshot(&self) -> Result<Vec<Record>, Error> {
        self.records.export_all().await.map_err(map_repository_error)
    }
}

#[cfg(test)]
#[path = "annotation_service_tests.rs"]
mod tests;
