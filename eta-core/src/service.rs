//! Repository-backed entry points for the document lifecycle.
//!
//! Each operation claims the document, loads its current row, hands it to
//! the [`LifecycleManager`] and persists whatever comes back before the
//! claim is released. Submissions are journaled as [`SubmissionLog`]
//! records once their outcome is known.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::db::{DocumentFilter, DocumentRepository, RepositoryError};
use crate::gateway::ArtifactFormat;
use crate::lifecycle::{ErrorKind, InFlight, InFlightGuard, LifecycleError, LifecycleManager};
use crate::models::{
    DocumentKind, DocumentStatus, LogEntry, NewSubmissionLog, NewTaxDocument, SubmissionLog,
    TaxDocument,
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of one document inside a sweep.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub document_id: String,
    pub result: Result<TaxDocument, ServiceError>,
}

impl DocumentOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug)]
pub struct BatchSubmission {
    pub outcomes: Vec<DocumentOutcome>,
    /// `None` when there was nothing to submit.
    pub log: Option<SubmissionLog>,
}

pub struct DocumentService {
    repository: Arc<dyn DocumentRepository>,
    manager: Arc<LifecycleManager>,
    /// Documents between load and persist. The manager's own guard only
    /// covers the gateway call.
    claims: InFlight,
}

impl DocumentService {
    pub fn new(repository: Arc<dyn DocumentRepository>, manager: Arc<LifecycleManager>) -> Self {
        Self {
            repository,
            manager,
            claims: InFlight::default(),
        }
    }

    pub fn repository(&self) -> &dyn DocumentRepository {
        self.repository.as_ref()
    }

    pub fn manager(&self) -> &LifecycleManager {
        &self.manager
    }

    pub async fn register(&self, doc: NewTaxDocument) -> Result<TaxDocument, ServiceError> {
        Ok(self.repository.insert_document(doc).await?)
    }

    pub async fn get(&self, kind: DocumentKind, document_id: &str) -> Result<TaxDocument, ServiceError> {
        Ok(self.repository.get_document(kind, document_id).await?)
    }

    fn claim(&self, kind: DocumentKind, document_id: &str) -> Result<InFlightGuard<'_>, ServiceError> {
        self.claims
            .try_acquire((kind, document_id.to_string()))
            .ok_or_else(|| {
                LifecycleError::InFlight {
                    document: format!("{kind} {document_id}"),
                }
                .into()
            })
    }

    /// Claim, then read the row the operation will start from.
    async fn load_claimed(
        &self,
        kind: DocumentKind,
        document_id: &str,
    ) -> Result<(InFlightGuard<'_>, TaxDocument), ServiceError> {
        let claim = self.claim(kind, document_id)?;
        let doc = self.repository.get_document(kind, document_id).await?;
        Ok((claim, doc))
    }

    async fn persist(&self, doc: TaxDocument) -> Result<TaxDocument, ServiceError> {
        if let Err(e) = self.repository.update_document(&doc).await {
            warn!(
                document = %doc.document_id,
                status = %doc.status,
                error = %e,
                "tax authority accepted the change but it could not be stored"
            );
            return Err(e.into());
        }
        Ok(doc)
    }

    /// Journal a submission. Failing to write the log does not undo the
    /// submission, so the error is only logged.
    async fn journal(&self, log: NewSubmissionLog) -> Option<SubmissionLog> {
        match self.repository.insert_log(log).await {
            Ok(log) => Some(log),
            Err(e) => {
                warn!(error = %e, "failed to write submission log");
                None
            }
        }
    }

    async fn journal_single(&self, doc: &TaxDocument, result: &Result<TaxDocument, LifecycleError>) {
        let entry = match result {
            Ok(updated) => LogEntry::accepted(&updated.document_id, updated.external_uuid.clone()),
            // Requests refused locally never reached the authority.
            Err(e) if e.kind() != ErrorKind::Gateway => return,
            Err(e) => LogEntry::rejected(&doc.document_id, e.to_string()),
        };
        let submission_id = result.as_ref().ok().and_then(|d| d.submission_id.clone());
        self.journal(NewSubmissionLog::from_entries(
            doc.kind,
            doc.pos_profile.clone(),
            submission_id,
            vec![entry],
        ))
        .await;
    }

    pub async fn sign_and_submit(
        &self,
        kind: DocumentKind,
        document_id: &str,
    ) -> Result<TaxDocument, ServiceError> {
        let (_claim, doc) = self.load_claimed(kind, document_id).await?;
        let result = self.manager.sign_and_submit(&doc).await;
        self.journal_single(&doc, &result).await;
        self.persist(result?).await
    }

    pub async fn submit(&self, kind: DocumentKind, document_id: &str) -> Result<TaxDocument, ServiceError> {
        let (_claim, doc) = self.load_claimed(kind, document_id).await?;
        let result = self.manager.submit(&doc).await;
        self.journal_single(&doc, &result).await;
        self.persist(result?).await
    }

    pub async fn refresh(&self, kind: DocumentKind, document_id: &str) -> Result<TaxDocument, ServiceError> {
        let (_claim, doc) = self.load_claimed(kind, document_id).await?;
        let updated = self.manager.refresh_status(&doc).await?;
        if updated == doc {
            return Ok(updated);
        }
        self.persist(updated).await
    }

    pub async fn cancel(
        &self,
        kind: DocumentKind,
        document_id: &str,
        reason: &str,
    ) -> Result<TaxDocument, ServiceError> {
        let (_claim, doc) = self.load_claimed(kind, document_id).await?;
        let updated = self.manager.cancel(&doc, reason).await?;
        self.persist(updated).await
    }

    pub async fn attach_signature(
        &self,
        kind: DocumentKind,
        document_id: &str,
        signature: &str,
    ) -> Result<TaxDocument, ServiceError> {
        let (_claim, doc) = self.load_claimed(kind, document_id).await?;
        let updated = self.manager.attach_signature(&doc, signature)?;
        self.persist(updated).await
    }

    pub async fn reset_signature(
        &self,
        kind: DocumentKind,
        document_id: &str,
    ) -> Result<TaxDocument, ServiceError> {
        let (_claim, doc) = self.load_claimed(kind, document_id).await?;
        let updated = self.manager.reset_signature(&doc)?;
        self.persist(updated).await
    }

    pub async fn fetch_artifact(
        &self,
        kind: DocumentKind,
        document_id: &str,
        format: ArtifactFormat,
    ) -> Result<Vec<u8>, ServiceError> {
        let doc = self.repository.get_document(kind, document_id).await?;
        Ok(self.manager.fetch_artifact(&doc, format).await?)
    }

    /// One batch member: the listed row may be stale by the time its turn
    /// comes, so it is read again under the claim.
    async fn submit_claimed(&self, listed: &TaxDocument) -> Result<TaxDocument, ServiceError> {
        let (_claim, doc) = self.load_claimed(listed.kind, &listed.document_id).await?;
        let updated = self.manager.submit(&doc).await?;
        self.persist(updated).await
    }

    async fn refresh_claimed(&self, listed: &TaxDocument) -> Result<TaxDocument, ServiceError> {
        let (_claim, doc) = self.load_claimed(listed.kind, &listed.document_id).await?;
        let updated = self.manager.refresh_status(&doc).await?;
        if updated == doc {
            return Ok(updated);
        }
        self.persist(updated).await
    }

    /// Submit every Signed document of `kind` for `company`, journaled as a
    /// single log. A failing document does not stop the batch.
    pub async fn submit_signed(
        &self,
        company: &str,
        kind: DocumentKind,
    ) -> Result<BatchSubmission, ServiceError> {
        let mut filter = DocumentFilter::for_company(company).with_status(DocumentStatus::Signed);
        filter.kind = Some(kind);
        let pending = self.repository.list_documents(&filter).await?;
        if pending.is_empty() {
            return Ok(BatchSubmission {
                outcomes: Vec::new(),
                log: None,
            });
        }

        let mut outcomes = Vec::with_capacity(pending.len());
        let mut entries = Vec::with_capacity(pending.len());
        let mut submission_id = None;
        for doc in &pending {
            let result = self.submit_claimed(doc).await;
            match &result {
                Ok(updated) => {
                    if submission_id.is_none() {
                        submission_id = updated.submission_id.clone();
                    }
                    entries.push(LogEntry::accepted(&doc.document_id, updated.external_uuid.clone()));
                }
                Err(e) => entries.push(LogEntry::rejected(&doc.document_id, e.to_string())),
            }
            outcomes.push(DocumentOutcome {
                document_id: doc.document_id.clone(),
                result,
            });
        }

        let pos_profile = pending
            .first()
            .and_then(|d| d.pos_profile.clone())
            .filter(|p| pending.iter().all(|d| d.pos_profile.as_deref() == Some(p.as_str())));
        let log = NewSubmissionLog::from_entries(kind, pos_profile, submission_id, entries);
        info!(company, kind = %kind, state = log.state.as_str(), "batch submission finished");

        Ok(BatchSubmission {
            outcomes,
            log: self.journal(log).await,
        })
    }

    /// Refresh every Submitted document of `company`, both kinds.
    pub async fn refresh_submitted(&self, company: &str) -> Result<Vec<DocumentOutcome>, ServiceError> {
        let filter = DocumentFilter::for_company(company).with_status(DocumentStatus::Submitted);
        let submitted = self.repository.list_documents(&filter).await?;

        let mut outcomes = Vec::with_capacity(submitted.len());
        for doc in submitted {
            let result = self.refresh_claimed(&doc).await;
            if let Err(e) = &result {
                warn!(document = %doc.document_id, kind = %doc.kind, error = %e, "refresh skipped");
            }
            outcomes.push(DocumentOutcome {
                document_id: doc.document_id,
                result,
            });
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use tokio::sync::Notify;

    use super::*;
    use crate::gateway::{
        CancelRequest, CancellationOutcome, CancellationStatus, DocumentAddress, GatewayError,
        RemoteStatus, StatusQuery, SubmissionReceipt, TaxAuthorityGateway,
    };
    use crate::models::SubmissionState;

    // ── in-memory repository ─────────────────────────────────────────────
    #[derive(Default)]
    struct MemoryRepository {
        documents: Mutex<Vec<TaxDocument>>,
        logs: Mutex<Vec<SubmissionLog>>,
        /// When set, `update_document` signals `update_entered` and waits
        /// for this before writing.
        hold_updates: Mutex<Option<Arc<Notify>>>,
        update_entered: Notify,
    }

    #[async_trait]
    impl DocumentRepository for MemoryRepository {
        async fn insert_document(&self, doc: NewTaxDocument) -> Result<TaxDocument, RepositoryError> {
            let doc: TaxDocument = doc.into();
            let mut docs = self.documents.lock().unwrap();
            if docs.iter().any(|d| d.key() == doc.key()) {
                return Err(RepositoryError::AlreadyExists(doc.document_id));
            }
            docs.push(doc.clone());
            Ok(doc)
        }

        async fn get_document(
            &self,
            kind: DocumentKind,
            document_id: &str,
        ) -> Result<TaxDocument, RepositoryError> {
            self.documents
                .lock()
                .unwrap()
                .iter()
                .find(|d| d.kind == kind && d.document_id == document_id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        }

        async fn update_document(&self, doc: &TaxDocument) -> Result<(), RepositoryError> {
            let hold = self.hold_updates.lock().unwrap().clone();
            if let Some(release) = hold {
                self.update_entered.notify_one();
                release.notified().await;
            }
            let mut docs = self.documents.lock().unwrap();
            let slot = docs
                .iter_mut()
                .find(|d| d.key() == doc.key())
                .ok_or(RepositoryError::NotFound)?;
            *slot = doc.clone();
            Ok(())
        }

        async fn retire_document(
            &self,
            kind: DocumentKind,
            document_id: &str,
        ) -> Result<(), RepositoryError> {
            self.documents
                .lock()
                .unwrap()
                .retain(|d| !(d.kind == kind && d.document_id == document_id));
            Ok(())
        }

        async fn list_documents(
            &self,
            filter: &DocumentFilter,
        ) -> Result<Vec<TaxDocument>, RepositoryError> {
            Ok(self
                .documents
                .lock()
                .unwrap()
                .iter()
                .filter(|d| filter.matches(d))
                .cloned()
                .collect())
        }

        async fn insert_log(&self, log: NewSubmissionLog) -> Result<SubmissionLog, RepositoryError> {
            let mut logs = self.logs.lock().unwrap();
            let stored = SubmissionLog {
                id: logs.len() as i64 + 1,
                kind: log.kind,
                pos_profile: log.pos_profile,
                submission_id: log.submission_id,
                state: log.state,
                summary: log.summary,
                entries: log.entries,
                created_at: Utc::now(),
            };
            logs.push(stored.clone());
            Ok(stored)
        }

        async fn get_log(&self, id: i64) -> Result<SubmissionLog, RepositoryError> {
            self.logs
                .lock()
                .unwrap()
                .iter()
                .find(|l| l.id == id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        }

        async fn list_logs(&self, _limit: Option<u32>) -> Result<Vec<SubmissionLog>, RepositoryError> {
            Ok(self.logs.lock().unwrap().iter().rev().cloned().collect())
        }
    }

    // ── stub gateway ─────────────────────────────────────────────────────
    // Accepts everything except documents whose id starts with "FAIL".
    // Each signing issues a fresh UUID.
    #[derive(Default)]
    struct StubGateway {
        sign_calls: AtomicUsize,
    }

    fn refuse(document_id: &str) -> Result<(), GatewayError> {
        if document_id.starts_with("FAIL") {
            return Err(GatewayError::Transport("connection reset".to_string()));
        }
        Ok(())
    }

    #[async_trait]
    impl TaxAuthorityGateway for StubGateway {
        async fn sign_and_submit(
            &self,
            address: &DocumentAddress,
        ) -> Result<SubmissionReceipt, GatewayError> {
            refuse(&address.document_id)?;
            let n = self.sign_calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(SubmissionReceipt {
                signature: "sig".to_string(),
                external_uuid: Some(format!("UUID-{}-{n}", address.document_id)),
                submission_id: Some("SUB-1".to_string()),
                status: DocumentStatus::Submitted,
            })
        }

        async fn submit_signed(
            &self,
            address: &DocumentAddress,
            _signature: &str,
        ) -> Result<SubmissionReceipt, GatewayError> {
            refuse(&address.document_id)?;
            Ok(SubmissionReceipt {
                signature: String::new(),
                external_uuid: Some(format!("UUID-{}", address.document_id)),
                submission_id: Some("SUB-2".to_string()),
                status: DocumentStatus::Submitted,
            })
        }

        async fn refresh_status(&self, query: &StatusQuery) -> Result<RemoteStatus, GatewayError> {
            refuse(&query.address.document_id)?;
            Ok(RemoteStatus {
                status: DocumentStatus::Valid,
                cancellation_reason: None,
            })
        }

        async fn cancel(&self, _request: &CancelRequest) -> Result<CancellationOutcome, GatewayError> {
            Ok(CancellationOutcome {
                status: CancellationStatus::Success,
                message: None,
            })
        }

        async fn fetch_artifact(
            &self,
            _address: &DocumentAddress,
            _external_uuid: Option<&str>,
            _format: ArtifactFormat,
        ) -> Result<Vec<u8>, GatewayError> {
            Ok(b"{}".to_vec())
        }
    }

    fn service() -> (DocumentService, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::default());
        let manager = Arc::new(LifecycleManager::new(Arc::new(StubGateway::default())));
        (DocumentService::new(repo.clone(), manager), repo)
    }

    fn invoice(id: &str) -> NewTaxDocument {
        NewTaxDocument {
            document_id: id.to_string(),
            kind: DocumentKind::Invoice,
            pos_profile: None,
            company: "Axentor".to_string(),
            posting_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            grand_total: dec!(250.00),
        }
    }

    #[tokio::test]
    async fn sign_and_submit_persists_and_journals() {
        let (svc, repo) = service();
        svc.register(invoice("SINV-1")).await.unwrap();

        let doc = svc.sign_and_submit(DocumentKind::Invoice, "SINV-1").await.unwrap();
        assert_eq!(doc.status, DocumentStatus::Submitted);
        assert_eq!(svc.get(DocumentKind::Invoice, "SINV-1").await.unwrap(), doc);

        let logs = repo.list_logs(None).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].state, SubmissionState::Completed);
        assert_eq!(logs[0].submission_id.as_deref(), Some("SUB-1"));
    }

    #[tokio::test]
    async fn gateway_failure_is_journaled_and_state_kept() {
        let (svc, repo) = service();
        svc.register(invoice("FAIL-1")).await.unwrap();

        let err = svc.sign_and_submit(DocumentKind::Invoice, "FAIL-1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Lifecycle(ref e) if e.kind() == ErrorKind::Gateway));

        let stored = svc.get(DocumentKind::Invoice, "FAIL-1").await.unwrap();
        assert_eq!(stored.status, DocumentStatus::NotSigned);

        let logs = repo.list_logs(None).await.unwrap();
        assert_eq!(logs[0].state, SubmissionState::Failed);
        assert!(logs[0].entries[0].error.as_deref().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn local_refusals_are_not_journaled() {
        let (svc, repo) = service();
        svc.register(invoice("SINV-1")).await.unwrap();

        let err = svc.submit(DocumentKind::Invoice, "SINV-1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Lifecycle(ref e) if e.kind() == ErrorKind::Conflict));
        assert!(repo.list_logs(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let (svc, _) = service();
        let err = svc.refresh(DocumentKind::Receipt, "nope").await.unwrap_err();
        assert!(matches!(err, ServiceError::Repository(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn submit_signed_batches_into_one_log() {
        let (svc, repo) = service();
        for id in ["SINV-1", "FAIL-2", "SINV-3"] {
            svc.register(invoice(id)).await.unwrap();
            svc.attach_signature(DocumentKind::Invoice, id, "sig").await.unwrap();
        }

        let batch = svc.submit_signed("Axentor", DocumentKind::Invoice).await.unwrap();
        assert_eq!(batch.outcomes.len(), 3);
        assert_eq!(batch.outcomes.iter().filter(|o| o.is_ok()).count(), 2);

        let log = batch.log.unwrap();
        assert_eq!(log.state, SubmissionState::PartiallySucceeded);
        assert_eq!(log.entries.len(), 3);
        assert_eq!(repo.list_logs(None).await.unwrap().len(), 1);

        let failed = svc.get(DocumentKind::Invoice, "FAIL-2").await.unwrap();
        assert_eq!(failed.status, DocumentStatus::Signed);
    }

    #[tokio::test]
    async fn submit_signed_with_nothing_pending_writes_no_log() {
        let (svc, repo) = service();
        svc.register(invoice("SINV-1")).await.unwrap();

        let batch = svc.submit_signed("Axentor", DocumentKind::Invoice).await.unwrap();
        assert!(batch.outcomes.is_empty());
        assert!(batch.log.is_none());
        assert!(repo.list_logs(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn refresh_submitted_continues_past_failures() {
        let (svc, _) = service();
        for id in ["SINV-1", "FAIL-2"] {
            svc.register(invoice(id)).await.unwrap();
            svc.attach_signature(DocumentKind::Invoice, id, "sig").await.unwrap();
        }
        svc.submit(DocumentKind::Invoice, "SINV-1").await.unwrap();
        // FAIL-2 cannot be submitted through the stub; mark it Submitted by hand.
        let mut stuck = svc.get(DocumentKind::Invoice, "FAIL-2").await.unwrap();
        stuck.status = DocumentStatus::Submitted;
        stuck.external_uuid = Some("UUID-FAIL-2".to_string());
        svc.repository().update_document(&stuck).await.unwrap();

        let outcomes = svc.refresh_submitted("Axentor").await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);

        let refreshed = svc.get(DocumentKind::Invoice, "SINV-1").await.unwrap();
        assert_eq!(refreshed.status, DocumentStatus::Valid);
        let untouched = svc.get(DocumentKind::Invoice, "FAIL-2").await.unwrap();
        assert_eq!(untouched.status, DocumentStatus::Submitted);
    }

    #[tokio::test]
    async fn cancel_and_reset_go_through_the_repository() {
        let (svc, _) = service();
        svc.register(invoice("SINV-1")).await.unwrap();
        svc.register(invoice("SINV-2")).await.unwrap();

        svc.sign_and_submit(DocumentKind::Invoice, "SINV-1").await.unwrap();
        let cancelled = svc
            .cancel(DocumentKind::Invoice, "SINV-1", "duplicate entry")
            .await
            .unwrap();
        assert_eq!(cancelled.status, DocumentStatus::Cancelled);
        assert_eq!(
            svc.get(DocumentKind::Invoice, "SINV-1").await.unwrap().cancellation_reason.as_deref(),
            Some("duplicate entry")
        );

        svc.attach_signature(DocumentKind::Invoice, "SINV-2", "sig").await.unwrap();
        let reset = svc.reset_signature(DocumentKind::Invoice, "SINV-2").await.unwrap();
        assert_eq!(reset.status, DocumentStatus::NotSigned);
        assert_eq!(reset.signature, None);
    }

    #[tokio::test]
    async fn fetch_artifact_reads_through() {
        let (svc, _) = service();
        svc.register(invoice("SINV-1")).await.unwrap();
        let bytes = svc
            .fetch_artifact(DocumentKind::Invoice, "SINV-1", ArtifactFormat::Json)
            .await
            .unwrap();
        assert_eq!(bytes, b"{}".to_vec());
    }

    #[tokio::test]
    async fn document_stays_claimed_until_the_result_is_stored() {
        let repo = Arc::new(MemoryRepository::default());
        let gateway = Arc::new(StubGateway::default());
        let manager = Arc::new(LifecycleManager::new(gateway.clone()));
        let svc = Arc::new(DocumentService::new(repo.clone(), manager));
        svc.register(invoice("SINV-1")).await.unwrap();

        let release = Arc::new(Notify::new());
        *repo.hold_updates.lock().unwrap() = Some(release.clone());

        let first = tokio::spawn({
            let svc = svc.clone();
            async move { svc.sign_and_submit(DocumentKind::Invoice, "SINV-1").await }
        });
        // The gateway has answered; the first call is now writing the row.
        repo.update_entered.notified().await;
        assert!(!svc.manager().is_in_flight(DocumentKind::Invoice, "SINV-1"));

        let err = svc.sign_and_submit(DocumentKind::Invoice, "SINV-1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Lifecycle(LifecycleError::InFlight { .. })));
        let err = svc
            .cancel(DocumentKind::Invoice, "SINV-1", "duplicate entry")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Lifecycle(LifecycleError::InFlight { .. })));

        *repo.hold_updates.lock().unwrap() = None;
        release.notify_one();
        let signed = first.await.unwrap().unwrap();
        assert_eq!(gateway.sign_calls.load(Ordering::SeqCst), 1);

        let stored = svc.get(DocumentKind::Invoice, "SINV-1").await.unwrap();
        assert_eq!(stored.external_uuid, signed.external_uuid);

        // A retry now starts from the stored row and is refused locally.
        let err = svc.sign_and_submit(DocumentKind::Invoice, "SINV-1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Lifecycle(ref e) if e.kind() == ErrorKind::Conflict));
        assert_eq!(gateway.sign_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn claims_are_per_document() {
        let (svc, repo) = service();
        let svc = Arc::new(svc);
        svc.register(invoice("SINV-1")).await.unwrap();
        svc.register(invoice("SINV-2")).await.unwrap();

        let release = Arc::new(Notify::new());
        *repo.hold_updates.lock().unwrap() = Some(release.clone());
        let first = tokio::spawn({
            let svc = svc.clone();
            async move { svc.attach_signature(DocumentKind::Invoice, "SINV-1", "sig").await }
        });
        repo.update_entered.notified().await;
        *repo.hold_updates.lock().unwrap() = None;

        let other = svc.attach_signature(DocumentKind::Invoice, "SINV-2", "sig").await.unwrap();
        assert_eq!(other.status, DocumentStatus::Signed);

        release.notify_one();
        assert_eq!(first.await.unwrap().unwrap().status, DocumentStatus::Signed);
    }
}
