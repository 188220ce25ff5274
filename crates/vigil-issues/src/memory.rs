//! In-process store, for tests and dry runs.

use crate::error::{Result, StoreError};
use crate::issue::Issue;
use crate::run::{DomainRunSummary, Run};
use crate::store::{IssueFilter, IssueStore, RunStore, TrendStore};
use crate::suppression::Suppression;
use crate::trend::TrendRow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use vigil_core::{Category, DomainId, Fingerprint, IssueStatus, RunId};

#[derive(Debug, Default)]
struct State {
    issues: BTreeMap<Fingerprint, Issue>,
    suppressions: BTreeMap<Fingerprint, Suppression>,
    trends: BTreeMap<(DomainId, NaiveDate, Category), TrendRow>,
    runs: BTreeMap<RunId, Run>,
    domain_runs: BTreeMap<RunId, Vec<DomainRunSummary>>,
}

/// Store keeping everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, to exercise persistence-failure
    /// handling.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Backend("writes disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IssueStore for MemoryStore {
    async fn upsert_issue(&self, issue: &Issue) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let mut issue = issue.clone();
        // Row identity survives upserts
        if let Some(existing) = state.issues.get(&issue.fingerprint) {
            issue.id.clone_from(&existing.id);
        }
        state.issues.insert(issue.fingerprint.clone(), issue);
        Ok(())
    }

    async fn get_issue(&self, fingerprint: &Fingerprint) -> Result<Option<Issue>> {
        Ok(self.state.read().await.issues.get(fingerprint).cloned())
    }

    async fn list_issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        Ok(self
            .state
            .read()
            .await
            .issues
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        issue_id: &str,
        status: IssueStatus,
        at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let issue = state
            .issues
            .values_mut()
            .find(|i| i.id == issue_id)
            .ok_or_else(|| StoreError::IssueNotFound(issue_id.to_string()))?;
        issue.status = status;
        if status == IssueStatus::Verified {
            issue.verified_at = at;
        }
        Ok(())
    }

    async fn add_suppression(&self, suppression: &Suppression) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        if let Some(issue) = state.issues.get_mut(&suppression.fingerprint) {
            issue.status = IssueStatus::Suppressed;
        }
        state
            .suppressions
            .insert(suppression.fingerprint.clone(), suppression.clone());
        Ok(())
    }

    async fn list_suppressions(&self) -> Result<Vec<Suppression>> {
        Ok(self.state.read().await.suppressions.values().cloned().collect())
    }

    async fn remove_suppression(&self, fingerprint: &Fingerprint) -> Result<bool> {
        self.check_writable()?;
        Ok(self
            .state
            .write()
            .await
            .suppressions
            .remove(fingerprint)
            .is_some())
    }
}

#[async_trait]
impl TrendStore for MemoryStore {
    async fn record_trends(&self, rows: &[TrendRow]) -> Result<usize> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        let mut inserted = 0;
        for row in rows {
            let key = (row.domain.clone(), row.date, row.category);
            if !state.trends.contains_key(&key) {
                state.trends.insert(key, row.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn list_trends(&self, domain: &DomainId) -> Result<Vec<TrendRow>> {
        Ok(self
            .state
            .read()
            .await
            .trends
            .values()
            .filter(|r| &r.domain == domain)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn create_run(&self, run: &Run) -> Result<()> {
        self.check_writable()?;
        self.state
            .write()
            .await
            .runs
            .insert(run.id.clone(), run.clone());
        Ok(())
    }

    async fn finish_run(&self, run: &Run) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        if !state.runs.contains_key(&run.id) {
            return Err(StoreError::RunNotFound(run.id.to_string()));
        }
        state.runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    async fn record_domain_run(&self, run_id: &RunId, summary: &DomainRunSummary) -> Result<()> {
        self.check_writable()?;
        self.state
            .write()
            .await
            .domain_runs
            .entry(run_id.clone())
            .or_default()
            .push(summary.clone());
        Ok(())
    }

    async fn get_run(&self, run_id: &RunId) -> Result<Option<Run>> {
        Ok(self.state.read().await.runs.get(run_id).cloned())
    }

    async fn list_domain_runs(&self, run_id: &RunId) -> Result<Vec<DomainRunSummary>> {
        Ok(self
            .state
            .read()
            .await
            .domain_runs
            .get(run_id)
            .cloned()
            .unwrap_or_default())
    }
}
