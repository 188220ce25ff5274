//! Store trait implementations backed by `SQLite`.

use crate::error::DatabaseError;
use crate::{issues, runs, suppressions, trends, Database};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vigil_core::{DomainId, Fingerprint, IssueStatus, RunId};
use vigil_issues::{
    DomainRunSummary, Issue, IssueFilter, IssueStore, Run, RunStore, StoreError, Suppression,
    TrendRow, TrendStore,
};

type StoreResult<T> = vigil_issues::Result<T>;

#[async_trait]
impl IssueStore for Database {
    async fn upsert_issue(&self, issue: &Issue) -> StoreResult<()> {
        Ok(issues::upsert_issue(self.pool(), issue).await?)
    }

    async fn get_issue(&self, fingerprint: &Fingerprint) -> StoreResult<Option<Issue>> {
        Ok(issues::get_issue(self.pool(), fingerprint).await?)
    }

    async fn list_issues(&self, filter: &IssueFilter) -> StoreResult<Vec<Issue>> {
        Ok(issues::list_issues(self.pool(), filter).await?)
    }

    async fn update_status(
        &self,
        issue_id: &str,
        status: IssueStatus,
        at: Option<DateTime<Utc>>,
    ) -> StoreResult<()> {
        issues::update_status(self.pool(), issue_id, status, at)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => StoreError::IssueNotFound(issue_id.to_string()),
                other => other.into(),
            })
    }

    async fn add_suppression(&self, suppression: &Suppression) -> StoreResult<()> {
        Ok(suppressions::add_suppression(self.pool(), suppression).await?)
    }

    async fn list_suppressions(&self) -> StoreResult<Vec<Suppression>> {
        Ok(suppressions::list_suppressions(self.pool()).await?)
    }

    async fn remove_suppression(&self, fingerprint: &Fingerprint) -> StoreResult<bool> {
        Ok(suppressions::remove_suppression(self.pool(), fingerprint).await?)
    }
}

#[async_trait]
impl TrendStore for Database {
    async fn record_trends(&self, rows: &[TrendRow]) -> StoreResult<usize> {
        Ok(trends::record_trends(self.pool(), rows).await?)
    }

    async fn list_trends(&self, domain: &DomainId) -> StoreResult<Vec<TrendRow>> {
        Ok(trends::list_trends(self.pool(), domain).await?)
    }
}

#[async_trait]
impl RunStore for Database {
    async fn create_run(&self, run: &Run) -> StoreResult<()> {
        Ok(runs::create_run(self.pool(), run).await?)
    }

    async fn finish_run(&self, run: &Run) -> StoreResult<()> {
        runs::finish_run(self.pool(), run)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => StoreError::RunNotFound(run.id.to_string()),
                other => other.into(),
            })
    }

    async fn record_domain_run(
        &self,
        run_id: &RunId,
        summary: &DomainRunSummary,
    ) -> StoreResult<()> {
        Ok(runs::record_domain_run(self.pool(), run_id, summary).await?)
    }

    async fn get_run(&self, run_id: &RunId) -> StoreResult<Option<Run>> {
        Ok(runs::get_run(self.pool(), run_id).await?)
    }

    async fn list_domain_runs(&self, run_id: &RunId) -> StoreResult<Vec<DomainRunSummary>> {
        Ok(runs::list_domain_runs(self.pool(), run_id).await?)
    }
}
