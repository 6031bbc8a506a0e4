use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ProgressError, ProgressService, Result};
use crate::types::ProgressStatus;

/// Reason reported for a failed item whose error carried no message.
pub const UNKNOWN_ERROR_REASON: &str = "Lỗi không xác định";

/// Throttle between bulk items. `pause` is called before every item after
/// the first, with that item's index.
pub trait Pacer: Send + Sync {
    fn pause(&self, index: usize);
}

pub struct NoPause;

impl Pacer for NoPause {
    fn pause(&self, _index: usize) {}
}

pub struct FixedPause(pub Duration);

impl Pacer for FixedPause {
    fn pause(&self, _index: usize) {
        std::thread::sleep(self.0);
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkPassRequest {
    pub progress_ids: Vec<String>,
    pub admin_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinglePassResult {
    pub progress_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SinglePassResult {
    fn failed(progress_id: &str, student_id: Option<String>, error: String) -> Self {
        Self {
            progress_id: progress_id.to_string(),
            student_id,
            success: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkPassFailure {
    pub student_id: String,
    pub progress_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkPassResult {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub results: Vec<SinglePassResult>,
    pub failures: Vec<BulkPassFailure>,
}

/// Folds per-item results into the batch summary, keeping input order.
pub fn aggregate_bulk_pass_results(results: Vec<SinglePassResult>) -> BulkPassResult {
    let failures: Vec<BulkPassFailure> = results
        .iter()
        .filter(|r| !r.success)
        .map(|r| BulkPassFailure {
            student_id: r.student_id.clone().unwrap_or_default(),
            progress_id: r.progress_id.clone(),
            reason: r
                .error
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR_REASON.to_string()),
        })
        .collect();

    BulkPassResult {
        total: results.len(),
        success: results.len() - failures.len(),
        failed: failures.len(),
        results,
        failures,
    }
}

/// Approves many pending records one after another. One item's failure
/// never stops the batch.
#[derive(Clone)]
pub struct BulkApprover {
    service: ProgressService,
    pacer: Arc<dyn Pacer>,
}

impl BulkApprover {
    pub fn new(service: ProgressService, pacer: Arc<dyn Pacer>) -> Self {
        Self { service, pacer }
    }

    /// Approves one record, folding every error into the returned result.
    pub fn process_single_pass(&self, progress_id: &str, admin_id: &str) -> SinglePassResult {
        let progress = match self.service.get_progress(progress_id) {
            Ok(progress) => progress,
            Err(e) => return SinglePassResult::failed(progress_id, None, e.to_string()),
        };
        let student_id = Some(progress.student_id.clone());

        if progress.status != ProgressStatus::PendingApproval {
            let error = ProgressError::not_pending(progress.status);
            return SinglePassResult::failed(progress_id, student_id, error.to_string());
        }

        match self.service.approve(progress_id, admin_id) {
            Ok(outcome) => {
                if !outcome.dependency_failures.is_empty() {
                    tracing::debug!(
                        "Bulk approval of {} had {} side-effect failure(s)",
                        progress_id,
                        outcome.dependency_failures.len()
                    );
                }
                SinglePassResult {
                    progress_id: progress_id.to_string(),
                    student_id,
                    success: true,
                    error: None,
                }
            }
            Err(e) => SinglePassResult::failed(progress_id, student_id, e.to_string()),
        }
    }

    /// Processes `progress_ids` sequentially in input order. Duplicate ids are
    /// processed again and fail on the second pass.
    pub fn bulk_pass(&self, request: &BulkPassRequest) -> Result<BulkPassResult> {
        if request.progress_ids.is_empty() {
            return Err(ProgressError::validation(
                "progress_ids",
                "Vui lòng chọn ít nhất một tiến độ",
            ));
        }
        if request.admin_id.trim().is_empty() {
            return Err(ProgressError::validation(
                "admin_id",
                "Thiếu thông tin quản trị viên",
            ));
        }

        let mut results = Vec::with_capacity(request.progress_ids.len());
        for (index, progress_id) in request.progress_ids.iter().enumerate() {
            if index > 0 {
                self.pacer.pause(index);
            }
            results.push(self.process_single_pass(progress_id, &request.admin_id));
        }

        let summary = aggregate_bulk_pass_results(results);
        tracing::info!(
            "Bulk pass by {}: {} succeeded, {} failed of {}",
            request.admin_id,
            summary.success,
            summary.failed,
            summary.total
        );
        Ok(summary)
    }
}
