use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};

use super::notify::{self, NotificationEmitter};
use super::pass_condition::{PassCheck, check_pass_condition};
use super::unlock::{UnlockEngine, UnlockResult};
use super::validation::{
    validate_project_count, validate_project_url, validate_rejection_reason,
    validate_session_count,
};
use super::{
    ActivityLogger, AuditLogger, Collaborators, DependencyFailure, Entity, ProgressError, Result,
    SideEffect, best_effort,
};
use crate::store::{CourseStore, ProgressStore};
use crate::types::{
    Course, ProgressPatch, ProgressStatus, StatusUpdate, StudentProgress, TrackingAction,
};

#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    pub progress: StudentProgress,
    pub pass_check: PassCheck,
    /// Status the record was moved to by this edit, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_transition: Option<ProgressStatus>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependency_failures: Vec<DependencyFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApproveOutcome {
    pub progress: StudentProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock: Option<UnlockResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependency_failures: Vec<DependencyFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RejectOutcome {
    pub progress: StudentProgress,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependency_failures: Vec<DependencyFailure>,
}

/// Splits a link list edit into added and removed links, counting duplicates.
fn diff_links(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let mut pool: Vec<&String> = new.iter().collect();
    let mut removed = Vec::new();
    for link in old {
        match pool.iter().position(|candidate| *candidate == link) {
            Some(idx) => {
                pool.remove(idx);
            }
            None => removed.push(link.clone()),
        }
    }
    let added = pool.into_iter().cloned().collect();
    (added, removed)
}

/// Owns the status transitions of progress records.
#[derive(Clone)]
pub struct ProgressService {
    progress: Arc<dyn ProgressStore>,
    courses: Arc<dyn CourseStore>,
    audit: AuditLogger,
    notifier: NotificationEmitter,
    activity: ActivityLogger,
    unlock: UnlockEngine,
}

impl ProgressService {
    pub fn new(collab: &Collaborators) -> Self {
        Self {
            progress: collab.progress.clone(),
            courses: collab.courses.clone(),
            audit: AuditLogger::new(collab.audit.clone()),
            notifier: NotificationEmitter::new(collab.notifications.clone()),
            activity: ActivityLogger::new(collab.activity.clone()),
            unlock: UnlockEngine::new(collab),
        }
    }

    pub fn unlock_engine(&self) -> &UnlockEngine {
        &self.unlock
    }

    pub fn get_progress(&self, progress_id: &str) -> Result<StudentProgress> {
        self.progress
            .get_progress(progress_id)?
            .ok_or_else(|| ProgressError::not_found(Entity::Progress, progress_id))
    }

    fn get_course(&self, course_id: &str) -> Result<Course> {
        self.courses
            .get_course(course_id)?
            .ok_or_else(|| ProgressError::not_found(Entity::Course, course_id))
    }

    /// Re-reads the record after a conditional write lost its precondition.
    fn lost_race(&self, progress_id: &str) -> ProgressError {
        match self.get_progress(progress_id) {
            Ok(current) => ProgressError::not_pending(current.status),
            Err(e) => e,
        }
    }

    /// Applies an admin edit to sessions, projects and links.
    ///
    /// Every field is validated before anything is written. After the write,
    /// a `not_started` or `in_progress` record that now meets its pass
    /// condition moves to `pending_approval`; otherwise a `not_started` record
    /// with any activity moves to `in_progress`.
    pub fn update_progress(
        &self,
        progress_id: &str,
        patch: &ProgressPatch,
        admin_id: &str,
    ) -> Result<UpdateOutcome> {
        let current = self.get_progress(progress_id)?;
        let course = self.get_course(&current.course_id)?;

        if let Some(sessions) = patch.completed_sessions {
            validate_session_count(sessions, course.required_sessions)?;
        }
        if let Some(projects) = patch.projects_submitted {
            validate_project_count(projects, course.required_projects)?;
        }
        let new_links = patch
            .project_links
            .as_ref()
            .map(|links| {
                links
                    .iter()
                    .map(|link| validate_project_url(link).map(str::to_string))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let sessions_changed = patch
            .completed_sessions
            .filter(|s| *s != current.completed_sessions);
        let projects_changed = patch
            .projects_submitted
            .filter(|p| *p != current.projects_submitted);
        let (added_links, removed_links) = match &new_links {
            Some(links) => diff_links(&current.project_links, links),
            None => (Vec::new(), Vec::new()),
        };
        let links_changed = !added_links.is_empty() || !removed_links.is_empty();

        let effective = ProgressPatch {
            completed_sessions: sessions_changed,
            projects_submitted: projects_changed,
            project_links: new_links.filter(|_| links_changed),
        };
        if effective.is_empty() {
            return Ok(UpdateOutcome {
                pass_check: check_pass_condition(&current, course.requirements()),
                progress: current,
                auto_transition: None,
                dependency_failures: Vec::new(),
            });
        }

        let mut progress = self.progress.update_progress_fields(progress_id, &effective)?;

        let mut entries: Vec<(TrackingAction, Value, Value)> = Vec::new();
        if let Some(sessions) = sessions_changed {
            entries.push((
                TrackingAction::UpdateSessions,
                json!(current.completed_sessions),
                json!(sessions),
            ));
        }
        if let Some(projects) = projects_changed {
            entries.push((
                TrackingAction::UpdateProjects,
                json!(current.projects_submitted),
                json!(projects),
            ));
        }
        for link in added_links {
            entries.push((TrackingAction::AddProjectLink, Value::Null, json!(link)));
        }
        for link in removed_links {
            entries.push((TrackingAction::RemoveProjectLink, json!(link), Value::Null));
        }

        let mut dependency_failures = Vec::new();
        for (action, previous, new) in entries {
            if let Err(failure) = self.audit.record(
                &progress.student_id,
                &progress.course_id,
                action,
                previous,
                new,
                admin_id,
            ) {
                dependency_failures.push(failure);
            }
        }

        let pass_check = check_pass_condition(&progress, course.requirements());
        let mut auto_transition = None;
        if progress.status.allows_auto_transition() {
            let target = if pass_check.can_pass {
                Some(ProgressStatus::PendingApproval)
            } else if progress.status == ProgressStatus::NotStarted && progress.has_activity() {
                Some(ProgressStatus::InProgress)
            } else {
                None
            };

            if let Some(target) = target {
                let from = progress.status;
                if let Some(moved) = self.progress.transition_status(
                    progress_id,
                    from,
                    &StatusUpdate::to(target),
                )? {
                    tracing::info!("Progress {} moved {} -> {}", progress_id, from, target);
                    progress = moved;
                    auto_transition = Some(target);
                }
            }
        }

        Ok(UpdateOutcome {
            progress,
            pass_check,
            auto_transition,
            dependency_failures,
        })
    }

    pub fn add_project_link(
        &self,
        progress_id: &str,
        url: &str,
        admin_id: &str,
    ) -> Result<UpdateOutcome> {
        let url = validate_project_url(url)?;
        let current = self.get_progress(progress_id)?;
        let mut links = current.project_links;
        links.push(url.to_string());
        let patch = ProgressPatch {
            project_links: Some(links),
            ..ProgressPatch::default()
        };
        self.update_progress(progress_id, &patch, admin_id)
    }

    pub fn remove_project_link(
        &self,
        progress_id: &str,
        url: &str,
        admin_id: &str,
    ) -> Result<UpdateOutcome> {
        let url = url.trim();
        let current = self.get_progress(progress_id)?;
        let mut links = current.project_links;
        let idx = links
            .iter()
            .position(|l| l == url)
            .ok_or_else(|| ProgressError::validation("project_links", "Không tìm thấy link dự án"))?;
        links.remove(idx);
        let patch = ProgressPatch {
            project_links: Some(links),
            ..ProgressPatch::default()
        };
        self.update_progress(progress_id, &patch, admin_id)
    }

    /// Marks a `pending_approval` record completed, then runs the audit log,
    /// completion notice, unlock and activity entry as best-effort steps.
    pub fn approve(&self, progress_id: &str, admin_id: &str) -> Result<ApproveOutcome> {
        if admin_id.trim().is_empty() {
            return Err(ProgressError::validation(
                "admin_id",
                "Thiếu thông tin quản trị viên",
            ));
        }

        let current = self.get_progress(progress_id)?;
        if current.status != ProgressStatus::PendingApproval {
            return Err(ProgressError::not_pending(current.status));
        }
        let course = self.get_course(&current.course_id)?;

        let now = Utc::now();
        let progress = self
            .progress
            .transition_status(
                progress_id,
                ProgressStatus::PendingApproval,
                &StatusUpdate::approved(admin_id, now),
            )?
            .ok_or_else(|| self.lost_race(progress_id))?;

        tracing::info!(
            "Approved progress {} (student {}, course {}) by {}",
            progress.id,
            progress.student_id,
            progress.course_id,
            admin_id
        );

        let mut dependency_failures = Vec::new();

        if let Err(failure) = self.audit.record(
            &progress.student_id,
            &progress.course_id,
            TrackingAction::Approve,
            json!(ProgressStatus::PendingApproval),
            json!(ProgressStatus::Completed),
            admin_id,
        ) {
            dependency_failures.push(failure);
        }

        if let Err(failure) = self
            .notifier
            .dispatch(notify::course_completed(&progress.student_id, &course))
        {
            dependency_failures.push(failure);
        }

        let unlock = match best_effort(
            SideEffect::Unlock,
            self.unlock
                .unlock_next_course(&progress.student_id, &course.id, admin_id),
        ) {
            Ok(outcome) => {
                dependency_failures.extend(outcome.dependency_failures);
                Some(outcome.result)
            }
            Err(failure) => {
                dependency_failures.push(failure);
                None
            }
        };

        if let Err(failure) = self.activity.record(
            admin_id,
            "approve_course",
            &progress.id,
            format!(
                "Duyệt hoàn thành khóa học \"{}\" cho học viên {}",
                course.title, progress.student_id
            ),
        ) {
            dependency_failures.push(failure);
        }

        Ok(ApproveOutcome {
            progress,
            unlock,
            dependency_failures,
        })
    }

    /// Moves a `pending_approval` record to `rejected` with a trimmed reason.
    pub fn reject(&self, progress_id: &str, reason: &str, admin_id: &str) -> Result<RejectOutcome> {
        let reason = validate_rejection_reason(reason)?;

        let current = self.get_progress(progress_id)?;
        if current.status != ProgressStatus::PendingApproval {
            return Err(ProgressError::not_pending(current.status));
        }
        let course = self.get_course(&current.course_id)?;

        let progress = self
            .progress
            .transition_status(
                progress_id,
                ProgressStatus::PendingApproval,
                &StatusUpdate::rejected(reason),
            )?
            .ok_or_else(|| self.lost_race(progress_id))?;

        tracing::info!("Rejected progress {} by {}", progress.id, admin_id);

        let mut dependency_failures = Vec::new();

        if let Err(failure) = self.audit.record(
            &progress.student_id,
            &progress.course_id,
            TrackingAction::Reject,
            json!(ProgressStatus::PendingApproval),
            json!({ "status": ProgressStatus::Rejected, "reason": reason }),
            admin_id,
        ) {
            dependency_failures.push(failure);
        }

        if let Err(failure) = self.notifier.dispatch(notify::course_rejected(
            &progress.student_id,
            &course,
            reason,
        )) {
            dependency_failures.push(failure);
        }

        if let Err(failure) = self.activity.record(
            admin_id,
            "reject_course",
            &progress.id,
            format!(
                "Từ chối khóa học \"{}\" của học viên {}: {}",
                course.title, progress.student_id, reason
            ),
        ) {
            dependency_failures.push(failure);
        }

        Ok(RejectOutcome {
            progress,
            dependency_failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::testing::{Fixture, progress_record};
    use crate::store::{ActivityStore, AuditLogStore, NotificationStore, StudentStore};
    use crate::types::NotificationType;

    fn pending(fx: &Fixture, id: &str, course_id: &str) {
        let mut p = progress_record(id, "stu-1", course_id, ProgressStatus::PendingApproval);
        p.completed_sessions = 10;
        p.projects_submitted = 2;
        p.project_links = vec!["https://x.example/p".to_string()];
        fx.insert_progress(p);
    }

    fn links(urls: &[&str]) -> Option<Vec<String>> {
        Some(urls.iter().map(|u| u.to_string()).collect())
    }

    #[test]
    fn test_diff_links_counts_duplicates() {
        let old = vec!["a".to_string(), "b".to_string()];
        let new = vec!["b".to_string(), "c".to_string(), "c".to_string()];
        let (added, removed) = diff_links(&old, &new);
        assert_eq!(added, vec!["c", "c"]);
        assert_eq!(removed, vec!["a"]);
    }

    #[test]
    fn test_update_moves_not_started_to_in_progress() {
        let fx = Fixture::new();
        fx.curriculum();
        fx.add_progress("p-1", "stu-1", "c-1", ProgressStatus::NotStarted);
        let service = ProgressService::new(&fx.collab);

        let patch = ProgressPatch {
            completed_sessions: Some(3),
            ..ProgressPatch::default()
        };
        let outcome = service.update_progress("p-1", &patch, "admin-1").unwrap();
        assert_eq!(outcome.progress.status, ProgressStatus::InProgress);
        assert_eq!(outcome.auto_transition, Some(ProgressStatus::InProgress));
        assert!(!outcome.pass_check.can_pass);

        let logs = fx.store.list_tracking_logs("stu-1", "c-1").unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, TrackingAction::UpdateSessions);
        assert_eq!(logs[0].previous_value, json!(0));
        assert_eq!(logs[0].new_value, json!(3));
        assert_eq!(logs[0].performed_by, "admin-1");
    }

    #[test]
    fn test_update_meeting_pass_condition_requests_approval() {
        let fx = Fixture::new();
        fx.curriculum();
        fx.add_progress("p-1", "stu-1", "c-1", ProgressStatus::InProgress);
        let service = ProgressService::new(&fx.collab);

        let patch = ProgressPatch {
            completed_sessions: Some(10),
            projects_submitted: Some(2),
            project_links: links(&["https://behance.net/a", "http://dribbble.com/b"]),
        };
        let outcome = service.update_progress("p-1", &patch, "admin-1").unwrap();
        assert_eq!(outcome.progress.status, ProgressStatus::PendingApproval);
        assert_eq!(outcome.auto_transition, Some(ProgressStatus::PendingApproval));
        assert!(outcome.pass_check.can_pass);

        let actions: Vec<TrackingAction> = fx
            .store
            .list_tracking_logs("stu-1", "c-1")
            .unwrap()
            .into_iter()
            .map(|l| l.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                TrackingAction::UpdateSessions,
                TrackingAction::UpdateProjects,
                TrackingAction::AddProjectLink,
                TrackingAction::AddProjectLink,
            ]
        );
    }

    #[test]
    fn test_update_validation_failure_writes_nothing() {
        let fx = Fixture::new();
        fx.curriculum();
        fx.add_progress("p-1", "stu-1", "c-1", ProgressStatus::NotStarted);
        let service = ProgressService::new(&fx.collab);

        let patch = ProgressPatch {
            completed_sessions: Some(4),
            projects_submitted: Some(1),
            project_links: links(&["https://ok.example", "ftp://nope.example"]),
        };
        let err = service.update_progress("p-1", &patch, "admin-1").unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Validation {
                field: "project_links",
                ..
            }
        ));

        let unchanged = fx.store.get_progress("p-1").unwrap().unwrap();
        assert_eq!(unchanged.completed_sessions, 0);
        assert_eq!(unchanged.projects_submitted, 0);
        assert!(unchanged.project_links.is_empty());
        assert_eq!(unchanged.status, ProgressStatus::NotStarted);
        assert!(fx.store.list_tracking_logs("stu-1", "c-1").unwrap().is_empty());

        let over = ProgressPatch {
            completed_sessions: Some(11),
            ..ProgressPatch::default()
        };
        assert!(service.update_progress("p-1", &over, "admin-1").is_err());
    }

    #[test]
    fn test_update_does_not_move_rejected_record() {
        let fx = Fixture::new();
        fx.curriculum();
        fx.add_progress("p-1", "stu-1", "c-1", ProgressStatus::Rejected);
        let service = ProgressService::new(&fx.collab);

        let patch = ProgressPatch {
            completed_sessions: Some(10),
            projects_submitted: Some(2),
            project_links: links(&["https://a.example"]),
        };
        let outcome = service.update_progress("p-1", &patch, "admin-1").unwrap();
        assert_eq!(outcome.progress.status, ProgressStatus::Rejected);
        assert!(outcome.auto_transition.is_none());
        assert!(outcome.pass_check.can_pass);
    }

    #[test]
    fn test_link_add_and_remove_are_logged() {
        let fx = Fixture::new();
        fx.curriculum();
        fx.add_progress("p-1", "stu-1", "c-1", ProgressStatus::InProgress);
        let service = ProgressService::new(&fx.collab);

        service
            .add_project_link("p-1", "https://a.example", "admin-1")
            .unwrap();
        let outcome = service
            .remove_project_link("p-1", "https://a.example", "admin-1")
            .unwrap();
        assert!(outcome.progress.project_links.is_empty());

        let err = service
            .remove_project_link("p-1", "https://a.example", "admin-1")
            .unwrap_err();
        assert!(matches!(err, ProgressError::Validation { .. }));

        let actions: Vec<TrackingAction> = fx
            .store
            .list_tracking_logs("stu-1", "c-1")
            .unwrap()
            .into_iter()
            .map(|l| l.action)
            .collect();
        assert_eq!(
            actions,
            vec![TrackingAction::AddProjectLink, TrackingAction::RemoveProjectLink]
        );
    }

    #[test]
    fn test_approve_completes_and_unlocks_next_course() {
        let fx = Fixture::new();
        fx.curriculum();
        pending(&fx, "p-1", "c-1");
        let service = ProgressService::new(&fx.collab);

        let outcome = service.approve("p-1", "admin-1").unwrap();
        let progress = &outcome.progress;
        assert_eq!(progress.status, ProgressStatus::Completed);
        assert_eq!(progress.approved_by.as_deref(), Some("admin-1"));
        assert!(progress.completed_at.is_some());
        assert_eq!(progress.completed_at, progress.approved_at);
        assert!(outcome.dependency_failures.is_empty());
        assert!(matches!(
            outcome.unlock,
            Some(UnlockResult::CourseUnlocked { ref course, .. }) if course.id == "c-2"
        ));

        let logs = fx.store.list_tracking_logs("stu-1", "c-1").unwrap();
        assert_eq!(logs.last().unwrap().action, TrackingAction::Approve);

        let kinds: Vec<NotificationType> = fx
            .store
            .list_user_notifications("stu-1")
            .unwrap()
            .into_iter()
            .map(|n| n.notification_type)
            .collect();
        assert!(kinds.contains(&NotificationType::CourseCompleted));
        assert!(kinds.contains(&NotificationType::CourseUnlocked));

        assert_eq!(fx.store.list_recent_activity(10).unwrap().len(), 1);
    }

    #[test]
    fn test_approve_requires_pending_status() {
        let fx = Fixture::new();
        fx.curriculum();
        fx.add_progress("p-1", "stu-1", "c-1", ProgressStatus::InProgress);
        let service = ProgressService::new(&fx.collab);

        let err = service.approve("p-1", "admin-1").unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Precondition {
                current: ProgressStatus::InProgress,
                ..
            }
        ));

        let unchanged = fx.store.get_progress("p-1").unwrap().unwrap();
        assert_eq!(unchanged.status, ProgressStatus::InProgress);
        assert!(unchanged.approved_by.is_none());
        assert!(unchanged.completed_at.is_none());
        assert!(fx.store.list_tracking_logs("stu-1", "c-1").unwrap().is_empty());
    }

    #[test]
    fn test_second_approval_fails_without_side_effects() {
        let fx = Fixture::new();
        fx.curriculum();
        pending(&fx, "p-1", "c-1");
        let service = ProgressService::new(&fx.collab);

        service.approve("p-1", "admin-1").unwrap();
        let notifications_before = fx.store.list_user_notifications("stu-1").unwrap().len();

        let err = service.approve("p-1", "admin-2").unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Precondition {
                current: ProgressStatus::Completed,
                ..
            }
        ));

        let progress = fx.store.get_progress("p-1").unwrap().unwrap();
        assert_eq!(progress.approved_by.as_deref(), Some("admin-1"));
        assert_eq!(
            fx.store.list_user_notifications("stu-1").unwrap().len(),
            notifications_before
        );
    }

    #[test]
    fn test_approve_losing_race_reports_current_status() {
        let fx = Fixture::new().with_concurrent_approval("admin-2");
        fx.curriculum();
        pending(&fx, "p-1", "c-1");
        let service = ProgressService::new(&fx.collab);

        let err = service.approve("p-1", "admin-1").unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Precondition {
                current: ProgressStatus::Completed,
                ..
            }
        ));

        let progress = fx.store.get_progress("p-1").unwrap().unwrap();
        assert_eq!(progress.approved_by.as_deref(), Some("admin-2"));
        assert!(fx.store.list_tracking_logs("stu-1", "c-1").unwrap().is_empty());
        assert!(fx.store.list_user_notifications("stu-1").unwrap().is_empty());
        assert!(fx.store.list_recent_activity(10).unwrap().is_empty());
        assert!(
            fx.store
                .get_progress_by_student_and_course("stu-1", "c-2")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_reject_losing_race_reports_current_status() {
        let fx = Fixture::new().with_concurrent_approval("admin-2");
        fx.curriculum();
        pending(&fx, "p-1", "c-1");
        let service = ProgressService::new(&fx.collab);

        let err = service.reject("p-1", "thiếu dự án", "admin-1").unwrap_err();
        assert!(matches!(
            err,
            ProgressError::Precondition {
                current: ProgressStatus::Completed,
                ..
            }
        ));
        let progress = fx.store.get_progress("p-1").unwrap().unwrap();
        assert!(progress.rejection_reason.is_none());
        assert!(fx.store.list_user_notifications("stu-1").unwrap().is_empty());
    }

    #[test]
    fn test_out_of_order_approvals_open_next_semester() {
        let fx = Fixture::new();
        fx.curriculum();
        pending(&fx, "p-1", "c-1");
        pending(&fx, "p-2", "c-2");
        let service = ProgressService::new(&fx.collab);

        let later = service.approve("p-2", "admin-1").unwrap();
        assert!(matches!(later.unlock, Some(UnlockResult::SemesterInProgress)));

        let earlier = service.approve("p-1", "admin-1").unwrap();
        assert!(matches!(
            earlier.unlock,
            Some(UnlockResult::SemesterUnlocked { ref semester, .. }) if semester.id == "s-2"
        ));

        let next = fx
            .store
            .get_progress_by_student_and_course("stu-1", "c-3")
            .unwrap()
            .unwrap();
        assert_eq!(next.status, ProgressStatus::NotStarted);
        let student = fx.store.get_student("stu-1").unwrap().unwrap();
        assert_eq!(student.current_semester_id.as_deref(), Some("s-2"));
    }

    #[test]
    fn test_padded_links_are_stored_trimmed() {
        let fx = Fixture::new();
        fx.curriculum();
        fx.add_progress("p-1", "stu-1", "c-1", ProgressStatus::InProgress);
        let service = ProgressService::new(&fx.collab);

        service
            .add_project_link("p-1", "  https://x.example/p \t", "admin-1")
            .unwrap();
        let stored = fx.store.get_progress("p-1").unwrap().unwrap();
        assert_eq!(stored.project_links, vec!["https://x.example/p"]);

        let patch = ProgressPatch {
            project_links: links(&["https://x.example/p", " https://y.example/q"]),
            ..ProgressPatch::default()
        };
        let outcome = service.update_progress("p-1", &patch, "admin-1").unwrap();
        assert_eq!(
            outcome.progress.project_links,
            vec!["https://x.example/p", "https://y.example/q"]
        );

        service
            .remove_project_link("p-1", "https://x.example/p", "admin-1")
            .unwrap();
        let stored = fx.store.get_progress("p-1").unwrap().unwrap();
        assert_eq!(stored.project_links, vec!["https://y.example/q"]);

        let logs = fx.store.list_tracking_logs("stu-1", "c-1").unwrap();
        assert_eq!(logs[0].new_value, json!("https://x.example/p"));
    }

    #[test]
    fn test_approve_survives_side_effect_failures() {
        let fx = Fixture::new().with_failing_notifications().with_failing_activity();
        fx.curriculum();
        pending(&fx, "p-1", "c-1");
        let service = ProgressService::new(&fx.collab);

        let outcome = service.approve("p-1", "admin-1").unwrap();
        assert_eq!(outcome.progress.status, ProgressStatus::Completed);
        let steps: Vec<SideEffect> = outcome.dependency_failures.iter().map(|f| f.step).collect();
        assert_eq!(
            steps,
            vec![
                SideEffect::Notification,
                SideEffect::Notification,
                SideEffect::Activity
            ]
        );
        assert!(
            fx.store
                .get_progress_by_student_and_course("stu-1", "c-2")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_approve_survives_unlock_failure() {
        let fx = Fixture::new();
        fx.add_semester("s-1", 0);
        fx.add_course("c-1", "s-1", 0, 10, 2);
        // The student row is missing, so the semester unlock cannot move the pointer.
        fx.add_semester("s-2", 1);
        fx.store
            .connection()
            .execute_batch("PRAGMA foreign_keys = OFF")
            .unwrap();
        pending(&fx, "p-1", "c-1");
        let service = ProgressService::new(&fx.collab);

        let outcome = service.approve("p-1", "admin-1").unwrap();
        assert_eq!(outcome.progress.status, ProgressStatus::Completed);
        assert!(outcome.unlock.is_none());
        assert_eq!(outcome.dependency_failures[0].step, SideEffect::Unlock);
        assert!(fx.store.get_student("stu-1").unwrap().is_none());
    }

    #[test]
    fn test_reject_trims_reason() {
        let fx = Fixture::new();
        fx.curriculum();
        pending(&fx, "p-1", "c-1");
        let service = ProgressService::new(&fx.collab);

        let outcome = service
            .reject("p-1", "  Thiếu link dự án cuối  ", "admin-1")
            .unwrap();
        assert_eq!(outcome.progress.status, ProgressStatus::Rejected);
        assert_eq!(
            outcome.progress.rejection_reason.as_deref(),
            Some("Thiếu link dự án cuối")
        );
        assert!(outcome.progress.completed_at.is_none());

        let notification = &fx.store.list_user_notifications("stu-1").unwrap()[0];
        assert_eq!(notification.notification_type, NotificationType::CourseRejected);
        assert!(notification.message.contains("Thiếu link dự án cuối"));
    }

    #[test]
    fn test_reject_errors_are_distinct() {
        let fx = Fixture::new();
        fx.curriculum();
        pending(&fx, "p-1", "c-1");
        fx.add_progress("p-2", "stu-1", "c-2", ProgressStatus::InProgress);
        let service = ProgressService::new(&fx.collab);

        let blank = service.reject("p-1", "   ", "admin-1").unwrap_err();
        assert!(matches!(blank, ProgressError::Validation { field: "reason", .. }));
        assert_eq!(
            fx.store.get_progress("p-1").unwrap().unwrap().status,
            ProgressStatus::PendingApproval
        );

        let wrong_state = service.reject("p-2", "lý do", "admin-1").unwrap_err();
        assert!(matches!(wrong_state, ProgressError::Precondition { .. }));

        let missing = service.reject("p-404", "lý do", "admin-1").unwrap_err();
        assert!(matches!(
            missing,
            ProgressError::NotFound {
                entity: Entity::Progress,
                ..
            }
        ));
    }
}
