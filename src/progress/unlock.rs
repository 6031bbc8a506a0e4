use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::notify::{self, NotificationEmitter};
use super::{
    AuditLogger, Collaborators, DependencyFailure, Entity, ProgressError, Result,
};
use crate::error::Error;
use crate::store::{CourseStore, ProgressStore, SemesterStore, StudentStore};
use crate::types::{
    Course, ProgressStatus, Semester, StatusUpdate, StudentProgress, TrackingAction,
};

/// Returns the course with the smallest `order` strictly greater than `current_order`.
pub fn find_next_course_in_semester(courses: &[Course], current_order: i64) -> Option<&Course> {
    courses
        .iter()
        .filter(|c| c.order > current_order)
        .min_by_key(|c| c.order)
}

/// Returns the semester with the smallest `order` strictly greater than `current_order`.
pub fn find_next_semester(semesters: &[Semester], current_order: i64) -> Option<&Semester> {
    semesters
        .iter()
        .filter(|s| s.order > current_order)
        .min_by_key(|s| s.order)
}

/// True when every course has a completed progress record. An empty course
/// list is never complete.
pub fn are_all_courses_completed(progress: &[StudentProgress], courses: &[Course]) -> bool {
    if courses.is_empty() {
        return false;
    }
    courses.iter().all(|course| {
        progress
            .iter()
            .any(|p| p.course_id == course.id && p.status == ProgressStatus::Completed)
    })
}

/// Result of making one course available to a student.
#[derive(Debug, Clone, Serialize)]
pub struct CourseUnlock {
    pub progress: StudentProgress,
    /// False when the record already existed outside `locked`.
    pub newly_unlocked: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependency_failures: Vec<DependencyFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnlockResult {
    CourseUnlocked {
        course: Course,
        progress: StudentProgress,
        newly_unlocked: bool,
    },
    SemesterUnlocked {
        semester: Semester,
        #[serde(skip_serializing_if = "Option::is_none")]
        first_course: Option<Course>,
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<StudentProgress>,
        /// The semester needs a major the student has not chosen yet, so its
        /// first course stays locked.
        awaiting_major_selection: bool,
    },
    /// The completed course was last by order but siblings are still open.
    SemesterInProgress,
    /// No later semester exists.
    CurriculumCompleted,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnlockOutcome {
    pub result: UnlockResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependency_failures: Vec<DependencyFailure>,
}

/// Opens the next course or semester once a course is completed.
#[derive(Clone)]
pub struct UnlockEngine {
    progress: Arc<dyn ProgressStore>,
    courses: Arc<dyn CourseStore>,
    semesters: Arc<dyn SemesterStore>,
    students: Arc<dyn StudentStore>,
    audit: AuditLogger,
    notifier: NotificationEmitter,
}

impl UnlockEngine {
    pub fn new(collab: &Collaborators) -> Self {
        Self {
            progress: collab.progress.clone(),
            courses: collab.courses.clone(),
            semesters: collab.semesters.clone(),
            students: collab.students.clone(),
            audit: AuditLogger::new(collab.audit.clone()),
            notifier: NotificationEmitter::new(collab.notifications.clone()),
        }
    }

    fn active_courses(&self, semester_id: &str) -> Result<Vec<Course>> {
        let mut courses = self.courses.list_courses_by_semester(semester_id)?;
        courses.retain(|c| c.is_active);
        Ok(courses)
    }

    /// Makes `course_id` available to the student. Idempotent: a record that
    /// exists outside `locked` is returned untouched.
    pub fn unlock_course_for_student(
        &self,
        student_id: &str,
        course_id: &str,
        admin_id: &str,
    ) -> Result<CourseUnlock> {
        let existing = self
            .progress
            .get_progress_by_student_and_course(student_id, course_id)?;

        let previous = existing.as_ref().map(|p| p.status);
        let progress = match existing {
            Some(progress) if progress.status != ProgressStatus::Locked => {
                return Ok(CourseUnlock {
                    progress,
                    newly_unlocked: false,
                    dependency_failures: Vec::new(),
                });
            }
            Some(progress) => {
                let update = StatusUpdate::to(ProgressStatus::NotStarted);
                match self
                    .progress
                    .transition_status(&progress.id, ProgressStatus::Locked, &update)?
                {
                    Some(progress) => progress,
                    // Someone else unlocked it first.
                    None => return self.existing_unlock(student_id, course_id),
                }
            }
            None => {
                let now = Utc::now();
                let progress = StudentProgress {
                    id: Uuid::new_v4().to_string(),
                    student_id: student_id.to_string(),
                    course_id: course_id.to_string(),
                    completed_sessions: 0,
                    projects_submitted: 0,
                    project_links: Vec::new(),
                    status: ProgressStatus::NotStarted,
                    completed_at: None,
                    approved_at: None,
                    approved_by: None,
                    rejection_reason: None,
                    created_at: now,
                    updated_at: now,
                };
                match self.progress.create_progress(&progress) {
                    Ok(()) => progress,
                    Err(Error::AlreadyExists) => {
                        return self.existing_unlock(student_id, course_id);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        tracing::info!(
            "Unlocked course {} for student {} (progress {})",
            course_id,
            student_id,
            progress.id
        );

        let mut dependency_failures = Vec::new();
        if let Err(failure) = self.audit.record(
            student_id,
            course_id,
            TrackingAction::UnlockCourse,
            json!(previous),
            json!(ProgressStatus::NotStarted),
            admin_id,
        ) {
            dependency_failures.push(failure);
        }

        Ok(CourseUnlock {
            progress,
            newly_unlocked: true,
            dependency_failures,
        })
    }

    fn existing_unlock(&self, student_id: &str, course_id: &str) -> Result<CourseUnlock> {
        let progress = self
            .progress
            .get_progress_by_student_and_course(student_id, course_id)?
            .ok_or_else(|| ProgressError::not_found(Entity::Progress, course_id))?;
        Ok(CourseUnlock {
            progress,
            newly_unlocked: false,
            dependency_failures: Vec::new(),
        })
    }

    /// Admin-initiated unlock of a specific course, with the student notified
    /// when the course actually opens.
    pub fn unlock_course(
        &self,
        student_id: &str,
        course_id: &str,
        admin_id: &str,
    ) -> Result<CourseUnlock> {
        let course = self
            .courses
            .get_course(course_id)?
            .ok_or_else(|| ProgressError::not_found(Entity::Course, course_id))?;
        self.students
            .get_student(student_id)?
            .ok_or_else(|| ProgressError::not_found(Entity::Student, student_id))?;

        let mut unlock = self.unlock_course_for_student(student_id, &course.id, admin_id)?;
        if unlock.newly_unlocked {
            if let Err(failure) = self
                .notifier
                .dispatch(notify::course_unlocked(student_id, &course))
            {
                unlock.dependency_failures.push(failure);
            }
        }
        Ok(unlock)
    }

    /// Advances the student after `completed_course_id` is completed: the next
    /// course of the same semester, or else the next semester once every
    /// course of the current one is completed.
    pub fn unlock_next_course(
        &self,
        student_id: &str,
        completed_course_id: &str,
        admin_id: &str,
    ) -> Result<UnlockOutcome> {
        let course = self
            .courses
            .get_course(completed_course_id)?
            .ok_or_else(|| ProgressError::not_found(Entity::Course, completed_course_id))?;
        let siblings = self.active_courses(&course.semester_id)?;

        let next_course = match find_next_course_in_semester(&siblings, course.order) {
            Some(next) => {
                let unlock = self.unlock_course_for_student(student_id, &next.id, admin_id)?;
                let mut dependency_failures = unlock.dependency_failures;
                if unlock.newly_unlocked {
                    if let Err(failure) = self
                        .notifier
                        .dispatch(notify::course_unlocked(student_id, next))
                    {
                        dependency_failures.push(failure);
                    }
                }
                let outcome = UnlockOutcome {
                    result: UnlockResult::CourseUnlocked {
                        course: next.clone(),
                        progress: unlock.progress,
                        newly_unlocked: unlock.newly_unlocked,
                    },
                    dependency_failures,
                };
                // A later course opened by hand may already be completed, in
                // which case this approval can be the one that closes the semester.
                if unlock.newly_unlocked {
                    return Ok(outcome);
                }
                Some(outcome)
            }
            None => None,
        };

        let progress = self.progress.list_student_progress(student_id)?;
        if !are_all_courses_completed(&progress, &siblings) {
            return Ok(next_course.unwrap_or(UnlockOutcome {
                result: UnlockResult::SemesterInProgress,
                dependency_failures: Vec::new(),
            }));
        }

        let mut outcome = self.unlock_next_semester(student_id, &course, admin_id)?;
        if let Some(skipped) = next_course {
            outcome.dependency_failures.extend(skipped.dependency_failures);
        }
        Ok(outcome)
    }

    fn unlock_next_semester(
        &self,
        student_id: &str,
        completed_course: &Course,
        admin_id: &str,
    ) -> Result<UnlockOutcome> {
        let current_semester_id = completed_course.semester_id.as_str();
        let current = self
            .semesters
            .get_semester(current_semester_id)?
            .ok_or_else(|| ProgressError::not_found(Entity::Semester, current_semester_id))?;
        let mut semesters = self.semesters.list_semesters_sorted()?;
        semesters.retain(|s| s.is_active);

        let Some(next) = find_next_semester(&semesters, current.order).cloned() else {
            tracing::info!("Student {} completed the curriculum", student_id);
            return Ok(UnlockOutcome {
                result: UnlockResult::CurriculumCompleted,
                dependency_failures: Vec::new(),
            });
        };

        let student = self
            .students
            .get_student(student_id)?
            .ok_or_else(|| ProgressError::not_found(Entity::Student, student_id))?;
        self.students.update_current_semester(student_id, &next.id)?;

        let first_course = self.active_courses(&next.id)?.into_iter().next();
        let awaiting_major_selection = next.requires_major_selection && student.major_id.is_none();

        let mut dependency_failures = Vec::new();
        let mut progress = None;
        if let Some(course) = first_course.as_ref().filter(|_| !awaiting_major_selection) {
            let unlock = self.unlock_course_for_student(student_id, &course.id, admin_id)?;
            dependency_failures.extend(unlock.dependency_failures);
            progress = Some(unlock.progress);
        }

        tracing::info!(
            "Unlocked semester {} for student {} (from {})",
            next.id,
            student_id,
            current.id
        );

        let log_course = first_course
            .as_ref()
            .map_or(completed_course.id.as_str(), |c| c.id.as_str());
        if let Err(failure) = self.audit.record(
            student_id,
            log_course,
            TrackingAction::UnlockSemester,
            json!(current.id),
            json!(next.id),
            admin_id,
        ) {
            dependency_failures.push(failure);
        }

        if let Err(failure) = self.notifier.dispatch(notify::semester_unlocked(
            student_id,
            &next,
            first_course.as_ref(),
        )) {
            dependency_failures.push(failure);
        }

        Ok(UnlockOutcome {
            result: UnlockResult::SemesterUnlocked {
                semester: next,
                first_course,
                progress,
                awaiting_major_selection,
            },
            dependency_failures,
        })
    }
}
