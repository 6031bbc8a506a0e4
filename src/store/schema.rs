pub const SCHEMA: &str = r#"
-- Semesters define the outer unlock sequence
CREATE TABLE IF NOT EXISTS semesters (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    requires_major_selection INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Courses are unlocked in sort_order within their semester
CREATE TABLE IF NOT EXISTS courses (
    id TEXT PRIMARY KEY,
    semester_id TEXT NOT NULL REFERENCES semesters(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    sort_order INTEGER NOT NULL DEFAULT 0,
    required_sessions INTEGER NOT NULL DEFAULT 0 CHECK (required_sessions >= 0),
    required_projects INTEGER NOT NULL DEFAULT 0 CHECK (required_projects >= 0),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS students (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT,
    major_id TEXT,
    current_semester_id TEXT REFERENCES semesters(id) ON DELETE SET NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- One progress record per student x course
CREATE TABLE IF NOT EXISTS student_progress (
    id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
    completed_sessions INTEGER NOT NULL DEFAULT 0,
    projects_submitted INTEGER NOT NULL DEFAULT 0,
    project_links TEXT NOT NULL DEFAULT '[]',  -- JSON array of URLs
    status TEXT NOT NULL,
    completed_at TEXT,
    approved_at TEXT,
    approved_by TEXT,
    rejection_reason TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    UNIQUE(student_id, course_id)
);

-- Append-only audit trail; rows are never updated
CREATE TABLE IF NOT EXISTS tracking_logs (
    id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL,
    course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
    action TEXT NOT NULL,
    previous_value TEXT NOT NULL,  -- JSON
    new_value TEXT NOT NULL,       -- JSON
    performed_by TEXT NOT NULL,
    performed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    type TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',  -- JSON object of strings
    is_read INTEGER NOT NULL DEFAULT 0,
    read_at TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS activities (
    id TEXT PRIMARY KEY,
    actor_id TEXT NOT NULL,
    action TEXT NOT NULL,
    target_id TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_courses_semester ON courses(semester_id, sort_order);
CREATE INDEX IF NOT EXISTS idx_semesters_order ON semesters(sort_order);
CREATE INDEX IF NOT EXISTS idx_progress_student ON student_progress(student_id);
CREATE INDEX IF NOT EXISTS idx_tracking_logs_target ON tracking_logs(student_id, course_id);
CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
CREATE INDEX IF NOT EXISTS idx_activities_created ON activities(created_at);
"#;
