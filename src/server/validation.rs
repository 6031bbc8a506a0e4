use crate::server::response::ApiError;

const MAX_NAME_LEN: usize = 200;

fn validate_name(name: &str, label: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("{label} không được để trống"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("{label} không được vượt quá {MAX_NAME_LEN} ký tự"));
    }
    Ok(name.to_string())
}

pub fn validate_semester_name(name: &str) -> Result<String, ApiError> {
    validate_name(name, "Tên học kỳ").map_err(ApiError::bad_request)
}

pub fn validate_course_title(title: &str) -> Result<String, ApiError> {
    validate_name(title, "Tên khóa học").map_err(ApiError::bad_request)
}

pub fn validate_student_name(name: &str) -> Result<String, ApiError> {
    validate_name(name, "Tên học viên").map_err(ApiError::bad_request)
}

/// Requirement thresholds and explicit orders are non-negative.
pub fn validate_non_negative(value: i64, label: &str) -> Result<i64, ApiError> {
    if value < 0 {
        return Err(ApiError::bad_request(format!("{label} không được âm")));
    }
    Ok(value)
}
