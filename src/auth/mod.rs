mod middleware;

pub use middleware::{ADMIN_ID_HEADER, RequireAdmin};
