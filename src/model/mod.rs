pub mod announcement;
pub mod document;
pub mod leave_request;
pub mod role;
pub mod user;
