pub mod announcement;
pub mod dashboard;
pub mod document;
pub mod leave_request;
pub mod navigation;
pub mod user;

#[cfg(test)]
pub(crate) mod testkit;
