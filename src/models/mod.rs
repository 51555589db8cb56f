pub mod dashboard;
pub mod report;
pub mod tracking;
pub mod user;
