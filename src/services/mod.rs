pub mod qr;
pub mod report;
pub mod timeline;
pub mod tracking_service;
pub mod user_service;

pub use report::ReportExporter;
pub use tracking_service::TrackingService;
pub use user_service::UserService;
