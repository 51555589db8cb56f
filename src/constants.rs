// Application Constants
// Centralized constants to avoid magic numbers

/// Default server configuration
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 4410;
pub const DEFAULT_PUBLIC_ORIGIN: &str = "http://localhost:4410";

/// Simulated backend defaults
pub const DEFAULT_SIMULATED_LATENCY_MS: u64 = 1500;
pub const DEFAULT_SIMULATED_FAILURE_RATE: f64 = 0.0;

/// Rate limiting configuration for PDF/QR exports
pub const DEFAULT_EXPORT_RATE_LIMIT_PER_MINUTE: u32 = 30;

/// Search query limits
pub const MAX_SEARCH_QUERY_LENGTH: usize = 100;

/// Dashboard feed sizes
pub const RECENT_ITEMS_LIMIT: usize = 5;
pub const POPULAR_QUERIES_LIMIT: usize = 5;

/// QR rendering
pub const DEFAULT_QR_SIZE_PX: u32 = 256;
pub const MIN_QR_SIZE_PX: u32 = 64;
pub const MAX_QR_SIZE_PX: u32 = 2048;
pub const QR_TRACKING_PATH: &str = "/track-product";

/// Header a client uses to identify its search session
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Report titles and literals
pub const TRACKING_REPORT_TITLE: &str = "Supply Chain Report";
pub const PENDING_LABEL: &str = "Pending";
pub const NO_DATA_LABEL: &str = "No data available for export";

/// Bounds on per-client search sessions and analytics counters
pub const MAX_SEARCH_SESSIONS: usize = 10_000;
pub const SEARCH_SESSION_IDLE_SECS: u64 = 30 * 60;
pub const MAX_TRACKED_QUERIES: usize = 1_000;
