/// Application name
pub const APP_NAME: &str = "StudyBuddy";

/// Minimum allowed review rating (inclusive)
pub const MIN_RATING: i64 = 1;

/// Maximum allowed review rating (inclusive)
pub const MAX_RATING: i64 = 5;

/// Number of reviews per page in the reviews listing
pub const REVIEWS_PAGE_SIZE: usize = 12;

/// Number of profiles per page in the profile browse/search listing
pub const PROFILES_PAGE_SIZE: usize = 10;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;
