use std::time::Duration;

/// Applied to each candidate address separately, not to the whole attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);
