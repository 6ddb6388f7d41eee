use chrono::{DateTime, Utc};

/// Wall clock used for every `created_at` / `updated_at` the service stamps.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
