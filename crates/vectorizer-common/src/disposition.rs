//! The fatal/retryable/contained vocabulary shared by every crate that
//! classifies a failure (§7, §9 "transient vs fatal boundary").

/// How far a failure's blast radius extends, and therefore how the
/// Worker run loop (§4.E) should react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Stop processing this vectorizer; record and surface the error.
    Fatal,
    /// Leave the whole batch's PKs in the queue with backoff; try again later.
    RetryablePerBatch,
    /// Only the offending chunk/row is affected; the rest of the batch proceeds.
    ContainedPerChunk,
}

/// Classify an HTTP status code from a provider response into a
/// [`Disposition`], per §9's resolution of the transient/fatal open question.
#[must_use]
pub fn classify_http_status(status: u16) -> Disposition {
    match status {
        401 | 403 => Disposition::Fatal,
        408 | 429 => Disposition::RetryablePerBatch,
        500..=599 => Disposition::RetryablePerBatch,
        _ => Disposition::ContainedPerChunk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_fatal() {
        assert_eq!(classify_http_status(401), Disposition::Fatal);
        assert_eq!(classify_http_status(403), Disposition::Fatal);
    }

    #[test]
    fn rate_limit_and_server_errors_are_retryable() {
        assert_eq!(classify_http_status(429), Disposition::RetryablePerBatch);
        assert_eq!(classify_http_status(408), Disposition::RetryablePerBatch);
        assert_eq!(classify_http_status(500), Disposition::RetryablePerBatch);
        assert_eq!(classify_http_status(503), Disposition::RetryablePerBatch);
    }

    #[test]
    fn everything_else_is_contained() {
        assert_eq!(classify_http_status(200), Disposition::ContainedPerChunk);
        assert_eq!(classify_http_status(422), Disposition::ContainedPerChunk);
    }
}
