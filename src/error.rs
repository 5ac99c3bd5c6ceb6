use thiserror::Error;

/// Failures that reach callers of the scraping/rendering core.
///
/// Poster failures never appear here: the resolver always degrades to a
/// placeholder. An exhausted diary pagination is a normal return value,
/// not an error.
#[derive(Debug, Error)]
pub enum BoxdError {
    #[error("user '{0}' not found")]
    UserNotFound(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("nothing to render: {0}")]
    NothingToRender(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

pub type BoxdResult<T> = Result<T, BoxdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(
            BoxdError::UserNotFound("ghost".to_string()).to_string(),
            "user 'ghost' not found"
        );
        assert_eq!(
            BoxdError::Transport("timed out".to_string()).to_string(),
            "transport failure: timed out"
        );
        assert_eq!(
            BoxdError::NothingToRender("no entries for July 2024".to_string()).to_string(),
            "nothing to render: no entries for July 2024"
        );
        assert_eq!(
            BoxdError::InvalidRequest("month 13 out of range 1..=12".to_string()).to_string(),
            "invalid request: month 13 out of range 1..=12"
        );
    }
}
