use std::time::Duration;

use crate::error::{BoxdError, BoxdResult};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) boxd-wrapped/0.1";

/// A completed HTTP exchange. Error statuses (4xx/5xx) are responses, not
/// transport errors, so callers can distinguish "user not found" from
/// "network down".
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The single network seam of the core. Everything that talks to the source
/// site goes through this trait, so tests can substitute a stub.
pub trait Fetch: Send + Sync {
    fn get(&self, url: &str) -> BoxdResult<FetchResponse>;
}

pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> BoxdResult<FetchResponse> {
        match self.agent.get(url).call() {
            Ok(mut res) => {
                let status = res.status().as_u16();
                let content_type = res
                    .headers()
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                let body = res
                    .body_mut()
                    .read_to_vec()
                    .map_err(|e| BoxdError::Transport(e.to_string()))?;
                Ok(FetchResponse {
                    status,
                    content_type,
                    body,
                })
            }
            Err(ureq::Error::StatusCode(code)) => Ok(FetchResponse {
                status: code,
                content_type: String::new(),
                body: Vec::new(),
            }),
            Err(e) => Err(BoxdError::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_status_range() {
        let res = FetchResponse {
            status: 200,
            content_type: "text/html".to_string(),
            body: b"ok".to_vec(),
        };
        assert!(res.is_success());
        assert_eq!(res.text(), "ok");

        let res = FetchResponse {
            status: 404,
            content_type: String::new(),
            body: Vec::new(),
        };
        assert!(!res.is_success());
    }
}
