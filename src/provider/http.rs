//! HTTP dereferencing with `ureq`.
//!
//! Every request has a timeout and a response size cap, so a provider
//! that never answers or streams without end cannot stall the batch.

use std::io::Read;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

use super::{Dereferencer, ProviderResponse, ProviderResult};

/// Accept header sent with every request; RDF first.
const ACCEPT: &str = "application/rdf+xml, text/turtle;q=0.9, application/n-triples;q=0.8, application/xml;q=0.5";

/// Synchronous linked-data client.
pub struct HttpDereferencer {
    agent: ureq::Agent,
    timeout_secs: u64,
    max_response_bytes: u64,
}

impl HttpDereferencer {
    pub fn new(config: &ProviderConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("authlink/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            timeout_secs: config.timeout_secs,
            max_response_bytes: config.max_response_bytes,
        }
    }

    fn transport_error(&self, url: &str, transport: ureq::Transport) -> ProviderError {
        let timed_out = std::error::Error::source(&transport)
            .and_then(|s| s.downcast_ref::<std::io::Error>())
            .is_some_and(|io| {
                matches!(
                    io.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                )
            });
        if timed_out {
            ProviderError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            ProviderError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            }
        }
    }
}

impl Dereferencer for HttpDereferencer {
    fn dereference(&self, url: &str) -> ProviderResult<ProviderResponse> {
        match self.agent.get(url).set("Accept", ACCEPT).call() {
            Ok(response) => {
                let status = response.status();
                let content_type = response.header("Content-Type").map(str::to_string);
                let mut body = Vec::new();
                response
                    .into_reader()
                    .take(self.max_response_bytes)
                    .read_to_end(&mut body)
                    .map_err(|e| ProviderError::Transport {
                        url: url.to_string(),
                        message: format!("failed to read body: {e}"),
                    })?;
                Ok(ProviderResponse {
                    status,
                    content_type,
                    body,
                })
            }
            Err(ureq::Error::Status(status, _)) => Err(ProviderError::Status {
                url: url.to_string(),
                status,
            }),
            Err(ureq::Error::Transport(transport)) => Err(self.transport_error(url, transport)),
        }
    }
}

impl std::fmt::Debug for HttpDereferencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDereferencer")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_is_a_transient_error() {
        let client = HttpDereferencer::new(&ProviderConfig {
            timeout_secs: 2,
            ..Default::default()
        });
        // Port 9 on localhost: connection refused, no network needed.
        let err = client.dereference("http://127.0.0.1:9/search").unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err}");
    }
}
