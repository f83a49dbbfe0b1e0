//! Server candidate and client identity models

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// A server a session can measure against
///
/// Candidates are produced fresh for every selection and never cached across
/// sessions, so `latency` always reflects the probe made for this session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerCandidate {
    /// Provider-assigned server id
    pub id: String,
    /// Organisation hosting the server
    pub sponsor: String,
    /// City label
    pub name: String,
    /// Country label
    pub country: String,
    /// Geographic distance from the client (km)
    #[serde(alias = "d")]
    pub distance: f64,
    /// Network address (`host:port`)
    pub host: String,
    /// Probe latency in milliseconds, if the server was probed and reachable
    #[serde(default)]
    pub latency: Option<f64>,
}

impl ServerCandidate {
    /// "City, Country" label
    pub fn location(&self) -> String {
        match (self.name.is_empty(), self.country.is_empty()) {
            (false, false) => format!("{}, {}", self.name, self.country),
            (false, true) => self.name.clone(),
            (true, false) => self.country.clone(),
            (true, true) => "Unknown".to_string(),
        }
    }

    /// Copy of this candidate carrying a probe latency
    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency = Some(latency_ms);
        self
    }
}

/// Network identity of the measuring client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip: String,
    pub isp: String,
    pub country: String,
}

/// Configured server endpoint used by the HTTP measurement provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub id: String,
    pub sponsor: String,
    /// City label
    pub name: String,
    pub country: String,
    /// Distance from the client in kilometres
    pub distance_km: f64,
    /// Base URL exposing `__down` and `__up`
    pub url: String,
}

impl ServerEndpoint {
    /// `host:port` derived from the base URL
    pub fn host(&self) -> Result<String> {
        let parsed = url::Url::parse(&self.url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| AppError::config(format!("Server URL '{}' has no host", self.url)))?;
        let port = parsed
            .port_or_known_default()
            .ok_or_else(|| AppError::config(format!("Server URL '{}' has no port", self.url)))?;
        Ok(format!("{}:{}", host, port))
    }

    /// Build an unprobed candidate from this endpoint
    pub fn to_candidate(&self) -> Result<ServerCandidate> {
        Ok(ServerCandidate {
            id: self.id.clone(),
            sponsor: self.sponsor.clone(),
            name: self.name.clone(),
            country: self.country.clone(),
            distance: self.distance_km,
            host: self.host()?,
            latency: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(url: &str) -> ServerEndpoint {
        ServerEndpoint {
            id: "1".to_string(),
            sponsor: "Cloudflare".to_string(),
            name: "Frankfurt".to_string(),
            country: "Germany".to_string(),
            distance_km: 12.5,
            url: url.to_string(),
        }
    }

    #[test]
    fn test_endpoint_host_uses_default_port() {
        assert_eq!(endpoint("https://speed.example.com").host().unwrap(), "speed.example.com:443");
        assert_eq!(endpoint("http://127.0.0.1:8080/").host().unwrap(), "127.0.0.1:8080");
    }

    #[test]
    fn test_endpoint_to_candidate() {
        let candidate = endpoint("https://speed.example.com").to_candidate().unwrap();
        assert_eq!(candidate.id, "1");
        assert_eq!(candidate.distance, 12.5);
        assert_eq!(candidate.latency, None);
        assert_eq!(candidate.location(), "Frankfurt, Germany");
    }

    #[test]
    fn test_invalid_endpoint_url() {
        assert!(endpoint("not a url").host().is_err());
    }

    #[test]
    fn test_candidate_accepts_short_distance_key() {
        let json = r#"{"id":"7","sponsor":"ISP","name":"Oslo","country":"Norway","d":3.2,"host":"oslo:8080"}"#;
        let candidate: ServerCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.distance, 3.2);
        assert!(candidate.latency.is_none());
    }
}
