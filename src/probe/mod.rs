//! HTTP status probes run after deployment phases.
//!
//! The verifier issues a single GET per call and never follows redirects, so
//! an http→https redirect is observed as 301 rather than as the final page.
//! There is no retry; a failed probe fails its phase.

use std::fmt;
use std::time::Duration;

use reqwest::redirect::Policy;
use tracing::{debug, warn};

use crate::domain::PhaseResult;
use crate::error::{PhaseError, Result};

/// Status codes a probe may expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectedStatus {
    Ok,
    MovedPermanently,
    Found,
}

impl ExpectedStatus {
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::MovedPermanently => 301,
            Self::Found => 302,
        }
    }
}

impl TryFrom<u16> for ExpectedStatus {
    type Error = u16;

    fn try_from(code: u16) -> std::result::Result<Self, Self::Error> {
        match code {
            200 => Ok(Self::Ok),
            301 => Ok(Self::MovedPermanently),
            302 => Ok(Self::Found),
            other => Err(other),
        }
    }
}

impl fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Issues HTTP probes and compares the observed status with the expected one.
#[derive(Debug, Clone)]
pub struct HealthVerifier {
    client: reqwest::Client,
}

impl HealthVerifier {
    /// Build a verifier whose requests give up after `timeout`.
    #[allow(clippy::result_large_err)]
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(timeout)
            .user_agent(concat!("sitedeploy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Fetch `url` and return the observed status, or a probe error when the
    /// status differs from `expected` or the request fails.
    pub async fn check(
        &self,
        url: &str,
        expected: ExpectedStatus,
    ) -> std::result::Result<u16, PhaseError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(url, error = %e, "Probe request failed");
            PhaseError::Probe {
                url: url.to_string(),
                expected: expected.code(),
                observed: format!("request failed: {e}"),
            }
        })?;

        let observed = response.status().as_u16();
        debug!(url, observed, expected = expected.code(), "Probe answered");

        if observed == expected.code() {
            Ok(observed)
        } else {
            Err(PhaseError::Probe {
                url: url.to_string(),
                expected: expected.code(),
                observed: format!("got {observed}"),
            })
        }
    }

    /// Probe `url` and report the outcome as a [`PhaseResult`] named `phase`.
    /// `success` is exactly `observed == expected`.
    pub async fn verify(&self, phase: &str, url: &str, expected: ExpectedStatus) -> PhaseResult {
        match self.check(url, expected).await {
            Ok(observed) => PhaseResult::succeeded(phase, format!("HTTP {observed}")),
            Err(err) => PhaseResult::failed(phase, err),
        }
    }
}
