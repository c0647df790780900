//! Process-wide state shared by every request handler.

use std::sync::Arc;

use crate::client::GatewayClient;
use crate::config::Settings;
use crate::resilience::RetryPolicy;
use crate::teams::{InMemoryTeamRepository, TeamRepository};

/// One gateway client, one team store and the retry policy for reads.
pub struct AppContext {
    pub settings: Settings,
    pub client: Arc<GatewayClient>,
    pub teams: Arc<dyn TeamRepository>,
    pub retry: RetryPolicy,
}

impl AppContext {
    pub fn new(
        settings: Settings,
        client: Arc<GatewayClient>,
        teams: Arc<dyn TeamRepository>,
        retry: RetryPolicy,
    ) -> Self {
        Self { settings, client, teams, retry }
    }

    /// Closed client and empty team store built from `settings`.
    pub fn from_settings(settings: Settings) -> Self {
        let client = Arc::new(GatewayClient::from_settings(&settings));
        let retry = RetryPolicy::from_settings(&settings);
        Self::new(settings, client, Arc::new(InMemoryTeamRepository::new()), retry)
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("organization", &self.client.organization())
            .field("connected", &self.client.is_connected())
            .field("retry", &self.retry)
            .finish()
    }
}
