//! Provider data structure passed to resources and data sources

use crate::api::Client;
use tfplug::Backoff;

#[derive(Clone)]
pub struct JamfProProviderData {
    pub client: Client,
    /// Delay between retried attempts of one operation
    pub backoff: Backoff,
}

impl std::fmt::Debug for JamfProProviderData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JamfProProviderData")
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl JamfProProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}
