use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{ExistingRecords, Operation, Outcome, ProviderEndpoint, RecordMode};

pub mod pihole;
pub use pihole::PiholeClient;

/// A DNS provider holding the custom record tables for one endpoint.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    fn endpoint(&self) -> &ProviderEndpoint;

    /// Verify the endpoint is reachable and accepts our token.
    async fn probe(&self) -> Result<(), ProviderError>;

    /// Read the record table for `mode`.
    async fn fetch_existing(&self, mode: RecordMode) -> Result<ExistingRecords, ProviderError>;

    /// Apply one record change. Never fails: transport and decode errors
    /// are folded into an unsuccessful [`Outcome`].
    async fn mutate(
        &self,
        op: Operation,
        mode: RecordMode,
        domain: &str,
        target: &str,
    ) -> Outcome;
}
