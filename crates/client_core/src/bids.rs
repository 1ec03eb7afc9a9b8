use std::sync::Arc;

use bid_ledger::{AddressError, BidId, BidLedger, BidParams, BidRecord, WalletAddress};
use futures::future::try_join_all;
use thiserror::Error;
use tracing::{info, warn};

pub const FETCH_BIDS_FAILED: &str = "Failed to fetch bids. Please check the wallet address.";
pub const SUBMIT_BID_FAILED: &str = "Failed to submit bid.";

#[derive(Debug, Error)]
pub enum BidError {
    #[error("invalid wallet address: {0}")]
    Address(#[from] AddressError),
    /// Contract failures are not decoded; only a generic message is kept.
    #[error("{0}")]
    Ledger(&'static str),
}

pub struct BidDirectory {
    ledger: Arc<dyn BidLedger>,
}

impl BidDirectory {
    pub fn new(ledger: Arc<dyn BidLedger>) -> Self {
        Self { ledger }
    }

    /// Every bid recorded for `shipper`, in ledger order.
    pub async fn bids_for_shipper(&self, shipper: &str) -> Result<Vec<BidRecord>, BidError> {
        let shipper = WalletAddress::parse(shipper)?;
        let ids = self.ledger.shipper_bids(&shipper).await.map_err(|err| {
            warn!("bids: listing bid ids for {shipper} failed: {err:#}");
            BidError::Ledger(FETCH_BIDS_FAILED)
        })?;

        let records = try_join_all(ids.into_iter().map(|id| self.ledger.get_bid(id)))
            .await
            .map_err(|err| {
                warn!("bids: loading bid details for {shipper} failed: {err:#}");
                BidError::Ledger(FETCH_BIDS_FAILED)
            })?;
        Ok(records)
    }

    pub async fn submit_bid(&self, shipper: &str, params: BidParams) -> Result<BidId, BidError> {
        let shipper = WalletAddress::parse(shipper)?;
        let shipment_ref = params.shipment_ref.clone();
        let id = self
            .ledger
            .create_bid(&shipper, params)
            .await
            .map_err(|err| {
                warn!("bids: submitting bid for shipment {shipment_ref} failed: {err:#}");
                BidError::Ledger(SUBMIT_BID_FAILED)
            })?;
        info!("bids: recorded bid {} for shipment {shipment_ref}", id.0);
        Ok(id)
    }
}

#[cfg(test)]
#[path = "tests/bids_tests.rs"]
mod tests;
