//! Boundary to the on-chain bid contract.
//!
//! The contract is consumed as a black box: callers hand over parameters and
//! read back records. The only check performed before submission is the
//! wallet address format.

use std::{collections::HashMap, fmt, str::FromStr};

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

const ADDRESS_HEX_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("wallet address must start with 0x")]
    MissingPrefix,
    #[error("wallet address must have {expected} hex digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("wallet address contains a non-hex character")]
    InvalidCharacter,
}

/// EVM account address, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let raw = raw.trim();
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;
        if digits.len() != ADDRESS_HEX_LEN {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_HEX_LEN,
                actual: digits.len(),
            });
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidCharacter);
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BidId(pub u64);

/// Contract-side location: fixed-point coordinates plus a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidLocation {
    pub latitude_e6: i64,
    pub longitude_e6: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidCargo {
    pub description: String,
    pub weight_kg: u64,
}

/// Unix-second timestamps for pickup, delivery and bid expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidSchedule {
    pub pickup_at: u64,
    pub deliver_by: u64,
    pub expires_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidParams {
    pub shipment_ref: String,
    /// Price in the chain's smallest unit.
    pub price: u64,
    pub origin: BidLocation,
    pub destination: BidLocation,
    pub cargo: BidCargo,
    pub schedule: BidSchedule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRecord {
    pub id: BidId,
    pub shipper: WalletAddress,
    pub params: BidParams,
}

#[async_trait]
pub trait BidLedger: Send + Sync {
    async fn create_bid(&self, shipper: &WalletAddress, params: BidParams)
        -> anyhow::Result<BidId>;
    async fn get_bid(&self, id: BidId) -> anyhow::Result<BidRecord>;
    async fn shipper_bids(&self, shipper: &WalletAddress) -> anyhow::Result<Vec<BidId>>;
}

pub struct MissingBidLedger;

#[async_trait]
impl BidLedger for MissingBidLedger {
    async fn create_bid(
        &self,
        _shipper: &WalletAddress,
        _params: BidParams,
    ) -> anyhow::Result<BidId> {
        Err(anyhow!("bid ledger is unavailable"))
    }

    async fn get_bid(&self, _id: BidId) -> anyhow::Result<BidRecord> {
        Err(anyhow!("bid ledger is unavailable"))
    }

    async fn shipper_bids(&self, _shipper: &WalletAddress) -> anyhow::Result<Vec<BidId>> {
        Err(anyhow!("bid ledger is unavailable"))
    }
}

#[derive(Default)]
struct LedgerState {
    next_id: u64,
    bids: HashMap<BidId, BidRecord>,
    by_shipper: HashMap<WalletAddress, Vec<BidId>>,
}

/// Process-local ledger used for development and tests.
#[derive(Default)]
pub struct InMemoryBidLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryBidLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BidLedger for InMemoryBidLedger {
    async fn create_bid(
        &self,
        shipper: &WalletAddress,
        params: BidParams,
    ) -> anyhow::Result<BidId> {
        let mut state = self.state.write().await;
        let id = BidId(state.next_id);
        state.next_id += 1;
        state.bids.insert(
            id,
            BidRecord {
                id,
                shipper: shipper.clone(),
                params,
            },
        );
        state.by_shipper.entry(shipper.clone()).or_default().push(id);
        Ok(id)
    }

    async fn get_bid(&self, id: BidId) -> anyhow::Result<BidRecord> {
        let state = self.state.read().await;
        state
            .bids
            .get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("bid {} does not exist", id.0))
    }

    async fn shipper_bids(&self, shipper: &WalletAddress) -> anyhow::Result<Vec<BidId>> {
        let state = self.state.read().await;
        Ok(state.by_shipper.get(shipper).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
