use serde::{Deserialize, Serialize};

use crate::{
    domain::{Role, Shipment, TransportMode},
    error::{DraftError, DraftField, FieldError},
};

/// Success envelope shared by every backend endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedShipment {
    pub shipment: Shipment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub country: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateShipmentRequest {
    pub origin_code: String,
    pub destination_code: String,
    pub cargo_load: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletLinkRequest {
    pub address: String,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Individual,
    Organization,
}

/// Body of `PUT /users/update` once onboarding completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modes: Vec<TransportMode>,
}

/// Unvalidated shipment creation form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentDraft {
    pub origin_code: String,
    pub destination_code: String,
    pub cargo_load: f64,
}

impl ShipmentDraft {
    pub fn validate(&self) -> Result<CreateShipmentRequest, DraftError> {
        let mut errors = Vec::new();
        let origin_code = self.origin_code.trim();
        let destination_code = self.destination_code.trim();

        if origin_code.is_empty() {
            errors.push(FieldError::new(
                DraftField::OriginCode,
                "Origin postal code is required",
            ));
        }
        if destination_code.is_empty() {
            errors.push(FieldError::new(
                DraftField::DestinationCode,
                "Destination postal code is required",
            ));
        }
        if !self.cargo_load.is_finite() || self.cargo_load <= 0.0 {
            errors.push(FieldError::new(
                DraftField::CargoLoad,
                "Cargo load must be a valid number greater than 0",
            ));
        }

        if !errors.is_empty() {
            return Err(DraftError(errors));
        }

        Ok(CreateShipmentRequest {
            origin_code: origin_code.to_string(),
            destination_code: destination_code.to_string(),
            cargo_load: self.cargo_load,
        })
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
