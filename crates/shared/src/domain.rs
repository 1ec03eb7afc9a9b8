use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ShipperId);
id_newtype!(CarrierId);
id_newtype!(ShipmentId);

/// Lifecycle of a stored shipment. There is deliberately no "all" value here;
/// that only exists as a [`StatusFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Waiting,
    Active,
    Delayed,
    Delivered,
}

impl ShipmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::Waiting => "waiting",
            ShipmentStatus::Active => "active",
            ShipmentStatus::Delayed => "delayed",
            ShipmentStatus::Delivered => "delivered",
        }
    }
}

/// Dashboard tab selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Waiting,
    Active,
    Delayed,
    Delivered,
}

impl StatusFilter {
    pub const ALL_TABS: [StatusFilter; 5] = [
        StatusFilter::All,
        StatusFilter::Waiting,
        StatusFilter::Active,
        StatusFilter::Delayed,
        StatusFilter::Delivered,
    ];

    /// `None` means "fetch without a status constraint".
    pub fn status(self) -> Option<ShipmentStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Waiting => Some(ShipmentStatus::Waiting),
            StatusFilter::Active => Some(ShipmentStatus::Active),
            StatusFilter::Delayed => Some(ShipmentStatus::Delayed),
            StatusFilter::Delivered => Some(ShipmentStatus::Delivered),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Waiting => "Waiting",
            StatusFilter::Active => "Active",
            StatusFilter::Delayed => "Delayed",
            StatusFilter::Delivered => "Delivered",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL_TABS
            .into_iter()
            .find(|filter| filter.label().eq_ignore_ascii_case(raw.trim()))
    }
}

impl From<ShipmentStatus> for StatusFilter {
    fn from(value: ShipmentStatus) -> Self {
        match value {
            ShipmentStatus::Waiting => StatusFilter::Waiting,
            ShipmentStatus::Active => StatusFilter::Active,
            ShipmentStatus::Delayed => StatusFilter::Delayed,
            ShipmentStatus::Delivered => StatusFilter::Delivered,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CargoType {
    Fragile,
    Perishable,
    Electronics,
    General,
    Other(String),
}

impl CargoType {
    pub fn as_str(&self) -> &str {
        match self {
            CargoType::Fragile => "fragile",
            CargoType::Perishable => "perishable",
            CargoType::Electronics => "electronics",
            CargoType::General => "general",
            CargoType::Other(raw) => raw,
        }
    }
}

impl From<&str> for CargoType {
    fn from(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "fragile" => CargoType::Fragile,
            "perishable" => CargoType::Perishable,
            "electronics" => CargoType::Electronics,
            "general" => CargoType::General,
            _ => CargoType::Other(raw.to_string()),
        }
    }
}

impl Serialize for CargoType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CargoType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(CargoType::from(raw.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Air,
    Water,
    Railway,
    Road,
}

impl TransportMode {
    pub const ALL: [TransportMode; 4] = [
        TransportMode::Air,
        TransportMode::Water,
        TransportMode::Railway,
        TransportMode::Road,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Air => "air",
            TransportMode::Water => "water",
            TransportMode::Railway => "railway",
            TransportMode::Road => "road",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

/// Marketplace side an account acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Shipper,
    Carrier,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Shipper => "shipper",
            Role::Carrier => "carrier",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ShipmentId>,
    pub status: ShipmentStatus,
    #[serde(default)]
    pub origin: Address,
    #[serde(default)]
    pub destination: Address,
    pub cargo_load: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery_date: DateTime<Utc>,
    pub distance: f64,
    pub cargo_type: CargoType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipper_id: Option<ShipperId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier_id: Option<CarrierId>,
    #[serde(default)]
    pub wallet_connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
