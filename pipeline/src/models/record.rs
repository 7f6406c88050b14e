use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a tuple did not complete the pipeline. Persisted as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ReasonCode {
    #[default]
    None,
    ValidationFailed,
    TransformationFailed,
    StoreFailed,
    Unknown,
}

impl ReasonCode {
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::ValidationFailed => 1,
            Self::TransformationFailed => 2,
            Self::StoreFailed => 3,
            Self::Unknown => 4,
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }

    /// Maps the error type label attached by the orchestrator to a reason.
    pub fn from_error_type(label: Option<&str>) -> Self {
        match label {
            Some("TransformError") => Self::TransformationFailed,
            Some("StoreError") => Self::StoreFailed,
            _ => Self::Unknown,
        }
    }
}

impl From<ReasonCode> for u8 {
    fn from(reason: ReasonCode) -> Self {
        reason.code()
    }
}

impl TryFrom<u8> for ReasonCode {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::ValidationFailed),
            2 => Ok(Self::TransformationFailed),
            3 => Ok(Self::StoreFailed),
            4 => Ok(Self::Unknown),
            other => Err(format!("unknown reason code {}", other)),
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Audit row a stage writes to its own status table before classifying a tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StageRecord {
    pub transaction_id: u64,
    pub raw_tuple: String,
    pub status_reason: ReasonCode,
}

impl StageRecord {
    pub fn new(transaction_id: u64, raw_tuple: &str) -> Self {
        Self {
            transaction_id,
            raw_tuple: raw_tuple.to_string(),
            status_reason: ReasonCode::None,
        }
    }
}

/// Fully typed trip, written once at the end of a successful run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NycYellowTaxiEntry {
    pub store_request_id: u64,
    pub entry_idx: i64,
    pub vendor_id: String,
    pub pickup_time: String,
    pub dropoff_time: String,
    pub passenger_count: i64,
    pub trip_distance: f64,
    pub ratecode_id: String,
    pub store_and_fwd_flag: String,
    pub pu_location_id: i64,
    pub do_location_id: i64,
    pub payment_type: String,
    pub fare_amount: f64,
    pub extra: f64,
    pub mta_tax: f64,
    pub tip_amount: f64,
    pub tolls_amount: f64,
    pub improvement_surcharge: f64,
    pub total_amount: f64,
    pub congestion_surcharge: f64,
    pub airport_fee: f64,
}
