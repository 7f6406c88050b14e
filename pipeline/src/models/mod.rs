pub mod payload;
pub mod record;
pub mod schema;

pub use payload::{ErrorInfo, FlagRequest, StagePayload, TupleRequest};
pub use record::{NycYellowTaxiEntry, ReasonCode, StageRecord};
pub use schema::{COLUMN_COUNT, TaxiField};
