use common::{Error, Result};
use tracing::info;

use super::rules::{parse_float, parse_int};
use super::{FailureSimulator, Stage, StageError, codec};
use crate::models::{COLUMN_COUNT, NycYellowTaxiEntry, ReasonCode, StagePayload, TaxiField};
use crate::storage::{JsonTable, StatusTable};

/// Collects typed values out of a split tuple, remembering every parse error.
struct FieldReader<'a> {
    columns: &'a [String],
    errors: Vec<Error>,
}

impl<'a> FieldReader<'a> {
    fn new(columns: &'a [String]) -> Self {
        Self {
            columns,
            errors: Vec::new(),
        }
    }

    fn raw(&self, field: TaxiField) -> &'a str {
        self.columns[field.index()].as_str()
    }

    fn text(&self, field: TaxiField) -> String {
        self.raw(field).to_string()
    }

    // empty numeric columns were blanked upstream and default to 0
    fn int(&mut self, field: TaxiField) -> i64 {
        let value = self.raw(field);
        if value.is_empty() {
            return 0;
        }
        match parse_int(value) {
            Some(v) => i64::from(v),
            None => {
                self.errors
                    .push(Error::parse(field.as_str(), format!("invalid integer {:?}", value)));
                0
            }
        }
    }

    fn float(&mut self, field: TaxiField) -> f64 {
        let value = self.raw(field);
        if value.is_empty() {
            return 0.0;
        }
        match parse_float(value) {
            Some(v) => v,
            None => {
                self.errors
                    .push(Error::parse(field.as_str(), format!("invalid float {:?}", value)));
                0.0
            }
        }
    }

    /// Surfaces the first error only; one is enough to fail the store.
    fn finish<T>(self, value: T) -> Result<T> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}

/// Parses a transformed tuple into the final record.
pub fn parse_entry(
    transaction_id: u64,
    tuple: &str,
    separator: &str,
) -> Result<NycYellowTaxiEntry> {
    let columns = codec::split(tuple, separator);
    if columns.len() != COLUMN_COUNT {
        return Err(Error::parse(
            "tuple",
            format!("expected {} columns, found {}", COLUMN_COUNT, columns.len()),
        ));
    }

    use TaxiField::*;
    let mut reader = FieldReader::new(&columns);

    let entry = NycYellowTaxiEntry {
        store_request_id: transaction_id,
        entry_idx: reader.int(EntryIdx),
        vendor_id: reader.text(VendorId),
        pickup_time: reader.text(PickupTime),
        dropoff_time: reader.text(DropoffTime),
        passenger_count: reader.int(PassengerCount),
        trip_distance: reader.float(TripDistance),
        ratecode_id: reader.text(RatecodeId),
        store_and_fwd_flag: reader.text(StoreAndFwdFlag),
        pu_location_id: reader.int(PuLocationId),
        do_location_id: reader.int(DoLocationId),
        payment_type: reader.text(PaymentType),
        fare_amount: reader.float(FareAmount),
        extra: reader.float(Extra),
        mta_tax: reader.float(MtaTax),
        tip_amount: reader.float(TipAmount),
        tolls_amount: reader.float(TollsAmount),
        improvement_surcharge: reader.float(ImprovementSurcharge),
        total_amount: reader.float(TotalAmount),
        congestion_surcharge: reader.float(CongestionSurcharge),
        airport_fee: reader.float(AirportFee),
    };

    reader.finish(entry)
}

/// Store stage: records the transformed tuple, then persists the typed entry
/// in the final table. Every failure here is an infrastructure error.
pub struct StoreStage {
    status: StatusTable,
    final_records: JsonTable,
    separator: String,
    failsim: FailureSimulator,
}

impl StoreStage {
    pub fn new(status: StatusTable, final_records: JsonTable, separator: &str) -> Self {
        Self {
            status,
            final_records,
            separator: separator.to_string(),
            failsim: FailureSimulator::disabled(),
        }
    }

    pub fn with_failure_simulator(mut self, failsim: FailureSimulator) -> Self {
        self.failsim = failsim;
        self
    }

    pub async fn handle(&self, request: &StagePayload) -> std::result::Result<StagePayload, StageError> {
        let transaction_id = request.transaction_id;
        let fail = |message: &str| {
            let message = message.to_string();
            move |e: Error| StageError::new(Stage::Store, message, e)
        };

        self.failsim
            .check("put raw tuple")
            .map_err(fail("unable to put raw tuple"))?;
        self.status
            .record(transaction_id, &request.tuple)
            .await
            .map_err(fail("unable to put raw tuple"))?;

        let entry = parse_entry(transaction_id, &request.tuple, &self.separator)
            .and_then(|entry| self.failsim.check("populate entry").map(|_| entry))
            .map_err(fail("unable to populate entry from raw tuple"))?;

        self.failsim
            .check("put final entry")
            .map_err(fail("unable to put entry in final table"))?;
        self.final_records
            .put(transaction_id, &entry)
            .await
            .map_err(fail("unable to put entry in final table"))?;

        info!(transaction_id, table = %self.final_records.name(), "Entry stored");

        Ok(StagePayload {
            success: true,
            reason: ReasonCode::None,
            transaction_id,
            tuple: String::new(),
        })
    }
}
