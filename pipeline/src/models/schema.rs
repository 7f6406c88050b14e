use std::fmt;

/// Number of columns in a raw trip tuple.
pub const COLUMN_COUNT: usize = 20;

/// Named columns of a yellow taxi trip tuple, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxiField {
    EntryIdx,
    VendorId,
    PickupTime,
    DropoffTime,
    PassengerCount,
    TripDistance,
    RatecodeId,
    StoreAndFwdFlag,
    PuLocationId,
    DoLocationId,
    PaymentType,
    FareAmount,
    Extra,
    MtaTax,
    TipAmount,
    TollsAmount,
    ImprovementSurcharge,
    TotalAmount,
    CongestionSurcharge,
    AirportFee,
}

impl TaxiField {
    pub const ALL: [TaxiField; COLUMN_COUNT] = [
        Self::EntryIdx,
        Self::VendorId,
        Self::PickupTime,
        Self::DropoffTime,
        Self::PassengerCount,
        Self::TripDistance,
        Self::RatecodeId,
        Self::StoreAndFwdFlag,
        Self::PuLocationId,
        Self::DoLocationId,
        Self::PaymentType,
        Self::FareAmount,
        Self::Extra,
        Self::MtaTax,
        Self::TipAmount,
        Self::TollsAmount,
        Self::ImprovementSurcharge,
        Self::TotalAmount,
        Self::CongestionSurcharge,
        Self::AirportFee,
    ];

    /// Every monetary column, `TotalAmount` included.
    pub const MONETARY: [TaxiField; 9] = [
        Self::FareAmount,
        Self::Extra,
        Self::MtaTax,
        Self::TipAmount,
        Self::TollsAmount,
        Self::ImprovementSurcharge,
        Self::TotalAmount,
        Self::CongestionSurcharge,
        Self::AirportFee,
    ];

    /// Monetary columns that add up to `TotalAmount`.
    pub const TOTAL_COMPONENTS: [TaxiField; 8] = [
        Self::FareAmount,
        Self::Extra,
        Self::MtaTax,
        Self::TipAmount,
        Self::TollsAmount,
        Self::ImprovementSurcharge,
        Self::CongestionSurcharge,
        Self::AirportFee,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EntryIdx => "EntryIdx",
            Self::VendorId => "VendorId",
            Self::PickupTime => "PickupTime",
            Self::DropoffTime => "DropoffTime",
            Self::PassengerCount => "PassengerCount",
            Self::TripDistance => "TripDistance",
            Self::RatecodeId => "RatecodeId",
            Self::StoreAndFwdFlag => "StoreAndFwdFlag",
            Self::PuLocationId => "PuLocationId",
            Self::DoLocationId => "DoLocationId",
            Self::PaymentType => "PaymentType",
            Self::FareAmount => "FareAmount",
            Self::Extra => "Extra",
            Self::MtaTax => "MtaTax",
            Self::TipAmount => "TipAmount",
            Self::TollsAmount => "TollsAmount",
            Self::ImprovementSurcharge => "ImprovementSurcharge",
            Self::TotalAmount => "TotalAmount",
            Self::CongestionSurcharge => "CongestionSurcharge",
            Self::AirportFee => "AirportFee",
        }
    }
}

impl fmt::Display for TaxiField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_fields_are_in_wire_order() {
        for (position, field) in TaxiField::ALL.iter().enumerate() {
            assert_eq!(field.index(), position, "{} out of place", field);
        }
    }

    #[test]
    fn test_total_components_exclude_total() {
        assert!(!TaxiField::TOTAL_COMPONENTS.contains(&TaxiField::TotalAmount));
        assert!(TaxiField::MONETARY.contains(&TaxiField::TotalAmount));
        assert_eq!(TaxiField::TotalAmount.index(), 17);
    }
}
