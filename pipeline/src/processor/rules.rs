//! Declarative rule descriptors for the validate and transform stages.
//!
//! Each rule names the columns it reads through [`TaxiField`] and carries its
//! parameters as plain data; the `evaluate`/`apply` methods are the only
//! interpreters. Rule lists run in order and stop at the first rejection.

use chrono::NaiveDateTime;

use crate::models::TaxiField;

/// Layout of pickup/dropoff timestamps in raw tuples.
pub const RAW_DATETIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";
/// Layout of pickup/dropoff timestamps after transformation.
pub const TRANSFORMED_DATETIME_LAYOUT: &str = "%d/%m/%Y %H:%M:%S";
/// Largest accepted gap between a total and the sum of its components.
pub const TOTAL_TOLERANCE: f64 = 0.005;

/// Parses a finite float; `inf` and `NaN` count as unparsable.
pub fn parse_float(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_int(value: &str) -> Option<i32> {
    value.parse::<i32>().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFail {
    /// Discard the value but keep the tuple.
    Blank,
    /// Reject the whole tuple.
    Reject,
}

/// Inclusive numeric range, optionally widened by one sentinel value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sentinel: Option<f64>,
}

impl Bounds {
    pub const ANY: Bounds = Bounds {
        min: None,
        max: None,
        sentinel: None,
    };

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            ..Self::ANY
        }
    }

    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            sentinel: None,
        }
    }

    pub fn or_exactly(mut self, sentinel: f64) -> Self {
        self.sentinel = Some(sentinel);
        self
    }

    pub fn contains(&self, value: f64) -> bool {
        if self.sentinel == Some(value) {
            return true;
        }
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckKind {
    Integer {
        bounds: Bounds,
        unparsable: OnFail,
        out_of_range: OnFail,
    },
    Float {
        bounds: Bounds,
        unparsable: OnFail,
        out_of_range: OnFail,
    },
    OneOf {
        allowed: &'static [&'static str],
        otherwise: OnFail,
    },
    /// Must parse as a float different from zero.
    NonZero,
}

/// Outcome of one single-column check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Blank,
    Reject,
}

impl From<OnFail> for Verdict {
    fn from(action: OnFail) -> Self {
        match action {
            OnFail::Blank => Verdict::Blank,
            OnFail::Reject => Verdict::Reject,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCheck {
    pub field: TaxiField,
    pub kind: CheckKind,
}

impl ColumnCheck {
    pub fn new(field: TaxiField, kind: CheckKind) -> Self {
        Self { field, kind }
    }

    pub fn evaluate(&self, value: &str) -> Verdict {
        match &self.kind {
            CheckKind::Integer {
                bounds,
                unparsable,
                out_of_range,
            } => match parse_int(value) {
                None => (*unparsable).into(),
                Some(v) if !bounds.contains(f64::from(v)) => (*out_of_range).into(),
                Some(_) => Verdict::Keep,
            },
            CheckKind::Float {
                bounds,
                unparsable,
                out_of_range,
            } => match parse_float(value) {
                None => (*unparsable).into(),
                Some(v) if !bounds.contains(v) => (*out_of_range).into(),
                Some(_) => Verdict::Keep,
            },
            CheckKind::OneOf { allowed, otherwise } => {
                if allowed.iter().any(|candidate| *candidate == value) {
                    Verdict::Keep
                } else {
                    (*otherwise).into()
                }
            }
            CheckKind::NonZero => match parse_float(value) {
                Some(v) if v != 0.0 => Verdict::Keep,
                _ => Verdict::Reject,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CrossKind {
    /// First field strictly before the second, both in `layout`.
    Chronological { layout: &'static str },
    /// When the first field equals `code`, at least one of the others must
    /// be empty.
    BlankWhen { code: &'static str },
    /// First field equals the sum of the others. Skipped when a component
    /// does not parse; the total itself must parse.
    SumEquals { tolerance: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossCheck {
    pub fields: Vec<TaxiField>,
    pub kind: CrossKind,
}

impl CrossCheck {
    pub fn new(fields: Vec<TaxiField>, kind: CrossKind) -> Self {
        Self { fields, kind }
    }

    /// `values` holds the bound columns in the order of `fields`.
    pub fn evaluate(&self, values: &[&str]) -> bool {
        match &self.kind {
            CrossKind::Chronological { layout } => {
                let [earlier, later] = values else {
                    return false;
                };
                match (
                    NaiveDateTime::parse_from_str(earlier, layout),
                    NaiveDateTime::parse_from_str(later, layout),
                ) {
                    (Ok(earlier), Ok(later)) => earlier < later,
                    _ => false,
                }
            }
            CrossKind::BlankWhen { code } => match values.split_first() {
                Some((first, others)) if first == code => {
                    others.iter().any(|value| value.is_empty())
                }
                Some(_) => true,
                None => false,
            },
            CrossKind::SumEquals { tolerance } => {
                let Some((total, components)) = values.split_first() else {
                    return false;
                };
                let Some(total) = parse_float(total) else {
                    return false;
                };

                let mut sum = 0.0;
                for component in components {
                    match parse_float(component) {
                        Some(v) => sum += v,
                        None => return true,
                    }
                }

                (sum - total).abs() <= *tolerance
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformKind {
    /// Replace a code by its mnemonic. With `numeric_codes`, integral float
    /// spellings such as `1.0` are looked up as `1`.
    Lookup {
        table: &'static [(&'static str, &'static str)],
        numeric_codes: bool,
    },
    /// Float to integer string; empty values pass through.
    Integer,
    /// Multiply by a fixed rate, six decimals; empty values pass through.
    Currency { rate: f64 },
    Timestamp {
        from: &'static str,
        to: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformRule {
    pub fields: Vec<TaxiField>,
    pub kind: TransformKind,
}

impl TransformRule {
    pub fn new(fields: Vec<TaxiField>, kind: TransformKind) -> Self {
        Self { fields, kind }
    }

    /// Rewrites a single value, or returns `None` to reject the tuple.
    pub fn apply(&self, value: &str) -> Option<String> {
        match &self.kind {
            TransformKind::Lookup {
                table,
                numeric_codes,
            } => {
                let key = if *numeric_codes {
                    numeric_code(value).unwrap_or_else(|| value.to_string())
                } else {
                    value.to_string()
                };
                table
                    .iter()
                    .find(|(code, _)| *code == key)
                    .map(|(_, mnemonic)| mnemonic.to_string())
            }
            TransformKind::Integer => {
                if value.is_empty() {
                    return Some(String::new());
                }
                parse_float(value).map(|v| format!("{}", v.round() as i64))
            }
            TransformKind::Currency { rate } => {
                if value.is_empty() {
                    return Some(String::new());
                }
                parse_float(value).map(|usd| format!("{:.6}", usd * rate))
            }
            TransformKind::Timestamp { from, to } => NaiveDateTime::parse_from_str(value, from)
                .ok()
                .map(|dt| dt.format(to).to_string()),
        }
    }
}

fn numeric_code(value: &str) -> Option<String> {
    let v = parse_float(value)?;
    (v.fract() == 0.0).then(|| format!("{}", v as i64))
}

pub const VENDORS: &[(&str, &str)] = &[
    ("1", "Creative Mobile Technologies, LLC"),
    ("2", "VeriFone Inc."),
];

pub const RATE_CODES: &[(&str, &str)] = &[
    ("1", "Standard rate"),
    ("2", "JFK"),
    ("3", "Newark"),
    ("4", "Nassau or Westchester"),
    ("5", "Negotiated fare"),
    ("6", "Group ride"),
    ("99", "Null/unknown"),
];

pub const STORE_AND_FWD_FLAGS: &[(&str, &str)] = &[
    ("Y", "store and forward trip"),
    ("N", "not a store and forward trip"),
];

/// Payment type code of a "No charge" trip.
pub const NO_CHARGE_PAYMENT: &str = "3";

pub const PAYMENT_TYPES: &[(&str, &str)] = &[
    ("1", "Credit card"),
    ("2", "Cash"),
    ("3", "No charge"),
    ("4", "Dispute"),
    ("5", "Unknown"),
    ("6", "Voided trip"),
];

/// Single-column checks, in evaluation order.
pub fn default_column_checks() -> Vec<ColumnCheck> {
    use CheckKind::*;
    use OnFail::*;
    use TaxiField::*;

    let mut checks = vec![
        ColumnCheck::new(
            EntryIdx,
            Integer {
                bounds: Bounds::at_least(0.0),
                unparsable: Blank,
                out_of_range: Blank,
            },
        ),
        ColumnCheck::new(
            VendorId,
            Integer {
                bounds: Bounds::between(1.0, 2.0),
                unparsable: Blank,
                out_of_range: Blank,
            },
        ),
        ColumnCheck::new(
            PassengerCount,
            Float {
                bounds: Bounds::between(1.0, 5.0),
                unparsable: Blank,
                out_of_range: Reject,
            },
        ),
        ColumnCheck::new(
            TripDistance,
            Float {
                bounds: Bounds::at_least(0.0),
                unparsable: Reject,
                out_of_range: Reject,
            },
        ),
        ColumnCheck::new(
            RatecodeId,
            Float {
                bounds: Bounds::between(1.0, 6.0).or_exactly(99.0),
                unparsable: Reject,
                out_of_range: Reject,
            },
        ),
        ColumnCheck::new(
            StoreAndFwdFlag,
            OneOf {
                allowed: &["Y", "N"],
                otherwise: Blank,
            },
        ),
        ColumnCheck::new(
            PuLocationId,
            Integer {
                bounds: Bounds::at_least(0.0),
                unparsable: Reject,
                out_of_range: Reject,
            },
        ),
        ColumnCheck::new(
            DoLocationId,
            Integer {
                bounds: Bounds::at_least(0.0),
                unparsable: Reject,
                out_of_range: Reject,
            },
        ),
        ColumnCheck::new(
            PaymentType,
            Integer {
                bounds: Bounds::between(0.0, 6.0),
                unparsable: Blank,
                out_of_range: Blank,
            },
        ),
    ];

    for field in TaxiField::MONETARY {
        let kind = if field == TotalAmount {
            NonZero
        } else {
            Float {
                bounds: Bounds::ANY,
                unparsable: Blank,
                out_of_range: Blank,
            }
        };
        checks.push(ColumnCheck::new(field, kind));
    }

    checks
}

/// Cross-column checks; they run after every single-column check, in this
/// order: chronology, "no charge" trips, total.
pub fn default_cross_checks() -> Vec<CrossCheck> {
    let mut sum_fields = vec![TaxiField::TotalAmount];
    sum_fields.extend(TaxiField::TOTAL_COMPONENTS);

    let mut no_charge_fields = vec![TaxiField::PaymentType];
    no_charge_fields.extend(TaxiField::MONETARY);

    vec![
        CrossCheck::new(
            vec![TaxiField::PickupTime, TaxiField::DropoffTime],
            CrossKind::Chronological {
                layout: RAW_DATETIME_LAYOUT,
            },
        ),
        // a "no charge" trip must have dropped at least one amount
        CrossCheck::new(
            no_charge_fields,
            CrossKind::BlankWhen {
                code: NO_CHARGE_PAYMENT,
            },
        ),
        CrossCheck::new(
            sum_fields,
            CrossKind::SumEquals {
                tolerance: TOTAL_TOLERANCE,
            },
        ),
    ]
}

/// Transform rules, in application order.
pub fn default_transform_rules(usd_to_eur: f64) -> Vec<TransformRule> {
    use TaxiField::*;

    vec![
        TransformRule::new(
            vec![VendorId],
            TransformKind::Lookup {
                table: VENDORS,
                numeric_codes: false,
            },
        ),
        TransformRule::new(
            vec![RatecodeId],
            TransformKind::Lookup {
                table: RATE_CODES,
                numeric_codes: true,
            },
        ),
        TransformRule::new(
            vec![StoreAndFwdFlag],
            TransformKind::Lookup {
                table: STORE_AND_FWD_FLAGS,
                numeric_codes: false,
            },
        ),
        TransformRule::new(
            vec![PaymentType],
            TransformKind::Lookup {
                table: PAYMENT_TYPES,
                numeric_codes: false,
            },
        ),
        TransformRule::new(vec![PassengerCount], TransformKind::Integer),
        TransformRule::new(
            TaxiField::MONETARY.to_vec(),
            TransformKind::Currency { rate: usd_to_eur },
        ),
        TransformRule::new(
            vec![PickupTime, DropoffTime],
            TransformKind::Timestamp {
                from: RAW_DATETIME_LAYOUT,
                to: TRANSFORMED_DATETIME_LAYOUT,
            },
        ),
    ]
}
