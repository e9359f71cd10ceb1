use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

use super::instruments_constants::DEFAULT_LOT;
use super::instruments_errors::{InstrumentError, Result};

/// Declared kind of an instrument. Unknown wire values map to `Other`
/// rather than failing; such records carry only the common fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentType {
    Stock,
    Bond,
    Future,
    Cryptocurrency,
    Other,
}

impl InstrumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentType::Stock => "stock",
            InstrumentType::Bond => "bond",
            InstrumentType::Future => "future",
            InstrumentType::Cryptocurrency => "cryptocurrency",
            InstrumentType::Other => "other",
        }
    }

    /// True for the exchange-listed kinds sharing the secondary field group.
    pub fn is_listed(&self) -> bool {
        matches!(
            self,
            InstrumentType::Stock | InstrumentType::Bond | InstrumentType::Future
        )
    }
}

impl From<&str> for InstrumentType {
    fn from(value: &str) -> Self {
        match value {
            "stock" => InstrumentType::Stock,
            "bond" => InstrumentType::Bond,
            "future" => InstrumentType::Future,
            "cryptocurrency" => InstrumentType::Cryptocurrency,
            _ => InstrumentType::Other,
        }
    }
}

/// Field group shared by stock, bond and future instruments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListedFields {
    pub lot: i64,
    pub currency: String,
    pub spbex_symbol: String,
    pub isin: Option<String>,
    pub figi: String,
    pub class_code: String,
    pub sector: String,
}

/// Bond-only field group.
#[derive(Debug, Clone, PartialEq)]
pub struct BondFields {
    pub amortization_flag: bool,
    pub floating_coupon_flag: bool,
    pub perpetual_flag: bool,
    pub subordinated_flag: bool,
    pub issue_kind: String,
    pub initial_nominal: Decimal,
    pub nominal: Decimal,
    pub maturity_date: NaiveDate,
    pub coupon_quantity_per_year: i64,
}

/// Future-only field group. `isin` is explicitly erased for futures.
#[derive(Debug, Clone, PartialEq)]
pub struct FutureFields {
    pub expiration_date: NaiveDate,
    pub basic_asset: String,
}

/// Cryptocurrency-only field group.
#[derive(Debug, Clone, PartialEq)]
pub struct CryptoFields {
    pub min_quantity_increment: Decimal,
    pub min_notional: Decimal,
    pub base_crypto_asset: String,
    pub quote_crypto_asset: String,
}

/// Type-conditional part of an instrument. Each variant carries exactly
/// the field groups valid for its declared type, so a record can never
/// hold another type's fields.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentDetails {
    Stock(ListedFields),
    Bond {
        listed: ListedFields,
        bond: BondFields,
    },
    Future {
        listed: ListedFields,
        future: FutureFields,
    },
    Cryptocurrency(CryptoFields),
    Other,
}

impl InstrumentDetails {
    pub fn instrument_type(&self) -> InstrumentType {
        match self {
            InstrumentDetails::Stock(_) => InstrumentType::Stock,
            InstrumentDetails::Bond { .. } => InstrumentType::Bond,
            InstrumentDetails::Future { .. } => InstrumentType::Future,
            InstrumentDetails::Cryptocurrency(_) => InstrumentType::Cryptocurrency,
            InstrumentDetails::Other => InstrumentType::Other,
        }
    }

    pub fn listed(&self) -> Option<&ListedFields> {
        match self {
            InstrumentDetails::Stock(listed)
            | InstrumentDetails::Bond { listed, .. }
            | InstrumentDetails::Future { listed, .. } => Some(listed),
            _ => None,
        }
    }
}

/// Domain model for an instrument record. The remote store holds the
/// authoritative copy; the local cache mirrors it by symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub full_name: String,
    /// The `type` string exactly as stored remotely. Unknown values decode
    /// to `InstrumentDetails::Other` but must still mirror verbatim.
    pub type_name: String,
    pub exchange: Vec<String>,
    pub broker: Vec<String>,
    pub min_price_increment: Decimal,
    pub for_qual_investor_flag: bool,
    pub removed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub details: InstrumentDetails,
}

impl Instrument {
    pub fn instrument_type(&self) -> InstrumentType {
        self.details.instrument_type()
    }

    /// Decodes a flat wire document (camelCase keys) into the typed model.
    pub fn from_document(doc: &Value) -> Result<Instrument> {
        let obj = doc
            .as_object()
            .ok_or_else(|| malformed("document is not an object"))?;

        let type_name = doc_str(obj, "type");
        let instrument_type = InstrumentType::from(type_name.as_str());

        let details = match instrument_type {
            InstrumentType::Stock => InstrumentDetails::Stock(listed_from(obj)),
            InstrumentType::Bond => InstrumentDetails::Bond {
                listed: listed_from(obj),
                bond: BondFields {
                    amortization_flag: doc_bool(obj, "amortizationFlag"),
                    floating_coupon_flag: doc_bool(obj, "floatingCouponFlag"),
                    perpetual_flag: doc_bool(obj, "perpetualFlag"),
                    subordinated_flag: doc_bool(obj, "subordinatedFlag"),
                    issue_kind: doc_str(obj, "issueKind"),
                    initial_nominal: required_decimal(obj, "initialNominal")?,
                    nominal: required_decimal(obj, "nominal")?,
                    maturity_date: required_date(obj, "maturityDate")?,
                    coupon_quantity_per_year: doc_i64(obj, "couponQuantityPerYear")
                        .unwrap_or_default(),
                },
            },
            InstrumentType::Future => InstrumentDetails::Future {
                listed: listed_from(obj),
                future: FutureFields {
                    expiration_date: required_date(obj, "expirationDate")?,
                    basic_asset: doc_str(obj, "basicAsset"),
                },
            },
            InstrumentType::Cryptocurrency => InstrumentDetails::Cryptocurrency(CryptoFields {
                min_quantity_increment: required_decimal(obj, "minQuantityIncrement")?,
                min_notional: required_decimal(obj, "minNotional")?,
                base_crypto_asset: doc_str(obj, "baseCryptoAsset"),
                quote_crypto_asset: doc_str(obj, "quoteCryptoAsset"),
            }),
            InstrumentType::Other => InstrumentDetails::Other,
        };

        Ok(Instrument {
            symbol: doc_str(obj, "symbol"),
            full_name: doc_str(obj, "fullName"),
            type_name,
            exchange: doc_str_array(obj, "exchange"),
            broker: doc_str_array(obj, "broker"),
            min_price_increment: opt_decimal(obj, "minPriceIncrement")?.unwrap_or_default(),
            for_qual_investor_flag: doc_bool(obj, "forQualInvestorFlag"),
            removed: doc_bool(obj, "removed"),
            created_at: doc_datetime(obj, "createdAt").unwrap_or_else(Utc::now),
            updated_at: doc_datetime(obj, "updatedAt").unwrap_or_else(Utc::now),
            details,
        })
    }
}

fn malformed(msg: impl std::fmt::Display) -> InstrumentError {
    InstrumentError::RemoteStore(format!("malformed instrument document: {}", msg))
}

fn doc_str(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn doc_opt_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn doc_bool(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).and_then(Value::as_bool).unwrap_or_default()
}

fn doc_i64(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    obj.get(key).and_then(Value::as_i64)
}

fn doc_str_array(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    obj.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn opt_decimal(obj: &Map<String, Value>, key: &str) -> Result<Option<Decimal>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        // serde_json renders the shortest round-trip form, so going through
        // the string keeps 0.01 as 0.01 instead of its binary expansion.
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .map(Some)
            .map_err(|e| malformed(format!("{}: {}", key, e))),
        Some(Value::String(s)) => Decimal::from_str(s)
            .map(Some)
            .map_err(|e| malformed(format!("{}: {}", key, e))),
        Some(other) => Err(malformed(format!("{} has type {:?}", key, other))),
    }
}

fn required_decimal(obj: &Map<String, Value>, key: &str) -> Result<Decimal> {
    opt_decimal(obj, key)?.ok_or_else(|| malformed(format!("missing field {}", key)))
}

fn required_date(obj: &Map<String, Value>, key: &str) -> Result<NaiveDate> {
    let raw = obj
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| malformed(format!("missing field {}", key)))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| malformed(format!("{}: {}", key, e)))
}

fn doc_datetime(obj: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    obj.get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn listed_from(obj: &Map<String, Value>) -> ListedFields {
    ListedFields {
        lot: doc_i64(obj, "lot").filter(|lot| *lot > 0).unwrap_or(DEFAULT_LOT),
        currency: doc_str(obj, "currency"),
        spbex_symbol: doc_str(obj, "spbexSymbol"),
        isin: doc_opt_str(obj, "isin"),
        figi: doc_str(obj, "figi"),
        class_code: doc_str(obj, "classCode"),
        sector: doc_str(obj, "sector"),
    }
}

/// Raw form state as entered on the page. Text inputs stay strings until
/// update synthesis; checkbox groups carry the checked identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstrumentForm {
    pub symbol: String,
    pub full_name: String,
    pub instrument_type: String,
    pub exchanges: Vec<String>,
    pub brokers: Vec<String>,
    pub min_price_increment: String,
    pub for_qual_investor_flag: bool,
    pub removed: bool,
    pub lot: String,
    pub currency: String,
    pub spbex_symbol: String,
    pub isin: String,
    pub figi: String,
    pub class_code: String,
    pub sector: String,
    pub amortization_flag: bool,
    pub floating_coupon_flag: bool,
    pub perpetual_flag: bool,
    pub subordinated_flag: bool,
    pub issue_kind: String,
    pub initial_nominal: String,
    pub nominal: String,
    pub maturity_date: String,
    pub coupon_quantity_per_year: String,
    pub expiration_date: String,
    pub basic_asset: String,
    pub min_quantity_increment: String,
    pub min_notional: String,
    pub base_crypto_asset: String,
    pub quote_crypto_asset: String,
}

impl InstrumentForm {
    pub fn parsed_type(&self) -> InstrumentType {
        InstrumentType::from(self.instrument_type.trim())
    }

    /// Symbol as it keys both stores: trimmed and uppercased.
    pub fn normalized_symbol(&self) -> String {
        self.symbol.trim().to_uppercase()
    }
}

/// Database model for the local cache table. Type-conditional fields are
/// flattened into nullable columns; a row's populated columns match its
/// `instrument_type`.
#[derive(
    Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::instruments)]
#[diesel(primary_key(symbol))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InstrumentDB {
    pub symbol: String,
    pub full_name: String,
    pub instrument_type: String,
    pub exchange: String,
    pub broker: String,
    pub min_price_increment: String,
    pub for_qual_investor_flag: bool,
    pub removed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub lot: Option<i64>,
    pub currency: Option<String>,
    pub spbex_symbol: Option<String>,
    pub isin: Option<String>,
    pub figi: Option<String>,
    pub class_code: Option<String>,
    pub sector: Option<String>,
    pub amortization_flag: Option<bool>,
    pub floating_coupon_flag: Option<bool>,
    pub perpetual_flag: Option<bool>,
    pub subordinated_flag: Option<bool>,
    pub issue_kind: Option<String>,
    pub initial_nominal: Option<String>,
    pub nominal: Option<String>,
    pub maturity_date: Option<NaiveDate>,
    pub coupon_quantity_per_year: Option<i64>,
    pub expiration_date: Option<NaiveDate>,
    pub basic_asset: Option<String>,
    pub min_quantity_increment: Option<String>,
    pub min_notional: Option<String>,
    pub base_crypto_asset: Option<String>,
    pub quote_crypto_asset: Option<String>,
}

impl From<&Instrument> for InstrumentDB {
    fn from(instrument: &Instrument) -> Self {
        let mut row = InstrumentDB {
            symbol: instrument.symbol.clone(),
            full_name: instrument.full_name.clone(),
            instrument_type: instrument.type_name.clone(),
            exchange: serde_json::to_string(&instrument.exchange)
                .unwrap_or_else(|_| "[]".to_string()),
            broker: serde_json::to_string(&instrument.broker)
                .unwrap_or_else(|_| "[]".to_string()),
            min_price_increment: instrument.min_price_increment.to_string(),
            for_qual_investor_flag: instrument.for_qual_investor_flag,
            removed: instrument.removed,
            created_at: instrument.created_at.naive_utc(),
            updated_at: instrument.updated_at.naive_utc(),
            lot: None,
            currency: None,
            spbex_symbol: None,
            isin: None,
            figi: None,
            class_code: None,
            sector: None,
            amortization_flag: None,
            floating_coupon_flag: None,
            perpetual_flag: None,
            subordinated_flag: None,
            issue_kind: None,
            initial_nominal: None,
            nominal: None,
            maturity_date: None,
            coupon_quantity_per_year: None,
            expiration_date: None,
            basic_asset: None,
            min_quantity_increment: None,
            min_notional: None,
            base_crypto_asset: None,
            quote_crypto_asset: None,
        };

        if let Some(listed) = instrument.details.listed() {
            row.lot = Some(listed.lot);
            row.currency = Some(listed.currency.clone());
            row.spbex_symbol = Some(listed.spbex_symbol.clone());
            row.isin = listed.isin.clone();
            row.figi = Some(listed.figi.clone());
            row.class_code = Some(listed.class_code.clone());
            row.sector = Some(listed.sector.clone());
        }

        match &instrument.details {
            InstrumentDetails::Bond { bond, .. } => {
                row.amortization_flag = Some(bond.amortization_flag);
                row.floating_coupon_flag = Some(bond.floating_coupon_flag);
                row.perpetual_flag = Some(bond.perpetual_flag);
                row.subordinated_flag = Some(bond.subordinated_flag);
                row.issue_kind = Some(bond.issue_kind.clone());
                row.initial_nominal = Some(bond.initial_nominal.to_string());
                row.nominal = Some(bond.nominal.to_string());
                row.maturity_date = Some(bond.maturity_date);
                row.coupon_quantity_per_year = Some(bond.coupon_quantity_per_year);
            }
            InstrumentDetails::Future { future, .. } => {
                row.isin = None;
                row.expiration_date = Some(future.expiration_date);
                row.basic_asset = Some(future.basic_asset.clone());
            }
            InstrumentDetails::Cryptocurrency(crypto) => {
                row.min_quantity_increment = Some(crypto.min_quantity_increment.to_string());
                row.min_notional = Some(crypto.min_notional.to_string());
                row.base_crypto_asset = Some(crypto.base_crypto_asset.clone());
                row.quote_crypto_asset = Some(crypto.quote_crypto_asset.clone());
            }
            InstrumentDetails::Stock(_) | InstrumentDetails::Other => {}
        }

        row
    }
}

impl TryFrom<InstrumentDB> for Instrument {
    type Error = InstrumentError;

    fn try_from(row: InstrumentDB) -> Result<Instrument> {
        let instrument_type = InstrumentType::from(row.instrument_type.as_str());

        let listed = || -> ListedFields {
            ListedFields {
                lot: row.lot.filter(|lot| *lot > 0).unwrap_or(DEFAULT_LOT),
                currency: row.currency.clone().unwrap_or_default(),
                spbex_symbol: row.spbex_symbol.clone().unwrap_or_default(),
                isin: row.isin.clone(),
                figi: row.figi.clone().unwrap_or_default(),
                class_code: row.class_code.clone().unwrap_or_default(),
                sector: row.sector.clone().unwrap_or_default(),
            }
        };

        let details = match instrument_type {
            InstrumentType::Stock => InstrumentDetails::Stock(listed()),
            InstrumentType::Bond => InstrumentDetails::Bond {
                listed: listed(),
                bond: BondFields {
                    amortization_flag: row.amortization_flag.unwrap_or_default(),
                    floating_coupon_flag: row.floating_coupon_flag.unwrap_or_default(),
                    perpetual_flag: row.perpetual_flag.unwrap_or_default(),
                    subordinated_flag: row.subordinated_flag.unwrap_or_default(),
                    issue_kind: row.issue_kind.clone().unwrap_or_default(),
                    initial_nominal: cached_decimal(row.initial_nominal.as_deref())?,
                    nominal: cached_decimal(row.nominal.as_deref())?,
                    maturity_date: row.maturity_date.ok_or_else(|| {
                        InstrumentError::Database("cache row missing maturity_date".to_string())
                    })?,
                    coupon_quantity_per_year: row.coupon_quantity_per_year.unwrap_or_default(),
                },
            },
            InstrumentType::Future => InstrumentDetails::Future {
                listed: listed(),
                future: FutureFields {
                    expiration_date: row.expiration_date.ok_or_else(|| {
                        InstrumentError::Database("cache row missing expiration_date".to_string())
                    })?,
                    basic_asset: row.basic_asset.clone().unwrap_or_default(),
                },
            },
            InstrumentType::Cryptocurrency => InstrumentDetails::Cryptocurrency(CryptoFields {
                min_quantity_increment: cached_decimal(row.min_quantity_increment.as_deref())?,
                min_notional: cached_decimal(row.min_notional.as_deref())?,
                base_crypto_asset: row.base_crypto_asset.clone().unwrap_or_default(),
                quote_crypto_asset: row.quote_crypto_asset.clone().unwrap_or_default(),
            }),
            InstrumentType::Other => InstrumentDetails::Other,
        };

        Ok(Instrument {
            symbol: row.symbol,
            full_name: row.full_name,
            type_name: row.instrument_type,
            exchange: serde_json::from_str(&row.exchange).unwrap_or_default(),
            broker: serde_json::from_str(&row.broker).unwrap_or_default(),
            min_price_increment: Decimal::from_str(&row.min_price_increment)
                .map_err(|e| InstrumentError::Database(e.to_string()))?,
            for_qual_investor_flag: row.for_qual_investor_flag,
            removed: row.removed,
            created_at: row.created_at.and_utc(),
            updated_at: row.updated_at.and_utc(),
            details,
        })
    }
}

fn cached_decimal(raw: Option<&str>) -> Result<Decimal> {
    match raw {
        Some(s) => Decimal::from_str(s).map_err(|e| InstrumentError::Database(e.to_string())),
        None => Ok(Decimal::ZERO),
    }
}
