use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use super::instruments_constants::{
    BOND_FIELDS, CRYPTO_FIELDS, DEFAULT_LOT, FUTURE_FIELDS, LISTED_FIELDS,
};
use super::instruments_errors::{InstrumentError, Result};
use super::instruments_model::{InstrumentForm, InstrumentType};

/// One entry of the `$set` payload. Erasure is an explicit sentinel, not
/// an absent-value convention.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Set(Value),
    Unset,
}

/// Synthesized partial update: `$set` layered over `$setOnInsert`, both
/// applied by the remote store's conditional upsert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentUpdate {
    pub set: BTreeMap<String, FieldOp>,
    pub set_on_insert: BTreeMap<String, Value>,
}

impl InstrumentUpdate {
    pub fn set_value(&self, field: &str) -> Option<&Value> {
        match self.set.get(field) {
            Some(FieldOp::Set(value)) => Some(value),
            _ => None,
        }
    }

    pub fn is_unset(&self, field: &str) -> bool {
        matches!(self.set.get(field), Some(FieldOp::Unset))
    }
}

/// Builds the partial update document for the current form state.
///
/// Exactly one type branch is entered; the type is the sole discriminant,
/// evaluated once. `previous_type` is the type of the record as loaded;
/// fields belonging to groups the record is leaving are written as
/// explicit unsets so no stale value survives a type change.
pub fn build_update(
    form: &InstrumentForm,
    previous_type: Option<InstrumentType>,
) -> Result<InstrumentUpdate> {
    let now = Utc::now();
    let mut set: BTreeMap<String, FieldOp> = BTreeMap::new();
    let instrument_type = form.parsed_type();

    set_str(&mut set, "symbol", &form.normalized_symbol());
    set_str(&mut set, "fullName", form.full_name.trim());
    set_str(&mut set, "type", form.instrument_type.trim());
    set_json(&mut set, "exchange", json_array(&form.exchanges));
    set_json(&mut set, "broker", json_array(&form.brokers));
    set_json(
        &mut set,
        "minPriceIncrement",
        decimal_value(decimal_field(&form.min_price_increment, "minPriceIncrement")?.abs()),
    );
    set_json(&mut set, "forQualInvestorFlag", Value::Bool(form.for_qual_investor_flag));
    set_json(&mut set, "removed", Value::Bool(form.removed));
    set_str(&mut set, "updatedAt", &now.to_rfc3339());

    if instrument_type.is_listed() {
        set_json(&mut set, "lot", Value::from(parse_lot(&form.lot)));
        set_str(&mut set, "currency", form.currency.trim());
        set_str(&mut set, "spbexSymbol", form.spbex_symbol.trim());
        set_str(&mut set, "isin", form.isin.trim());
        set_str(&mut set, "figi", form.figi.trim());
        set_str(&mut set, "classCode", form.class_code.trim());
        set_str(&mut set, "sector", form.sector.trim());
    }

    match instrument_type {
        InstrumentType::Bond => {
            set_json(&mut set, "amortizationFlag", Value::Bool(form.amortization_flag));
            set_json(&mut set, "floatingCouponFlag", Value::Bool(form.floating_coupon_flag));
            set_json(&mut set, "perpetualFlag", Value::Bool(form.perpetual_flag));
            set_json(&mut set, "subordinatedFlag", Value::Bool(form.subordinated_flag));
            set_str(&mut set, "issueKind", form.issue_kind.trim());
            set_json(
                &mut set,
                "initialNominal",
                decimal_value(decimal_field(&form.initial_nominal, "initialNominal")?),
            );
            set_json(
                &mut set,
                "nominal",
                decimal_value(decimal_field(&form.nominal, "nominal")?),
            );
            set_str(
                &mut set,
                "maturityDate",
                &date_field(&form.maturity_date, "maturityDate")?.to_string(),
            );
            set_json(
                &mut set,
                "couponQuantityPerYear",
                Value::from(parse_coupon_quantity(&form.coupon_quantity_per_year)),
            );
        }
        InstrumentType::Future => {
            // A record's type is mutable; a stale isin from a prior listed
            // type must not survive, so erase it rather than leave it.
            set.insert("isin".to_string(), FieldOp::Unset);
            set_str(
                &mut set,
                "expirationDate",
                &date_field(&form.expiration_date, "expirationDate")?.to_string(),
            );
            set_str(&mut set, "basicAsset", form.basic_asset.trim());
        }
        InstrumentType::Cryptocurrency => {
            set_json(
                &mut set,
                "minQuantityIncrement",
                decimal_value(
                    decimal_field(&form.min_quantity_increment, "minQuantityIncrement")?.abs(),
                ),
            );
            set_json(
                &mut set,
                "minNotional",
                decimal_value(decimal_field(&form.min_notional, "minNotional")?),
            );
            set_str(&mut set, "baseCryptoAsset", form.base_crypto_asset.trim());
            set_str(&mut set, "quoteCryptoAsset", form.quote_crypto_asset.trim());
        }
        InstrumentType::Stock | InstrumentType::Other => {}
    }

    if let Some(previous) = previous_type {
        let current_fields = fields_for(instrument_type);
        for field in fields_for(previous) {
            if !current_fields.contains(&field) && !set.contains_key(field) {
                set.insert(field.to_string(), FieldOp::Unset);
            }
        }
    }

    let mut set_on_insert = BTreeMap::new();
    set_on_insert.insert("createdAt".to_string(), Value::String(now.to_rfc3339()));

    Ok(InstrumentUpdate { set, set_on_insert })
}

/// Every type-conditional field a record of the given type may carry.
fn fields_for(instrument_type: InstrumentType) -> Vec<&'static str> {
    let mut fields: Vec<&'static str> = Vec::new();
    if instrument_type.is_listed() {
        fields.extend_from_slice(LISTED_FIELDS);
    }
    match instrument_type {
        InstrumentType::Bond => fields.extend_from_slice(BOND_FIELDS),
        InstrumentType::Future => fields.extend_from_slice(FUTURE_FIELDS),
        InstrumentType::Cryptocurrency => fields.extend_from_slice(CRYPTO_FIELDS),
        _ => {}
    }
    fields
}

fn set_str(set: &mut BTreeMap<String, FieldOp>, field: &str, value: &str) {
    set.insert(field.to_string(), FieldOp::Set(Value::String(value.to_string())));
}

fn set_json(set: &mut BTreeMap<String, FieldOp>, field: &str, value: Value) {
    set.insert(field.to_string(), FieldOp::Set(value));
}

fn json_array(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

fn decimal_value(decimal: Decimal) -> Value {
    serde_json::to_value(decimal).unwrap_or(Value::Null)
}

/// Normalizes a locale comma separator before parsing.
fn decimal_field(raw: &str, field: &str) -> Result<Decimal> {
    let normalized = raw.trim().replace(',', ".");
    Decimal::from_str(&normalized).map_err(|e| InstrumentError::validation(field, e.to_string()))
}

fn date_field(raw: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| InstrumentError::validation(field, e.to_string()))
}

/// A lot of zero is never semantically valid; blank, zero, negative or
/// unparseable input silently defaults instead of failing the submission.
fn parse_lot(raw: &str) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(lot) if lot > 0 => lot,
        _ => DEFAULT_LOT,
    }
}

fn parse_coupon_quantity(raw: &str) -> i64 {
    raw.trim().parse::<i64>().map(i64::abs).unwrap_or(0)
}
