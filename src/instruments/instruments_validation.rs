use super::instruments_constants::FIGI_BROKER;
use super::instruments_errors::{InstrumentError, Result};
use super::instruments_model::{InstrumentForm, InstrumentType};
use super::instruments_traits::FieldValidator;

/// Runs the external per-field validator over exactly the fields relevant
/// to the declared type. Short-circuits on the first failure; no payload
/// is synthesized after a failed validation.
pub fn validate_for_submission(form: &InstrumentForm, validator: &dyn FieldValidator) -> Result<()> {
    let instrument_type = form.parsed_type();

    validator.validate("symbol", &form.symbol)?;
    validator.validate("fullName", &form.full_name)?;

    if instrument_type.is_listed() {
        validator.validate("lot", &form.lot)?;
    }

    validator.validate("minPriceIncrement", &form.min_price_increment)?;

    if form.brokers.iter().any(|broker| broker == FIGI_BROKER) {
        validator.validate("figi", &form.figi)?;
    }

    match instrument_type {
        InstrumentType::Bond => {
            validator.validate("initialNominal", &form.initial_nominal)?;
            validator.validate("nominal", &form.nominal)?;
            validator.validate("maturityDate", &form.maturity_date)?;
        }
        InstrumentType::Future => {
            validator.validate("basicAsset", &form.basic_asset)?;
            validator.validate("expirationDate", &form.expiration_date)?;
        }
        InstrumentType::Cryptocurrency => {
            validator.validate("minQuantityIncrement", &form.min_quantity_increment)?;
            validator.validate("minNotional", &form.min_notional)?;
            validator.validate("baseCryptoAsset", &form.base_crypto_asset)?;
            validator.validate("quoteCryptoAsset", &form.quote_crypto_asset)?;
        }
        InstrumentType::Stock | InstrumentType::Other => {}
    }

    Ok(())
}

/// Default validator: a field passes when it is not blank.
pub struct RequiredFieldValidator;

impl FieldValidator for RequiredFieldValidator {
    fn validate(&self, field: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(InstrumentError::validation(field, "value is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records which fields were checked, failing on a chosen one.
    struct RecordingValidator {
        seen: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingValidator {
        fn new(fail_on: Option<&'static str>) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail_on,
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl FieldValidator for RecordingValidator {
        fn validate(&self, field: &str, _value: &str) -> Result<()> {
            self.seen.lock().unwrap().push(field.to_string());
            if self.fail_on == Some(field) {
                return Err(InstrumentError::validation(field, "rejected"));
            }
            Ok(())
        }
    }

    fn bond_form() -> InstrumentForm {
        InstrumentForm {
            symbol: "SU26240".to_string(),
            full_name: "OFZ 26240".to_string(),
            instrument_type: "bond".to_string(),
            brokers: vec![FIGI_BROKER.to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn bond_fields_are_dispatched_in_contract_order() {
        let validator = RecordingValidator::new(None);
        validate_for_submission(&bond_form(), &validator).unwrap();

        assert_eq!(
            validator.seen(),
            vec![
                "symbol",
                "fullName",
                "lot",
                "minPriceIncrement",
                "figi",
                "initialNominal",
                "nominal",
                "maturityDate",
            ]
        );
    }

    #[test]
    fn crypto_skips_listed_fields() {
        let validator = RecordingValidator::new(None);
        let form = InstrumentForm {
            instrument_type: "cryptocurrency".to_string(),
            ..Default::default()
        };
        validate_for_submission(&form, &validator).unwrap();

        let seen = validator.seen();
        assert!(!seen.contains(&"lot".to_string()));
        assert!(!seen.contains(&"figi".to_string()));
        assert!(seen.contains(&"minNotional".to_string()));
    }

    #[test]
    fn first_failure_short_circuits() {
        let validator = RecordingValidator::new(Some("lot"));
        let err = validate_for_submission(&bond_form(), &validator).unwrap_err();

        assert!(matches!(err, InstrumentError::Validation { ref field, .. } if field == "lot"));
        assert_eq!(validator.seen(), vec!["symbol", "fullName", "lot"]);
    }

    #[test]
    fn required_validator_rejects_blank_values() {
        let validator = RequiredFieldValidator;
        assert!(validator.validate("symbol", "  ").is_err());
        assert!(validator.validate("symbol", "SBER").is_ok());
    }
}
