//! Entity validation before writes.
//!
//! Validation returns the entity back on success so callers can chain it into
//! the insert set, or every field error at once on failure. A rejected entity
//! is skipped by the caller; it never aborts a batch.

use std::{collections::BTreeMap, fmt};

use crate::{
    config::ValidationRules,
    models::{NewOffer, NewStock},
};

/// Field errors collected while validating one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<&'static str, Vec<String>>,
}

impl ValidationErrors {
    /// Records a message against `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_default().push(message.into());
    }

    /// True when no error was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded for `field`.
    pub fn field(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn check_len(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &str,
    max: usize,
) {
    if value.trim().is_empty() {
        errors.add(field, "must not be empty");
    } else if value.chars().count() > max {
        errors.add(field, format!("must be at most {max} characters"));
    }
}

/// Checks an offer about to be created.
pub fn validate_offer(offer: NewOffer, rules: &ValidationRules) -> Result<NewOffer, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    check_len(&mut errors, "name", &offer.name, rules.max_name_len);
    check_len(&mut errors, "id_at_providers", &offer.id_at_providers, rules.max_reference_len);
    check_len(&mut errors, "id_at_provider", &offer.id_at_provider, rules.max_reference_len);
    if offer.subcategory_id.trim().is_empty() {
        errors.add("subcategory_id", "must not be empty");
    }

    errors.into_result(offer)
}

/// Checks a stock about to be created.
pub fn validate_stock(stock: NewStock, rules: &ValidationRules) -> Result<NewStock, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    check_len(&mut errors, "id_at_providers", &stock.id_at_providers, rules.max_reference_len);
    if stock.quantity.is_some_and(|q| q < 0) {
        errors.add("quantity", "must be positive");
    }
    if stock.price_cents < 0 {
        errors.add("price", "must be positive");
    } else if stock.price_cents > rules.max_price.cents() {
        errors.add("price", format!("must not exceed {}", rules.max_price));
    }

    errors.into_result(stock)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(name: &str, reference: &str) -> NewOffer {
        NewOffer {
            venue_id: 1,
            product_id: 1,
            name: name.to_string(),
            description: None,
            extra_data: None,
            subcategory_id: "LIVRE_PAPIER".to_string(),
            booking_email: None,
            withdrawal_details: None,
            id_at_providers: reference.to_string(),
            id_at_provider: "9782070360024".to_string(),
            last_provider_id: Some(1),
            date_modified: "2025-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn stock(price_cents: i64) -> NewStock {
        NewStock {
            offer_id: 1,
            quantity: Some(3),
            raw_provider_quantity: Some(3),
            price_cents,
            booking_limit_datetime: None,
            id_at_providers: "9782070360024@12345678900012".to_string(),
            last_provider_id: Some(1),
            date_modified: "2025-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn valid_offer_passes_through() {
        let o = offer("L'Étranger", "9782070360024@12345678900012");
        assert_eq!(validate_offer(o.clone(), &ValidationRules::default()), Ok(o));
    }

    #[test]
    fn offer_errors_are_collected() {
        let long = "x".repeat(141);
        let errs = validate_offer(offer(&long, " "), &ValidationRules::default()).unwrap_err();

        assert_eq!(errs.field("name").len(), 1);
        assert_eq!(errs.field("id_at_providers").len(), 1);
        insta::assert_snapshot!(errs.to_string(), @"id_at_providers: must not be empty; name: must be at most 140 characters");
    }

    #[test]
    fn stock_price_is_capped() {
        let rules = ValidationRules::default();
        assert!(validate_stock(stock(30_000), &rules).is_ok());

        let errs = validate_stock(stock(30_001), &rules).unwrap_err();
        insta::assert_snapshot!(errs.to_string(), @"price: must not exceed 300.00");
    }
}
