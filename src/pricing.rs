use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("discount percent must be between 0 and 100, got {0}")]
    InvalidPercent(i64),
}

/// calculate_discount
///
/// Price after taking `percent` off, in the same integer unit as `Course::price`.
/// The discount amount is rounded down, so the customer never pays less than the exact
/// discounted price.
pub fn calculate_discount(price: i64, percent: i64) -> Result<i64, PricingError> {
    if !(0..=100).contains(&percent) {
        return Err(PricingError::InvalidPercent(percent));
    }
    let discount = i128::from(price) * i128::from(percent) / 100;
    // |discount| <= |price|, so the result always fits back into i64.
    Ok(price - i64::try_from(discount).unwrap_or(0))
}
