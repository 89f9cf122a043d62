//! General functions related to finance.
//!
//! Every investable asset (storage, inverter, PV) is annualised with the same capital
//! recovery factor so that multi-year investments are comparable with yearly tariffs.
use crate::units::Dimensionless;

/// Calculates the capital recovery factor (CRF) for a given lifetime and interest rate.
///
/// The CRF is used to annualise capital costs over the economic lifetime of an asset.
pub fn capital_recovery_factor(lifetime: u32, interest_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if interest_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(lifetime as f64);
    }
    let factor = (Dimensionless(1.0) + interest_rate).powi(lifetime as i32);
    (interest_rate * factor) / (factor - Dimensionless(1.0))
}

/// Calculates the yearly annuity of an investment per unit of installed capacity.
///
/// This is a pure function of its inputs; the capacity multiplier is applied by the
/// caller, which lets it serve both as an objective coefficient (capacity 1) and as a
/// post-solve cost bucket.
pub fn annuity_per_unit<C>(investment_per_unit: C, lifetime: u32, interest_rate: Dimensionless) -> C
where
    C: std::ops::Mul<Dimensionless, Output = C>,
{
    investment_per_unit * capital_recovery_factor(lifetime, interest_rate)
}
