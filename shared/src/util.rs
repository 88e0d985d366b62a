//! Small shared helpers

/// Currency units that earn one star (rounded up)
pub const UNITS_PER_STAR: i64 = 350;

/// Stars earned for an amount in the smallest currency unit.
///
/// Rounds up, so any positive amount earns at least one star.
pub fn stars_for_amount(amount: i64) -> i64 {
    if amount <= 0 {
        return 0;
    }
    amount / UNITS_PER_STAR + i64::from(amount % UNITS_PER_STAR != 0)
}
