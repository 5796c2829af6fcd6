/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Monetary amounts (IDR) are carried as `f64`; comparisons go through
/// [`approx_eq`].
pub type Amount = f64;

/// Relative tolerance used when comparing monetary amounts. At salary
/// magnitudes (1e7) this is roughly one hundredth of a rupiah.
pub const MONEY_TOLERANCE: Amount = 1e-9;

/// Compare two amounts within [`MONEY_TOLERANCE`], scaled by magnitude.
pub fn approx_eq(a: Amount, b: Amount) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= MONEY_TOLERANCE * scale
}
