//! Pure circulation rules: date arithmetic, fines, ledger projections and
//! the role/permission gate.
//!
//! Nothing in this module performs I/O or holds state; every function is
//! deterministic in its inputs and the fixed library calendar constants.

pub mod calendar;
pub mod fines;
pub mod ledger;
pub mod permissions;

/// Copy count below which a title becomes reservable instead of directly
/// borrowable-with-certainty
pub const LOW_STOCK_THRESHOLD: u32 = 10;
