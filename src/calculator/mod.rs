//! MTF return calculation: charge schedule and profit/loss engine.

mod engine;
mod schedule;

pub use engine::{CalcError, MtfCalculator};
pub use schedule::ChargeSchedule;
