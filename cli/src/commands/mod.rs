pub mod analyze;
pub mod consult;
pub mod cors;
pub mod health;
