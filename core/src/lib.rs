pub mod analysis;
pub mod catalog;
pub mod cors;
pub mod error;
pub mod intake;
pub mod prompt;
pub mod scorers;

pub use analysis::{PatternAnalysis, PatternMatch, analyze};
pub use catalog::{PatternCatalog, PatternDefinition, RedFlagRule};
pub use cors::OriginAllowList;
pub use intake::{Intake, IntakeError, RawIntake, normalize_intake};
