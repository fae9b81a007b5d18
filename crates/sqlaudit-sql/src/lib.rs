//! SQL text analysis for the audit driver: which statements modify data,
//! which table they target, and their fully literal form.

pub mod classifier;
pub mod interpolate;
pub mod table_action;

pub use classifier::{strip_leading, Classification, HeuristicClassifier, StatementClassifier};
pub use interpolate::{format_value, interpolate};
pub use table_action::{RegexExtractor, TableAction, TableActionExtractor};
