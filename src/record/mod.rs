//! Badge and user records: data model, preprocessing, and kind detection.

pub mod detect;
pub mod preprocess;
pub mod types;

pub use detect::detect;
pub use preprocess::{preprocessor_for, ProcessedRecord, Preprocessor};
pub use types::{parse_id_list, Badge, Namespace, User, UserProfile};
