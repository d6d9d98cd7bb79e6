//! Request extractors that reject malformed input with a 422 and a
//! structured [`ErrorResponse`](crate::errors::ErrorResponse).

pub mod uuid_path;
pub mod validated;

pub use uuid_path::UuidPath;
pub use validated::{ValidatedForm, ValidatedJson, ValidatedQuery};
