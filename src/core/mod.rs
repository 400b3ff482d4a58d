pub mod error;
pub mod field;
pub mod scalars;
pub mod value;

pub use error::{Result, StoreError, TransportError};
pub use field::Maybe;
pub use scalars::{FuzzyDate, Timestamp};
pub use value::{Related, Value};
