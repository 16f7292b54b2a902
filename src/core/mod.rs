pub mod error;

pub use error::{ErrorTranslator, Result, SessionError};
