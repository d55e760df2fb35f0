pub mod config;
pub mod error;
pub mod i18n;
pub mod module;
pub mod types;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use i18n::{DefaultLocalizer, Localizer};
pub use module::Module;
pub use types::{new_id, now_rfc3339};
