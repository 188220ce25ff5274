//! Built-in check modules, one or more per category.

mod access;
mod accessibility;
mod api;
mod links;
mod performance;
mod security;
mod seo;

pub use access::AccessControlCheck;
pub use accessibility::AccessibilityCheck;
pub use api::ApiContractCheck;
pub use links::LinkIntegrityCheck;
pub use performance::PerformanceCheck;
pub use security::SecurityHeadersCheck;
pub use seo::{SeoCheck, MAX_TITLE_CHARS};
