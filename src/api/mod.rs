pub mod format;
pub mod requests;
pub mod validation;
