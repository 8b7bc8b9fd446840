pub(crate) mod extractors;
pub mod password;
pub mod token;
