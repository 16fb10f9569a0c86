pub mod bundle;
pub mod core;
pub mod errors;
pub mod examples;
pub mod identity;
pub mod inspect;
pub mod result;
pub mod schema;
pub mod validate;
pub mod validator;
