pub mod membership;
pub mod password;
pub mod sanitize;
pub mod token;
