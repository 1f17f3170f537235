pub mod extractor;
pub mod flow;
pub mod jwt;
pub mod password;
pub mod permission;
