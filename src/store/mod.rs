pub mod domain;
pub mod firebase;
pub mod logger;
pub mod push_id;
