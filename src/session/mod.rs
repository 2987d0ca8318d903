pub mod draft;
pub mod quiz;
pub mod record;
pub mod username;
