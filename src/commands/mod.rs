pub mod outline;
pub mod search;
