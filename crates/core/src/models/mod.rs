pub mod cash;
pub mod holdings;
pub mod price;
pub mod series;
pub mod summary;
pub mod transaction;
