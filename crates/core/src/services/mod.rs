pub mod cash_service;
pub mod holdings_service;
pub mod price_service;
pub mod valuation_service;

pub use cash_service::CashService;
pub use holdings_service::HoldingsService;
pub use price_service::PriceService;
pub use valuation_service::ValuationService;
