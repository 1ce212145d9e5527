//! Domain layer - core types shared by every other layer.

pub mod quote;
pub mod trading;

pub use quote::{Quote, QuoteCache, QuoteResult, SPOT_PRICE_DIGITS, price_from_spot};
pub use trading::{
    AccountSnapshot, Bar, Credentials, Environment, OrderReceipt, PositionInfo, SymbolInfo,
    TradeDirection, TradingAccount, VOLUME_SCALE, money_from_minor, volume_from_upstream,
    volume_to_upstream,
};
