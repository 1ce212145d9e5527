//! Last-known-price store shared across connections.
//!
//! The cache is scoped per environment, not per account: price feeds are
//! account-independent, so a quote observed by one connection serves every
//! caller in that environment. Entries are only ever overwritten or merged,
//! never deleted; prices outlive the socket that observed them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;

/// Implied decimal digits in spot price fields on the wire.
pub const SPOT_PRICE_DIGITS: u32 = 5;

/// Convert a raw wire spot price into a decimal price.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn price_from_spot(raw: u64) -> Decimal {
    Decimal::new(raw as i64, SPOT_PRICE_DIGITS)
}

/// Last known prices for one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    /// Symbol the prices are for.
    pub symbol_id: i64,
    /// Bid price; zero when no bid has been observed yet.
    pub bid: Decimal,
    /// Ask price; zero when no ask has been observed yet.
    pub ask: Decimal,
    /// Time of the most recent update.
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Whether both sides have been observed.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.bid > Decimal::ZERO && self.ask > Decimal::ZERO
    }
}

/// Shared, merge-only quote store for one environment.
///
/// Owned by the bridge and handed to every connection in the environment by
/// reference; a push may carry only one side, and the merge keeps whichever
/// side the new message does not carry.
#[derive(Debug, Default)]
pub struct QuoteCache {
    entries: RwLock<HashMap<i64, Quote>>,
    updated: Notify,
}

impl QuoteCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known quote for a symbol.
    #[must_use]
    pub fn get(&self, symbol_id: i64) -> Option<Quote> {
        self.entries.read().get(&symbol_id).copied()
    }

    /// Merge a (possibly one-sided) price update and wake waiters.
    pub fn merge(
        &self,
        symbol_id: i64,
        bid: Option<Decimal>,
        ask: Option<Decimal>,
        timestamp: DateTime<Utc>,
    ) {
        {
            let mut entries = self.entries.write();
            let entry = entries.entry(symbol_id).or_insert(Quote {
                symbol_id,
                bid: Decimal::ZERO,
                ask: Decimal::ZERO,
                timestamp,
            });
            if let Some(bid) = bid {
                entry.bid = bid;
            }
            if let Some(ask) = ask {
                entry.ask = ask;
            }
            entry.timestamp = timestamp;
        }
        self.updated.notify_waiters();
    }

    /// A future that resolves on the next cache update.
    ///
    /// Obtain the future before re-checking the cache so an update landing
    /// between the check and the await is not missed.
    #[must_use]
    pub fn notified(&self) -> Notified<'_> {
        self.updated.notified()
    }

    /// Number of symbols with at least one observed side.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Outcome of a quote lookup.
///
/// A quote request never fails on live market state: when the instrument is
/// not trading the result is a zero quote flagged `market_closed`, and a
/// socket drop mid-wait degrades to the last cached value flagged
/// `connection_lost`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    /// Symbol the result is for.
    pub symbol_id: i64,
    /// Bid price; zero when never observed.
    pub bid: Decimal,
    /// Ask price; zero when never observed.
    pub ask: Decimal,
    /// Time of the underlying cache entry, when one exists.
    pub timestamp: Option<DateTime<Utc>>,
    /// No price was observed within the wait window.
    pub market_closed: bool,
    /// The wait window elapsed and the value is the last cached one.
    pub stale: bool,
    /// The connection dropped mid-wait; value is the last cached one.
    pub connection_lost: bool,
}

impl QuoteResult {
    /// A live, fully populated quote.
    #[must_use]
    pub fn live(quote: Quote) -> Self {
        Self {
            symbol_id: quote.symbol_id,
            bid: quote.bid,
            ask: quote.ask,
            timestamp: Some(quote.timestamp),
            market_closed: false,
            stale: false,
            connection_lost: false,
        }
    }

    /// The wait window elapsed; return what the cache had.
    #[must_use]
    pub fn stale(quote: Quote) -> Self {
        Self {
            stale: true,
            ..Self::live(quote)
        }
    }

    /// The socket dropped mid-wait; return what the cache had, if anything.
    #[must_use]
    pub fn connection_lost(symbol_id: i64, quote: Option<Quote>) -> Self {
        match quote {
            Some(quote) => Self {
                connection_lost: true,
                ..Self::live(quote)
            },
            None => Self {
                symbol_id,
                bid: Decimal::ZERO,
                ask: Decimal::ZERO,
                timestamp: None,
                market_closed: false,
                stale: false,
                connection_lost: true,
            },
        }
    }

    /// Nothing was ever cached: the instrument is not currently trading.
    #[must_use]
    pub fn market_closed(symbol_id: i64) -> Self {
        Self {
            symbol_id,
            bid: Decimal::ZERO,
            ask: Decimal::ZERO,
            timestamp: None,
            market_closed: true,
            stale: false,
            connection_lost: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn merge_keeps_missing_side() {
        let cache = QuoteCache::new();

        cache.merge(1, Some(Decimal::new(1_12345, 5)), None, now());
        let quote = cache.get(1).unwrap();
        assert_eq!(quote.bid, Decimal::new(1_12345, 5));
        assert_eq!(quote.ask, Decimal::ZERO);
        assert!(!quote.is_fresh());

        cache.merge(1, None, Some(Decimal::new(1_12360, 5)), now());
        let quote = cache.get(1).unwrap();
        assert_eq!(quote.bid, Decimal::new(1_12345, 5));
        assert_eq!(quote.ask, Decimal::new(1_12360, 5));
        assert!(quote.is_fresh());
    }

    #[test]
    fn merge_overwrites_present_side() {
        let cache = QuoteCache::new();

        cache.merge(
            1,
            Some(Decimal::new(1_00000, 5)),
            Some(Decimal::new(1_00010, 5)),
            now(),
        );
        cache.merge(1, Some(Decimal::new(1_00005, 5)), None, now());

        let quote = cache.get(1).unwrap();
        assert_eq!(quote.bid, Decimal::new(1_00005, 5));
        assert_eq!(quote.ask, Decimal::new(1_00010, 5));
    }

    #[test]
    fn entries_survive_without_deletion() {
        let cache = QuoteCache::new();
        cache.merge(1, Some(Decimal::ONE), Some(Decimal::ONE), now());
        cache.merge(2, Some(Decimal::ONE), None, now());
        assert_eq!(cache.len(), 2);
        assert!(!cache.is_empty());
    }

    #[tokio::test]
    async fn notified_wakes_on_merge() {
        let cache = std::sync::Arc::new(QuoteCache::new());

        let waiter = {
            let cache = std::sync::Arc::clone(&cache);
            tokio::spawn(async move {
                cache.notified().await;
                cache.get(9)
            })
        };

        tokio::task::yield_now().await;
        cache.merge(9, Some(Decimal::ONE), Some(Decimal::ONE), now());

        let quote = tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(quote.unwrap().is_fresh());
    }

    #[test]
    fn spot_price_conversion() {
        assert_eq!(price_from_spot(1_12345), Decimal::new(1_12345, 5));
        assert_eq!(price_from_spot(0), Decimal::ZERO);
    }
}
