use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use market_core::{DepthSnapshotEvent, DepthUpdateEvent, Price, PriceLevel, Quantity};

use crate::gateway::domain::{BookKey, BookStore, ExchangeId};

/// A book key qualified with its exchange. The same pair and asset
/// class on two venues are two independent books.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedKey {
    pub exchange: ExchangeId,
    pub book: BookKey,
}

impl QualifiedKey {
    pub fn new(exchange: impl Into<ExchangeId>, book: BookKey) -> Self {
        QualifiedKey {
            exchange: exchange.into(),
            book,
        }
    }
}

impl fmt::Display for QualifiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.book)
    }
}

struct BookState {
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
    last_update_id: u64,
    initialized: bool,
}

impl BookState {
    fn empty() -> Self {
        BookState {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            last_update_id: 0,
            initialized: false,
        }
    }
}

/// Multi-exchange order book store. Thread-safe; cloning shares the
/// underlying books.
#[derive(Clone)]
pub struct OrderBookManager {
    books: Arc<RwLock<HashMap<QualifiedKey, BookState>>>,
}

impl OrderBookManager {
    pub fn new() -> Self {
        OrderBookManager {
            books: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get a query handle to one book.
    pub fn book(&self, exchange: impl Into<ExchangeId>, key: BookKey) -> SharedOrderBook {
        SharedOrderBook {
            manager: self.clone(),
            key: QualifiedKey::new(exchange, key),
        }
    }

    /// View of this store scoped to a single exchange, as handed to
    /// that exchange's synchronization engine.
    pub fn scoped(&self, exchange: impl Into<ExchangeId>) -> ExchangeBooks {
        ExchangeBooks {
            manager: self.clone(),
            exchange: exchange.into(),
        }
    }

    /// List all keys with an initialized book.
    pub fn keys(&self) -> Vec<QualifiedKey> {
        self.books
            .read()
            .iter()
            .filter(|(_, state)| state.initialized)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// List initialized books for one exchange.
    pub fn keys_for_exchange(&self, exchange: &ExchangeId) -> Vec<BookKey> {
        self.books
            .read()
            .iter()
            .filter(|(key, state)| state.initialized && &key.exchange == exchange)
            .map(|(key, _)| key.book.clone())
            .collect()
    }

    fn load_snapshot_internal(&self, key: &QualifiedKey, snapshot: &DepthSnapshotEvent) {
        let mut books = self.books.write();
        let state = books.entry(key.clone()).or_insert_with(BookState::empty);

        state.bids.clear();
        state.asks.clear();
        fill_side(&mut state.bids, &snapshot.bids);
        fill_side(&mut state.asks, &snapshot.asks);
        state.last_update_id = snapshot.last_update_id;
        state.initialized = true;
    }

    fn apply_update_internal(&self, key: &QualifiedKey, update: &DepthUpdateEvent) -> bool {
        let mut books = self.books.write();
        let Some(state) = books.get_mut(key) else {
            return false;
        };

        // Sequence validation lives in the sync engine; reaching an
        // uninitialized or non-advancing book here is an invariant
        // violation.
        if !state.initialized || update.final_update_id <= state.last_update_id {
            return false;
        }

        apply_side(&mut state.bids, &update.bids);
        apply_side(&mut state.asks, &update.asks);
        state.last_update_id = update.final_update_id;
        true
    }

    fn invalidate_internal(&self, key: &QualifiedKey) {
        let mut books = self.books.write();
        if let Some(state) = books.get_mut(key) {
            state.bids.clear();
            state.asks.clear();
            state.last_update_id = 0;
            state.initialized = false;
        }
    }

    fn last_update_id_internal(&self, key: &QualifiedKey) -> u64 {
        self.books
            .read()
            .get(key)
            .filter(|state| state.initialized)
            .map(|state| state.last_update_id)
            .unwrap_or(0)
    }
}

impl Default for OrderBookManager {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_side(side: &mut BTreeMap<Decimal, Decimal>, levels: &[[String; 2]]) {
    for [price, qty] in levels {
        if let (Ok(p), Ok(q)) = (price.parse::<Decimal>(), qty.parse::<Decimal>())
            && !q.is_zero()
        {
            side.insert(p, q);
        }
    }
}

fn apply_side(side: &mut BTreeMap<Decimal, Decimal>, deltas: &[[String; 2]]) {
    for [price, qty] in deltas {
        if let (Ok(p), Ok(q)) = (price.parse::<Decimal>(), qty.parse::<Decimal>()) {
            if q.is_zero() {
                side.remove(&p);
            } else {
                side.insert(p, q);
            }
        }
    }
}

/// Single-exchange view of the store; implements the [`BookStore`]
/// collaborator contract consumed by the synchronization engine.
#[derive(Clone)]
pub struct ExchangeBooks {
    manager: OrderBookManager,
    exchange: ExchangeId,
}

impl ExchangeBooks {
    fn qualify(&self, key: &BookKey) -> QualifiedKey {
        QualifiedKey::new(self.exchange.clone(), key.clone())
    }

    pub fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }
}

impl BookStore for ExchangeBooks {
    fn load_snapshot(&self, key: &BookKey, snapshot: &DepthSnapshotEvent) {
        self.manager.load_snapshot_internal(&self.qualify(key), snapshot);
    }

    fn apply_update(&self, key: &BookKey, update: &DepthUpdateEvent) -> bool {
        self.manager.apply_update_internal(&self.qualify(key), update)
    }

    fn invalidate(&self, key: &BookKey) {
        self.manager.invalidate_internal(&self.qualify(key));
    }

    fn last_update_id(&self, key: &BookKey) -> u64 {
        self.manager.last_update_id_internal(&self.qualify(key))
    }
}

/// Query handle to a single order book within the manager.
#[derive(Clone)]
pub struct SharedOrderBook {
    manager: OrderBookManager,
    key: QualifiedKey,
}

impl SharedOrderBook {
    pub fn qualified_key(&self) -> &QualifiedKey {
        &self.key
    }

    pub fn is_initialized(&self) -> bool {
        self.manager
            .books
            .read()
            .get(&self.key)
            .map(|s| s.initialized)
            .unwrap_or(false)
    }

    pub fn last_update_id(&self) -> u64 {
        self.manager.last_update_id_internal(&self.key)
    }

    /// Best bid (highest buy price).
    pub fn best_bid(&self) -> Option<PriceLevel> {
        let books = self.manager.books.read();
        let state = books.get(&self.key).filter(|s| s.initialized)?;
        state
            .bids
            .iter()
            .next_back()
            .map(|(p, q)| PriceLevel::new(Price::from(*p), Quantity::from(*q)))
    }

    /// Best ask (lowest sell price).
    pub fn best_ask(&self) -> Option<PriceLevel> {
        let books = self.manager.books.read();
        let state = books.get(&self.key).filter(|s| s.initialized)?;
        state
            .asks
            .iter()
            .next()
            .map(|(p, q)| PriceLevel::new(Price::from(*p), Quantity::from(*q)))
    }

    pub fn mid_price(&self) -> Option<Price> {
        let books = self.manager.books.read();
        let state = books.get(&self.key).filter(|s| s.initialized)?;
        let best_bid = state.bids.iter().next_back()?.0;
        let best_ask = state.asks.iter().next()?.0;
        Some(Price::from((*best_bid + *best_ask) / Decimal::TWO))
    }

    pub fn spread(&self) -> Option<Price> {
        let books = self.manager.books.read();
        let state = books.get(&self.key).filter(|s| s.initialized)?;
        let best_bid = state.bids.iter().next_back()?.0;
        let best_ask = state.asks.iter().next()?.0;
        Some(Price::from(*best_ask - *best_bid))
    }

    /// Top N bid levels, best first.
    pub fn top_bids(&self, n: usize) -> Vec<PriceLevel> {
        let books = self.manager.books.read();
        let Some(state) = books.get(&self.key).filter(|s| s.initialized) else {
            return Vec::new();
        };
        state
            .bids
            .iter()
            .rev()
            .take(n)
            .map(|(p, q)| PriceLevel::new(Price::from(*p), Quantity::from(*q)))
            .collect()
    }

    /// Total bid quantity resting at or above `price`.
    pub fn bid_volume_to_price(&self, price: Price) -> Quantity {
        let books = self.manager.books.read();
        let Some(state) = books.get(&self.key).filter(|s| s.initialized) else {
            return Quantity::ZERO;
        };
        let total: Decimal = state.bids.range(price.inner()..).map(|(_, q)| *q).sum();
        Quantity::from(total)
    }

    /// Total ask quantity resting at or below `price`.
    pub fn ask_volume_to_price(&self, price: Price) -> Quantity {
        let books = self.manager.books.read();
        let Some(state) = books.get(&self.key).filter(|s| s.initialized) else {
            return Quantity::ZERO;
        };
        let total: Decimal = state.asks.range(..=price.inner()).map(|(_, q)| *q).sum();
        Quantity::from(total)
    }

    /// Top N ask levels, best first.
    pub fn top_asks(&self, n: usize) -> Vec<PriceLevel> {
        let books = self.manager.books.read();
        let Some(state) = books.get(&self.key).filter(|s| s.initialized) else {
            return Vec::new();
        };
        state
            .asks
            .iter()
            .take(n)
            .map(|(p, q)| PriceLevel::new(Price::from(*p), Quantity::from(*q)))
            .collect()
    }
}
