//! Broker plug-in surface (spec.md §6). `Broker` covers stock orders;
//! `OptionBroker` extends it with the OCC-symbol order path used by the
//! single-leg and multi-leg option executors.

use crate::enums::{OrderSide, OrderStatus, OrderType};
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct OrderAck {
    pub broker_order_id: String,
    pub status: OrderStatus,
    pub fill_price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub equity: f64,
    pub cash: f64,
    pub is_paper: bool,
}

#[derive(Debug, Clone)]
pub struct BrokerPosition {
    pub symbol: String,
    pub quantity: f64,
}

pub trait Broker {
    fn submit_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        qty: f64,
        order_type: OrderType,
        limit: Option<f64>,
    ) -> EngineResult<OrderAck>;

    fn cancel_order(&mut self, id: &str) -> EngineResult<()>;

    fn get_order(&self, id: &str) -> EngineResult<OrderAck>;

    fn get_positions(&self) -> EngineResult<Vec<BrokerPosition>>;

    fn get_account(&self) -> EngineResult<AccountInfo>;

    /// Hard pre-flight check (spec.md §6): the engine refuses to start live
    /// trading when credentials resolve to a non-paper account under
    /// `BROKER_MODE=PAPER`.
    fn is_paper(&self) -> bool;

    /// Sets the price the next simulated fill should use. Live adapters
    /// fill at the exchange's own price and ignore this; only simulated
    /// brokers act on it.
    fn set_reference_price(&mut self, _price: f64) {}
}

pub trait OptionBroker: Broker {
    fn submit_option_order(
        &mut self,
        occ_symbol: &str,
        side: OrderSide,
        qty: f64,
        limit: Option<f64>,
    ) -> EngineResult<OrderAck>;
}
