use std::collections::HashMap;

use uuid::Uuid;

use crate::enums::{OrderSide, OrderStatus, OrderType};
use crate::error::EngineResult;

use super::broker::{AccountInfo, Broker, BrokerPosition, OptionBroker, OrderAck};

/// In-memory broker used for offline replay and unit tests: every order
/// fills immediately at the caller-supplied reference price with
/// configurable slippage (spec.md §4.7 "simulated mode").
#[derive(Debug)]
pub struct SimulatedBroker {
    slippage_pct: f64,
    cash: f64,
    positions: HashMap<String, f64>,
    orders: HashMap<String, OrderAck>,
    next_reference_price: f64,
}

impl SimulatedBroker {
    pub fn new(starting_cash: f64, slippage_pct: f64) -> Self {
        Self {
            slippage_pct,
            cash: starting_cash,
            positions: HashMap::new(),
            orders: HashMap::new(),
            next_reference_price: 0.0,
        }
    }

    /// Sets the reference price the next `submit_order`/`submit_option_order`
    /// call fills against; the executor calls this once per bar before
    /// submitting that bar's orders.
    pub fn set_reference_price(&mut self, price: f64) {
        self.next_reference_price = price;
    }

    fn slipped_price(&self, side: OrderSide) -> f64 {
        let factor = self.slippage_pct / 100.0;
        match side {
            OrderSide::Buy => self.next_reference_price * (1.0 + factor),
            OrderSide::Sell => self.next_reference_price * (1.0 - factor),
        }
    }

    fn fill(&mut self, symbol: &str, side: OrderSide, qty: f64) -> OrderAck {
        let price = self.slipped_price(side);
        let signed_qty = match side {
            OrderSide::Buy => qty,
            OrderSide::Sell => -qty,
        };
        *self.positions.entry(symbol.to_string()).or_insert(0.0) += signed_qty;
        self.cash -= signed_qty * price;

        let id = Uuid::new_v4().to_string();
        let ack = OrderAck {
            broker_order_id: id.clone(),
            status: OrderStatus::Filled,
            fill_price: Some(price),
        };
        self.orders.insert(id, ack.clone());
        ack
    }
}

impl Broker for SimulatedBroker {
    fn submit_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        qty: f64,
        _order_type: OrderType,
        _limit: Option<f64>,
    ) -> EngineResult<OrderAck> {
        Ok(self.fill(symbol, side, qty))
    }

    fn cancel_order(&mut self, id: &str) -> EngineResult<()> {
        self.orders.remove(id);
        Ok(())
    }

    fn get_order(&self, id: &str) -> EngineResult<OrderAck> {
        self.orders
            .get(id)
            .cloned()
            .ok_or_else(|| crate::error::ExecutionError::OrderNotFound(id.to_string()).into())
    }

    fn get_positions(&self) -> EngineResult<Vec<BrokerPosition>> {
        Ok(self
            .positions
            .iter()
            .map(|(symbol, quantity)| BrokerPosition { symbol: symbol.clone(), quantity: *quantity })
            .collect())
    }

    fn get_account(&self) -> EngineResult<AccountInfo> {
        Ok(AccountInfo { equity: self.cash, cash: self.cash, is_paper: true })
    }

    fn is_paper(&self) -> bool {
        true
    }

    fn set_reference_price(&mut self, price: f64) {
        self.next_reference_price = price;
    }
}

impl OptionBroker for SimulatedBroker {
    fn submit_option_order(
        &mut self,
        occ_symbol: &str,
        side: OrderSide,
        qty: f64,
        _limit: Option<f64>,
    ) -> EngineResult<OrderAck> {
        Ok(self.fill(occ_symbol, side, qty))
    }
}
