use serde::Deserialize;

use crate::enums::{OrderSide, OrderStatus, OrderType};
use crate::error::{EngineResult, ExecutionError};

use super::broker::{AccountInfo, Broker, BrokerPosition, OptionBroker, OrderAck};

/// Live broker adapter over a REST API, used only when `mode = live` and
/// `BROKER_MODE` resolves to a real account (spec.md §6). Blocking calls
/// are deliberate: the scheduler is single-threaded (spec.md §5), so an
/// async client would buy nothing here.
pub struct HttpBroker {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    paper: bool,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
    fill_price: Option<f64>,
}

#[derive(Deserialize)]
struct AccountResponse {
    equity: f64,
    cash: f64,
    is_paper: bool,
}

impl HttpBroker {
    /// Resolves `paper` from a live `get_account()` call rather than
    /// trusting the caller, so the spec.md §6 pre-flight check can actually
    /// see a non-paper account and refuse to start live trading.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: std::time::Duration) -> EngineResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExecutionError::BrokerRejected(e.to_string()))?;
        let mut broker = Self { client, base_url: base_url.into(), api_key: api_key.into(), paper: true };
        let account = broker.get_account()?;
        broker.paper = account.is_paper;
        Ok(broker)
    }

    fn parse_status(raw: &str) -> OrderStatus {
        OrderStatus::from_str_tagged_fallback(raw)
    }

    fn post_order(&self, path: &str, body: serde_json::Value) -> EngineResult<OrderAck> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| ExecutionError::BrokerRejected(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ExecutionError::BrokerRejected(format!("http {}", resp.status())).into());
        }
        let parsed: OrderResponse = resp.json().map_err(|e| ExecutionError::BrokerRejected(e.to_string()))?;
        Ok(OrderAck {
            broker_order_id: parsed.id,
            status: Self::parse_status(&parsed.status),
            fill_price: parsed.fill_price,
        })
    }
}

/// Tolerant status parsing for upstream strings that don't exactly match
/// our tag set; unknown strings map to `Pending` rather than erroring,
/// since a broker status string failing open to "unknown yet" is safer
/// than rejecting the fill update outright.
trait FallbackOrderStatus {
    fn from_str_tagged_fallback(raw: &str) -> OrderStatus;
}

impl FallbackOrderStatus for OrderStatus {
    fn from_str_tagged_fallback(raw: &str) -> OrderStatus {
        use crate::enums::TaggedEnum;
        OrderStatus::from_str_tagged(raw).unwrap_or(OrderStatus::Pending)
    }
}

impl Broker for HttpBroker {
    fn submit_order(
        &mut self,
        symbol: &str,
        side: OrderSide,
        qty: f64,
        order_type: OrderType,
        limit: Option<f64>,
    ) -> EngineResult<OrderAck> {
        use crate::enums::TaggedEnum;
        self.post_order(
            "/v1/orders",
            serde_json::json!({
                "symbol": symbol,
                "side": side.as_str(),
                "qty": qty,
                "type": order_type.as_str(),
                "limit_price": limit,
            }),
        )
    }

    fn cancel_order(&mut self, id: &str) -> EngineResult<()> {
        let resp = self
            .client
            .delete(format!("{}/v1/orders/{id}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| ExecutionError::BrokerRejected(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ExecutionError::BrokerRejected(format!("http {}", resp.status())).into());
        }
        Ok(())
    }

    fn get_order(&self, id: &str) -> EngineResult<OrderAck> {
        let resp = self
            .client
            .get(format!("{}/v1/orders/{id}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| ExecutionError::BrokerRejected(e.to_string()))?;
        let parsed: OrderResponse = resp.json().map_err(|e| ExecutionError::BrokerRejected(e.to_string()))?;
        Ok(OrderAck {
            broker_order_id: parsed.id,
            status: Self::parse_status(&parsed.status),
            fill_price: parsed.fill_price,
        })
    }

    fn get_positions(&self) -> EngineResult<Vec<BrokerPosition>> {
        #[derive(Deserialize)]
        struct Raw {
            symbol: String,
            qty: f64,
        }
        let resp = self
            .client
            .get(format!("{}/v1/positions", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| ExecutionError::BrokerRejected(e.to_string()))?;
        let parsed: Vec<Raw> = resp.json().map_err(|e| ExecutionError::BrokerRejected(e.to_string()))?;
        Ok(parsed.into_iter().map(|r| BrokerPosition { symbol: r.symbol, quantity: r.qty }).collect())
    }

    fn get_account(&self) -> EngineResult<AccountInfo> {
        let resp = self
            .client
            .get(format!("{}/v1/account", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| ExecutionError::BrokerRejected(e.to_string()))?;
        let parsed: AccountResponse = resp.json().map_err(|e| ExecutionError::BrokerRejected(e.to_string()))?;
        Ok(AccountInfo { equity: parsed.equity, cash: parsed.cash, is_paper: parsed.is_paper })
    }

    fn is_paper(&self) -> bool {
        self.paper
    }
}

impl OptionBroker for HttpBroker {
    fn submit_option_order(
        &mut self,
        occ_symbol: &str,
        side: OrderSide,
        qty: f64,
        limit: Option<f64>,
    ) -> EngineResult<OrderAck> {
        use crate::enums::TaggedEnum;
        self.post_order(
            "/v1/options/orders",
            serde_json::json!({
                "occ_symbol": occ_symbol,
                "side": side.as_str(),
                "qty": qty,
                "limit_price": limit,
            }),
        )
    }
}
