//! Single-leg executor (spec.md §4.7): submits stock or single-leg option
//! orders, records fills, and updates the portfolio. Simulated fills use
//! `bar.close` (stock) or a synthesized mid (option) with slippage; real
//! fills go through a `Broker` and are reconciled by order id.

use chrono::{DateTime, Utc};

use crate::data::{Bar, FinalTradeIntent, RegimeSignal};
use crate::enums::{Direction, InstrumentType, OrderSide, OrderType};
use crate::error::{EngineResult, ExecutionError};
use crate::options::format_occ_symbol;

use super::broker::{Broker, OrderAck};
use super::portfolio::Portfolio;

const MAX_BROKER_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy)]
pub enum ExecutionMode {
    Simulated { slippage_pct: f64 },
    Real,
}

pub struct SingleLegExecutor {
    mode: ExecutionMode,
}

impl SingleLegExecutor {
    pub fn new(mode: ExecutionMode) -> Self {
        Self { mode }
    }

    /// Executes one `FinalTradeIntent`, applying the resulting fill to
    /// `portfolio`. Returns the broker order id used, for reconciliation.
    pub fn execute(
        &self,
        final_intent: &FinalTradeIntent,
        bar: &Bar,
        signal: &RegimeSignal,
        broker: &mut dyn Broker,
        portfolio: &mut Portfolio,
    ) -> EngineResult<String> {
        let intent = &final_intent.intent;
        let side = match intent.direction {
            Direction::Long => OrderSide::Buy,
            Direction::Short => OrderSide::Sell,
        };
        let qty = intent.position_delta.abs();

        let (order_id, fill_price) = match self.mode {
            ExecutionMode::Simulated { slippage_pct } => {
                let reference = reference_price(intent, bar);
                let factor = slippage_pct / 100.0;
                let price = match side {
                    OrderSide::Buy => reference * (1.0 + factor),
                    OrderSide::Sell => reference * (1.0 - factor),
                };
                (format!("sim-{}-{}", intent.symbol, bar.ts.timestamp_millis()), price)
            }
            ExecutionMode::Real => {
                let ack = self.submit_with_retry(intent, side, qty, bar, broker)?;
                let price = ack.fill_price.unwrap_or_else(|| reference_price(intent, bar));
                (ack.broker_order_id, price)
            }
        };

        let signed_qty = qty * side_sign(side);
        portfolio.apply_fill(
            &intent.symbol,
            signed_qty,
            fill_price,
            bar.ts,
            &intent.agent_id,
            signal.regime,
            signal.volatility,
            signal.bias,
            None,
            None,
        );

        Ok(order_id)
    }

    fn submit_with_retry(
        &self,
        intent: &crate::data::TradeIntent,
        side: OrderSide,
        qty: f64,
        bar: &Bar,
        broker: &mut dyn Broker,
    ) -> EngineResult<OrderAck> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = if intent.is_option() {
                submit_option(intent, side, qty, bar, broker)
            } else {
                broker.submit_order(&intent.symbol, side, qty, OrderType::Market, None)
            };
            match result {
                Ok(ack) => return Ok(ack),
                Err(_) if attempts < MAX_BROKER_RETRIES => continue,
                Err(_) => return Err(ExecutionError::BrokerTimeout { attempts }.into()),
            }
        }
    }
}

fn submit_option(
    intent: &crate::data::TradeIntent,
    side: OrderSide,
    qty: f64,
    _bar: &Bar,
    broker: &mut dyn Broker,
) -> EngineResult<OrderAck> {
    let option = intent.option.as_ref().ok_or_else(|| {
        ExecutionError::BrokerRejected("option intent missing OptionLeg".to_string())
    })?;
    let occ = format_occ_symbol(&intent.symbol, option.expiry.date_naive(), option.option_type, option.strike)?;
    broker.submit_order(&occ, side, qty, OrderType::Market, None)
}

fn reference_price(intent: &crate::data::TradeIntent, bar: &Bar) -> f64 {
    if intent.instrument_type == InstrumentType::Option {
        bar.close // mid proxy absent a live chain (spec.md §1 Non-goals)
    } else {
        bar.close
    }
}

fn side_sign(side: OrderSide) -> f64 {
    match side {
        OrderSide::Buy => 1.0,
        OrderSide::Sell => -1.0,
    }
}

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TradeIntent;
    use crate::enums::{Bias, RegimeType, TrendDirection, VolatilityLevel};
    use crate::execution::simulated_broker::SimulatedBroker;
    use std::collections::BTreeMap;

    fn bar() -> Bar {
        Bar {
            symbol: "SPY".into(),
            timeframe: "1m".into(),
            ts: Utc::now(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.0,
            volume: 1.0,
            synthetic: false,
        }
    }

    fn signal() -> RegimeSignal {
        RegimeSignal {
            symbol: "SPY".into(),
            ts: Utc::now(),
            regime: RegimeType::Trend,
            direction: TrendDirection::Up,
            volatility: VolatilityLevel::Medium,
            bias: Bias::Long,
            confidence: 0.8,
            features: BTreeMap::new(),
        }
    }

    #[test]
    fn simulated_fill_applies_to_portfolio() {
        let executor = SingleLegExecutor::new(ExecutionMode::Simulated { slippage_pct: 0.0 });
        let mut broker = SimulatedBroker::new(100_000.0, 0.0);
        let mut portfolio = Portfolio::new();
        let fi = FinalTradeIntent {
            intent: TradeIntent {
                symbol: "SPY".into(),
                instrument_type: InstrumentType::Stock,
                direction: Direction::Long,
                position_delta: 10.0,
                confidence: 0.8,
                agent_id: "trend".into(),
                reason: "test".into(),
                option: None,
                metadata: BTreeMap::new(),
            },
            score: 0.8,
            blended_from: None,
        };
        executor.execute(&fi, &bar(), &signal(), &mut broker, &mut portfolio).unwrap();
        assert_eq!(portfolio.position("SPY").unwrap().quantity, 10.0);
    }
}
