//! Execution layer (spec.md §4.7): broker plug-ins, the single-leg
//! executor, and portfolio position math.

pub mod broker;
mod executor;
mod http_broker;
mod portfolio;
pub mod simulated_broker;

pub use broker::{AccountInfo, Broker, BrokerPosition, OptionBroker, OrderAck};
pub use executor::{ExecutionMode, SingleLegExecutor};
pub use http_broker::HttpBroker;
pub use portfolio::Portfolio;
pub use simulated_broker::SimulatedBroker;
