//! Layered error taxonomy for the engine.
//!
//! Every subsystem gets its own error enum; `EngineError` unifies them via
//! `#[from]` so call sites can propagate with `?` regardless of which layer
//! raised. Two classes of failure described in the design (`RiskBlock`,
//! `CreditMismatch`) are deliberately *not* represented here: they are
//! non-fatal events recorded on the event sink (see `crate::events`), never
//! `Err` values.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Exit-code plane for the replay binary (spec.md §6 "Exit codes"): 1
    /// execution-plane, 2 data-plane, 3 decision-plane.
    pub fn exit_code(&self) -> u8 {
        match self {
            EngineError::Data(_) | EngineError::Config(_) => 2,
            EngineError::Agent(_) => 3,
            EngineError::Execution(_) | EngineError::Reconcile(_) => 1,
        }
    }
}

/// Errors from the data feed / feature / regime layer.
#[derive(Debug, Error, Clone)]
pub enum DataError {
    #[error("strict_data_mode is set and the feed would have synthesized a bar for {symbol}")]
    DataMissing { symbol: String },

    #[error("insufficient history for {symbol}: have {have}, need {need}")]
    InsufficientHistory {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("invalid enum string '{value}' for {type_name}")]
    InvalidEnumString { type_name: &'static str, value: String },

    #[error("invalid OCC option symbol '{0}'")]
    InvalidOccSymbol(String),

    #[error("feed error: {0}")]
    Feed(String),
}

/// Errors raised by individual agents during evaluation.
#[derive(Debug, Error, Clone)]
pub enum AgentError {
    #[error("agent '{agent_id}' failed: {reason}")]
    Failed { agent_id: String, reason: String },

    /// Fatal: every enabled agent failed on the same bar. The scheduler
    /// escalates this to a halt with `stop_reason = "error"`.
    #[error("all {count} enabled agents failed on the same bar")]
    AllAgentsFailed { count: usize },
}

/// Errors from order submission, fills, and broker interaction.
#[derive(Debug, Error, Clone)]
pub enum ExecutionError {
    #[error("broker rejected order: {0}")]
    BrokerRejected(String),

    #[error("broker call timed out after {attempts} attempts")]
    BrokerTimeout { attempts: u32 },

    #[error("leg '{leg}' of package {package_id} was rejected")]
    LegRejected { package_id: String, leg: String },

    #[error("attempted to operate on an already-closed package {0}")]
    PackageClosed(String),

    #[error("order id {0} not found")]
    OrderNotFound(String),
}

/// Errors surfaced by the reconciliation tool.
#[derive(Debug, Error, Clone)]
pub enum ReconcileError {
    #[error(
        "state mismatch for package {package_id}: computed_pnl={computed_pnl}, stored_pnl={stored_pnl}, legs={leg_ids:?}"
    )]
    StateMismatch {
        package_id: String,
        computed_pnl: f64,
        stored_pnl: f64,
        leg_ids: Vec<String>,
    },
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error, Clone)]
pub enum ConfigError {
    #[error("invalid replay speed {0}: must be in [1, 3000]")]
    InvalidReplaySpeed(f64),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("missing required config key: {0}")]
    MissingKey(&'static str),
}
