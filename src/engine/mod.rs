//! Núcleo determinístico: APY, boost, LTV e accrual sobre valores inteiros (6 casas USD).

pub mod amount;
pub mod boost;
pub mod collateral;
pub mod error;
pub mod error_catalog;
pub mod error_map;
pub mod guardrails;
pub mod lifecycle;
pub mod memory;
pub mod oracle;
pub mod pool;
pub mod ports;
pub mod reference;
pub mod service;
pub mod types;
pub mod yield_calc;

pub use amount::Amount;
pub use boost::BoostEngine;
pub use error::{EngineError, Result};
pub use error_catalog::EngineErrorCode;
pub use oracle::PriceOracleAggregator;
pub use service::{Actor, WexelService};
pub use types::{BoostRecord, Bps, Deposit, DepositStatus, Pool, PoolId, PoolTerms, PriceQuote, WexelId};
pub use yield_calc::{DepositProjection, PayoutFrequency, YieldProjection};
