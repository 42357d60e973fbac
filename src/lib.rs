//! Payment order lifecycle engine.
//!
//! Drives payment and payout orders through a small terminal state machine
//! (`CREATED -> PROCESS -> {SUCCESS, FAILURE}`) against pluggable provider
//! adapters, with a deferred ledger operation queue that applies or
//! compensates money movements exactly once when an order finalizes, and an
//! append-only audit log of every provider call.
//!
//! The crate is transport-agnostic: embedders feed it [`RequestInfo`]
//! values built from their HTTP layer (or synthetically from a CLI or test
//! harness) and answer provider callbacks with the `response_text` the
//! engine returns.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use payflow::*;
//! # async fn demo() -> PaymentResult<()> {
//! let methods = Arc::new(MethodRegistry::new());
//! let mut providers = ProviderRegistry::new();
//! providers.register(Arc::new(ManualAdapter::new(
//!     "https://pay.example/manual".to_string(),
//! )));
//!
//! let engine = PaymentEngine::new(
//!     PaymentConfig::from_env()?,
//!     methods,
//!     Arc::new(providers),
//!     Arc::new(InMemoryOrderStore::new()),
//!     Arc::new(InMemoryLedger::new()),
//!     Arc::new(FixedRateConverter::new()),
//!     Arc::new(InMemoryCallLogStore::new()),
//! );
//!
//! let order = engine
//!     .create_order("manual_usd", 7, "USD", 10_000, CreateOrderParams::default())
//!     .await?;
//! let process = engine.start(order.id, &RequestInfo::default()).await?;
//! # let _ = process;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod commission;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod money;
pub mod order;
pub mod provider;
pub mod request;
pub mod store;

pub use audit::{CallLogStore, InMemoryCallLogStore, ProviderCallLog};
pub use commission::{calculate_out_amount, CommissionSnapshot, OutAmount};
pub use config::PaymentConfig;
pub use engine::PaymentEngine;
pub use error::{PaymentError, PaymentResult};
pub use events::{LifecycleListener, LifecycleStage, PaymentProcessEvent};
pub use ledger::{InMemoryLedger, Ledger, LedgerError, LedgerOperation};
pub use money::{CurrencyConverter, FixedRateConverter, RateDirection};
pub use order::{
    CreateOrderParams, MethodRegistry, PaymentDirection, PaymentMethod, PaymentOrder,
    PaymentOrderItem, PaymentProcess, PaymentStatus,
};
pub use provider::{
    CardBridgeAdapter, CardBridgeConfig, FormGateAdapter, FormGateConfig, ManualAdapter,
    ProviderAdapter, ProviderCall, ProviderHttpClient, ProviderRegistry, WithdrawProvider,
};
pub use request::RequestInfo;
pub use store::{FinalizeOutcome, InMemoryOrderStore, OrderStore};

/// Installs a global tracing subscriber honoring `RUST_LOG`. Intended for
/// binaries and test harnesses embedding the engine; libraries should leave
/// subscriber installation to their host.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("payflow=info")
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
