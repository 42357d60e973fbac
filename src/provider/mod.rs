//! Provider integrations and the contract they implement.

pub mod adapter;
pub mod cardbridge;
pub mod formgate;
pub mod http;
pub mod manual;
pub mod registry;
pub mod signature;

pub use adapter::{ProviderAdapter, ProviderCall, WithdrawProvider};
pub use cardbridge::{CardBridgeAdapter, CardBridgeConfig};
pub use formgate::{FormGateAdapter, FormGateConfig};
pub use http::ProviderHttpClient;
pub use manual::ManualAdapter;
pub use registry::ProviderRegistry;
