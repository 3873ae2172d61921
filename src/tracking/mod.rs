pub mod clock;
pub mod config;
pub mod filter;
pub mod geodesic;
pub mod provider;

pub use clock::ActiveClock;
pub use config::{AnchorPolicy, FilterConfig};
pub use filter::{MovementFilter, RejectReason, SampleOutcome};
pub use provider::{
    LocationPriority, LocationProvider, LocationRequest, ManualLocationProvider, ProviderError,
    SampleSink, Subscription,
};
