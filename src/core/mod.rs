pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod rng;

pub use clock::SimClock;
pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use events::{EventBus, Subscription};
pub use rng::{RngChannel, RngRegistry};
