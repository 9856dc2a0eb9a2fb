pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod invocation;
pub mod invoker;
pub mod retry;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{GateConfig, GateSettings};
pub use error::{ConfigError, GateError, RateLimitExceeded};
pub use gate::{AsyncGatedInvoker, GatedInvoker, WindowSnapshot};
pub use invocation::InvocationResult;
pub use invoker::{AsyncInvoker, Invoker};
pub use retry::SleepAndRetry;
pub use window::WindowCounter;
