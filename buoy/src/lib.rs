pub mod args;
pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod msg;
pub mod names;
pub mod probe;
pub mod qos;

pub use config::{Cli, ProbeConfig, PubCli};
pub use error::{ProbeError, ProbeResult, RetCode};
pub use middleware::{Middleware, Publish};
pub use msg::{ColorRgba, MessageInfo};
pub use probe::{Report, Step, publish, run};
