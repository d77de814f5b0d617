//! searoute CLI support code.
//!
//! - `ports`: built-in port catalog and `--from`/`--to` parsing
//! - `retry`: backoff schedule for resubmitting failed saves

pub mod ports;
pub mod retry;

pub use ports::{parse_port, PortParseError};
pub use retry::SaveBackoff;
