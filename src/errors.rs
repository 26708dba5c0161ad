pub use anyhow::{anyhow, bail, format_err, Context, Error, Result};
pub use log::{trace, debug, info, warn, error};
