//! Layered configuration.
//!
//! Tiers, lowest to highest priority, merged field by field:
//! 1. **Defaults** - built in
//! 2. **User** - `~/.compliance-tracker/config.yaml`
//! 3. **Project** - `./compliance-tracker/config.yaml`
//! 4. **Explicit** - `--config` or `COMPLIANCE_CONFIG_PATH`
//! 5. **Environment** - see below
//!
//! CLI flags are applied by the binary after loading.
//!
//! ## Environment Variables
//! - `COMPLIANCE_CONFIG_PATH` - Explicit config file
//! - `COMPLIANCE_DB_PATH` - Database path
//! - `COMPLIANCE_HOST` / `COMPLIANCE_PORT` - HTTP listener
//! - `COMPLIANCE_TOKEN_SECRET` - Token signing secret
//! - `COMPLIANCE_TOKEN_TTL_HOURS` - Token lifetime

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all};
pub use types::*;
