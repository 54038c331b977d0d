//! Database backend implementations.
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | SQLite | `sqlite` | One embedded database per tenant plus a central registry database |

#[cfg(feature = "sqlite")]
pub mod sqlite;
