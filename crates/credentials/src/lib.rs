//! API credentials for crowdcount.
//!
//! Operator defaults come from the environment, optionally seeded from a
//! `.env` file or a secrets file by [`CredentialLoader`].  Users may supply
//! their own keys per session; [`CredentialProvider`] hands those out exactly
//! once and then falls back to the operator defaults.

pub mod env;
pub mod loader;
pub mod provider;

pub use env::{EnvSource, ProcessEnv};
pub use loader::{CredentialLoader, LoadOrigin};
pub use provider::CredentialProvider;
