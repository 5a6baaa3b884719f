//! The crowdcount operator binary's library half: app wiring, the guarded
//! API call path and CLI commands.

pub mod bootstrap;
pub mod cli;
pub mod guard;
pub mod state;
