pub mod mocks;
pub mod setup;

pub use mocks::{MockSocket, ScriptItem};
pub use setup::{TestClient, TestSetup, TestSetupBuilder};
