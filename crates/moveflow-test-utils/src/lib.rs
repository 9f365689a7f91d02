//! Mocks, a recording observer and graph fixtures shared by moveflow tests.

pub mod fixtures;
pub mod mocks;
pub mod observer;

pub use fixtures::*;
pub use mocks::{CompileScript, DeployScript, MockAnalyzer, MockChain, MockCompiler, MockWallet};
pub use observer::{Recorded, RecordingObserver};
