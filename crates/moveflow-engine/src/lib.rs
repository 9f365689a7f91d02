//! Workflow scheduling and execution.
//!
//! [`WorkflowExecutor`] orders a workflow graph with Kahn's algorithm, then
//! runs each node through its [`NodeHandler`], feeding earlier outputs forward
//! through an execution-scoped store.

pub mod context;
pub mod executor;
pub mod handlers;
pub mod inputs;
pub mod observer;
pub mod order;
pub mod stop;
pub mod store;
pub mod summary;
pub mod validation;

pub use context::{AccountCache, ExecutionContext, ExecutorOptions};
pub use executor::{RunState, WorkflowExecutor, STOPPED_MESSAGE};
pub use handlers::{HandlerRegistry, NodeHandler};
pub use inputs::NodeInputs;
pub use observer::EventBusObserver;
pub use order::{build_order, upstream_of};
pub use stop::{StopFlag, StopHandle, StopSignal, TokenStop};
pub use store::ExecutionStore;
pub use summary::build_summary;
