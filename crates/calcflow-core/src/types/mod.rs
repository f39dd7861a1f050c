//! Graph model and value types.

mod connection;
mod dataset;
mod form;
mod node;
mod process;
mod result;
mod socket;
mod workspace;

pub use connection::{ConnectionInstance, SocketRef};
pub use dataset::{Dataset, DatasetRef, Entry, ValueSchema};
pub use form::{Form, FormExt, parse_form};
pub use node::{ContextBoundary, FormValues, NodeInstance, NodeState, SocketValue};
pub use process::{CalculationProcess, ProcessPatch, ProcessState};
pub use result::{OutputResult, StoredResult};
pub use socket::{
    DataType, IoValues, MetaValue, SocketDef, SocketDefs, SocketMetas, SocketState, all_present,
    required_present,
};
pub use workspace::Workspace;
