//! Host-tree side of the inner-defaults reconciler: node model, class
//! lists, the `HostTree` collaborator trait and an in-memory host.

pub mod class_list;
pub mod config;
pub mod error;
pub mod host;
pub mod node;
pub mod snapshot;
pub mod tree;

pub use class_list::ClassList;
pub use config::Config;
pub use error::TreeError;
pub use host::*;
pub use node::*;
pub use snapshot::*;
pub use tree::MemoryTree;
