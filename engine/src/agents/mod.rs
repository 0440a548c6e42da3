//! Agent Registry: name → handler entry, including dynamically loaded
//! plugin agents (spec.md §4.1). A `dashmap`-backed name→entry map behind a
//! thin wrapper, a `thiserror` error enum, and YAML manifest loading via
//! runtime `read_dir` + `serde_yaml::from_str` of a plugin directory, since
//! plugin agents are not known at compile time.

mod entry;
mod error;
mod node;
mod registry;
mod team;

pub use entry::AgentEntry;
pub use error::AgentError;
pub use node::AgentNode;
pub use registry::AgentRegistry;
pub use team::builtin_team;
