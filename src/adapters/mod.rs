// Adapters layer: concrete implementations of the domain ports backed by
// real processes and sockets.

pub mod probe;
pub mod process;

pub use probe::{CommandProbe, HttpProbe, TcpProbe};
pub use process::{find_executable, status_code, ExecHandoff, SystemCommandRunner};
