pub mod desktop;
pub mod environment;
pub mod runner;
pub mod system;
pub mod windows;

pub use desktop::{exec_argv, Desktop, Urgency};
pub use environment::SystemSnapshot;
pub use runner::{
    try_in_order, CommandOutput, CommandRunner, DryRunRunner, ExecResult, ExecutorError,
    Invocation, SystemRunner,
};
pub use system::{parse_signal_percent, BatteryInfo, NetworkState, SystemControl, VolumeState};
pub use windows::{Geometry, WindowControl, WindowInfo, WindowTarget};
