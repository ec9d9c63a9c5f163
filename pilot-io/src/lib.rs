//! Archive, JSON, and subprocess primitives shared by the stage-in/stage-out
//! workers and the communication manager.

pub mod archive;
pub mod json_io;
pub mod process;

pub use archive::prepare_log;
pub use json_io::{read_json_sync, write_json_sync};
pub use process::{run as run_command, CommandOutcome, SystemTransferRunner, TransferRunner};
