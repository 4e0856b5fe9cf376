pub mod command;
pub mod frame;

pub use command::Command;
pub use frame::{build_frame, checksum, hex, insert_checksum, Frame, FrameFields, CHECKSUM_OFFSET, FRAME_LEN};
