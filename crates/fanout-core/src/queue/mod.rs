//! Queue coordinator integration.
//!
//! Every transmission on the coordinator socket is one frame: the payload
//! length as ASCII decimal, left-justified and space-padded to `header_size`
//! bytes, then the payload. Command payloads start with the command name
//! padded to the same width.

mod client;
mod error;
mod protocol;

pub use client::{Reporter, SocketReporter};
pub use error::ReportError;
pub use protocol::{
    command_header, decode_filenames, encode_filenames, read_frame, read_message, write_frame,
    QueueMessage, DEFAULT_HEADER_SIZE, POST_FILENAME_QUEUE, STOP_QUEUE,
};
