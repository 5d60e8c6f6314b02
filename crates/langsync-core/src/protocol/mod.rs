//! Protocol module containing message codes, the field codec, typed messages,
//! and the enter-sequence counter.

pub mod codec;
pub mod codes;
pub mod messages;
pub mod sequence;
pub mod version;

pub use codec::{read_frame_length, FieldReader, FrameBuilder, ProtocolError, MAX_FRAME_LENGTH};
pub use codes::MessageCode;
pub use messages::*;
pub use sequence::SequenceCounter;
pub use version::ProtocolVersion;
