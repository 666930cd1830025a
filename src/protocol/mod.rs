//! The chat stream wire format shared by server and client.

mod frame;

pub use frame::{
    decode_data, encode_completion, encode_fragment, Completion, Frame, FrameParser,
    COMPLETE_EVENT,
};
