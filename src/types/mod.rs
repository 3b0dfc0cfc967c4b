//! Relay types.

mod call;
pub use call::{Call, encode_execute};

mod op;
pub use op::{CodecError, IEntryPoint, UserOperation, unpack_u128_pair};

pub mod rpc;
pub use rpc::OpId;
