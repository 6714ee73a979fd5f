pub mod call;
pub mod config;
pub mod deframe;
pub mod descriptor;
pub mod error;
pub mod frame;
pub mod headers;
pub mod interceptor;
pub mod proto;
pub mod status;
pub mod trailer;

pub use call::{
    RawHandler, RawRequest, RawResponse, RequestParts, Transport, UnaryHandler, UnaryRequest,
    UnaryResponse,
};
pub use config::{CallOptions, TransportOptions};
pub use descriptor::{MethodDescriptor, MethodKind, ServiceDescriptor};
pub use error::TransportError;
pub use frame::Frame;
pub use interceptor::{CallContext, Interceptor};
pub use status::StatusCode;
