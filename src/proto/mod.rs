// Hand-maintained mirror of `google.rpc.Status`, kept in the shape
// prost-build would generate. This is the only schema the transport
// itself needs; request and response messages come from the caller.

/// Rich error payload carried base64-encoded in the
/// `grpc-status-details-bin` trailer.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Status {
    /// One of the canonical gRPC status codes.
    #[prost(int32, tag = "1")]
    pub code: i32,
    /// Developer-facing error message.
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    /// Typed detail payloads, one `Any` per detail message.
    #[prost(message, repeated, tag = "3")]
    pub details: ::prost::alloc::vec::Vec<::prost_types::Any>,
}
