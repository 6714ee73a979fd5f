use std::sync::Arc;

use crate::call::{RawRequest, RawResponse};
use crate::config::CallOptions;
use crate::descriptor::ServiceDescriptor;

/// Read-only description of the call an interceptor is wrapping.
pub struct CallContext<'a> {
    pub service: &'a ServiceDescriptor,
    pub method: &'a str,
    pub options: &'a CallOptions,
}

/// Wraps a call's request/response pair.
///
/// Interceptors run below message typing: they see the serialized message
/// payload and the raw callback stream, and can mutate request parts,
/// wrap the send operation, or wrap the response handler. Declaration
/// order is FIFO with the last interceptor outermost.
pub trait Interceptor: Send + Sync {
    fn intercept(
        &self,
        ctx: &CallContext<'_>,
        request: RawRequest,
        response: RawResponse,
    ) -> (RawRequest, RawResponse);
}

/// Folds the interceptor list around the base call. The fold applies the
/// first-declared interceptor first, which leaves the last-declared one
/// outermost.
pub(crate) fn apply_chain(
    interceptors: &[Arc<dyn Interceptor>],
    ctx: &CallContext<'_>,
    request: RawRequest,
    response: RawResponse,
) -> (RawRequest, RawResponse) {
    interceptors
        .iter()
        .fold((request, response), |(request, response), interceptor| {
            interceptor.intercept(ctx, request, response)
        })
}
