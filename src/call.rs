use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use prost::Message;
use tokio::sync::{oneshot, Mutex};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::config::{CallOptions, TransportOptions};
use crate::deframe::FrameReader;
use crate::descriptor::{MethodDescriptor, ServiceDescriptor};
use crate::error::{extract_error, extract_trailer_error, TransportError};
use crate::frame::{encode_data_frame, Frame};
use crate::headers::{GRPC_TIMEOUT, X_GRPC_WEB, X_USER_AGENT};
use crate::interceptor::{apply_chain, CallContext};
use crate::status::StatusCode;
use crate::trailer::parse_trailer;

pub const CONTENT_TYPE_GRPC_WEB: &str = "application/grpc-web+proto";

const USER_AGENT: &str = concat!("grpc-web-transport/", env!("CARGO_PKG_VERSION"));

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
pub type SendFn = Box<dyn FnOnce(RequestParts, Bytes) + Send>;
type RecvFn = Box<dyn FnOnce(Box<dyn RawHandler>) -> BoxFuture<()> + Send>;

/// The mutable parts of an outgoing request, visible to interceptors.
pub struct RequestParts {
    pub url: String,
    pub method: http::Method,
    pub headers: HeaderMap,
    pub signal: Option<CancellationToken>,
}

/// The request half of a call below message typing. `send` consumes the
/// handle; it can be invoked at most once.
pub struct RawRequest {
    pub parts: RequestParts,
    send: SendFn,
}

impl RawRequest {
    /// Frames the serialized message and fires the HTTP exchange. The
    /// outcome surfaces on the response side only.
    pub fn send(self, payload: Bytes) {
        (self.send)(self.parts, payload)
    }

    /// Interposes on the send operation. The wrapper receives the final
    /// request parts, the serialized payload, and the inner send.
    pub fn wrap_send<F>(self, wrap: F) -> RawRequest
    where
        F: FnOnce(RequestParts, Bytes, SendFn) + Send + 'static,
    {
        let inner = self.send;
        RawRequest {
            parts: self.parts,
            send: Box::new(move |parts, payload| wrap(parts, payload, inner)),
        }
    }
}

/// The response half of a call below message typing.
pub struct RawResponse {
    recv: RecvFn,
}

impl RawResponse {
    pub async fn receive(self, handler: Box<dyn RawHandler>) {
        (self.recv)(handler).await
    }

    /// Interposes on the callback stream by wrapping the handler the
    /// engine will drive.
    pub fn wrap_handler<F>(self, wrap: F) -> RawResponse
    where
        F: FnOnce(Box<dyn RawHandler>) -> Box<dyn RawHandler> + Send + 'static,
    {
        let inner = self.recv;
        RawResponse {
            recv: Box::new(move |handler| inner(wrap(handler))),
        }
    }
}

/// Byte-level response callbacks, driven in order: headers, then at most
/// one message, then at most one trailer, then exactly one close.
///
/// `on_message` reports decode failures back to the engine so the call
/// closes from inside the frame loop instead of reading on.
pub trait RawHandler: Send {
    fn on_headers(&mut self, status: http::StatusCode, headers: &HeaderMap) {
        let _ = (status, headers);
    }

    fn on_message(&mut self, payload: Bytes) -> Result<(), TransportError>;

    fn on_trailer(&mut self, trailer: &HeaderMap) {
        let _ = trailer;
    }

    fn on_close(&mut self, error: Option<TransportError>);
}

/// Typed response callbacks for a unary call.
pub trait UnaryHandler<O>: Send {
    fn on_headers(&mut self, status: http::StatusCode, headers: &HeaderMap) {
        let _ = (status, headers);
    }

    fn on_message(&mut self, message: O);

    fn on_trailer(&mut self, trailer: &HeaderMap) {
        let _ = trailer;
    }

    fn on_close(&mut self, error: Option<TransportError>);
}

/// Adapts a typed handler onto the byte-level callback stream, decoding
/// the DATA payload with the response message schema.
struct TypedHandler<O, H> {
    inner: H,
    _marker: PhantomData<fn(O)>,
}

impl<O, H> RawHandler for TypedHandler<O, H>
where
    O: Message + Default + 'static,
    H: UnaryHandler<O> + 'static,
{
    fn on_headers(&mut self, status: http::StatusCode, headers: &HeaderMap) {
        self.inner.on_headers(status, headers);
    }

    fn on_message(&mut self, payload: Bytes) -> Result<(), TransportError> {
        match O::decode(payload) {
            Ok(message) => {
                self.inner.on_message(message);
                Ok(())
            }
            Err(e) => Err(TransportError::new(
                StatusCode::Internal,
                format!(
                    "failed to deserialize message {}: {}",
                    std::any::type_name::<O>(),
                    e
                ),
            )),
        }
    }

    fn on_trailer(&mut self, trailer: &HeaderMap) {
        self.inner.on_trailer(trailer);
    }

    fn on_close(&mut self, error: Option<TransportError>) {
        self.inner.on_close(error);
    }
}

/// The request handle returned to the caller. Sending serializes the
/// message and hands it to the outermost interceptor.
pub struct UnaryRequest<I> {
    raw: RawRequest,
    _marker: PhantomData<fn(&I)>,
}

impl<I: Message> UnaryRequest<I> {
    pub fn send(self, message: &I) {
        let payload = Bytes::from(message.encode_to_vec());
        self.raw.send(payload);
    }

    pub fn url(&self) -> &str {
        &self.raw.parts.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.raw.parts.headers
    }
}

const STATE_INITIAL: u8 = 0;
const STATE_READING: u8 = 1;
const STATE_CLOSED: u8 = 2;

/// The response handle returned to the caller. `receive` drives the whole
/// response lifecycle against the supplied handler; it is effective once.
pub struct UnaryResponse<O> {
    state: AtomicU8,
    raw: Mutex<Option<RawResponse>>,
    _marker: PhantomData<fn() -> O>,
}

impl<O> UnaryResponse<O>
where
    O: Message + Default + 'static,
{
    pub async fn receive<H>(&self, handler: H)
    where
        H: UnaryHandler<O> + 'static,
    {
        let mut handler = handler;
        match self.state.compare_exchange(
            STATE_INITIAL,
            STATE_READING,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {}
            Err(STATE_READING) => {
                handler.on_close(Some(TransportError::new(
                    StatusCode::Internal,
                    "cannot read response concurrently",
                )));
                return;
            }
            Err(_) => {
                handler.on_close(Some(TransportError::new(
                    StatusCode::Internal,
                    "response already read",
                )));
                return;
            }
        }

        match self.raw.lock().await.take() {
            Some(raw) => {
                let adapter = TypedHandler {
                    inner: handler,
                    _marker: PhantomData,
                };
                raw.receive(Box::new(adapter)).await;
                self.state.store(STATE_CLOSED, Ordering::Release);
            }
            None => {
                handler.on_close(Some(TransportError::new(
                    StatusCode::Internal,
                    "response already read",
                )));
            }
        }
    }
}

struct TransportInner {
    base_url: String,
    client: reqwest::Client,
    interceptors: Vec<Arc<dyn crate::interceptor::Interceptor>>,
}

/// Factory for unary gRPC-Web calls against one base URL.
///
/// Cheap to clone; calls share the HTTP client but no per-call state, so
/// any number of calls may be in flight concurrently.
#[derive(Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

impl Transport {
    pub fn new(options: TransportOptions) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::custom(|attempt| {
                attempt.error("redirects are not allowed for gRPC-Web calls")
            }))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(TransportInner {
                base_url: options.base_url,
                client,
                interceptors: options.interceptors,
            }),
        }
    }

    /// Builds the request/response handle pair for one unary call.
    ///
    /// Nothing goes on the wire until `send` is invoked on the request
    /// handle; `receive` then waits for the exchange it triggered.
    pub fn call<I, O>(
        &self,
        service: &ServiceDescriptor,
        method: &MethodDescriptor<I, O>,
        options: CallOptions,
    ) -> (UnaryRequest<I>, UnaryResponse<O>) {
        let url = format!(
            "{}/{}/{}",
            self.inner.base_url.trim_end_matches('/'),
            service.type_name,
            method.name
        );
        tracing::debug!(url = %url, "starting unary call");

        let headers = build_headers(&options);
        let signal = options.signal.clone();

        let (tx, rx) = oneshot::channel();
        let client = self.inner.client.clone();
        let send: SendFn = Box::new(move |parts: RequestParts, payload: Bytes| {
            let frame = encode_data_frame(&payload);
            tracing::debug!(url = %parts.url, frame_len = frame.len(), "sending request frame");
            tokio::spawn(async move {
                let result = perform_request(&client, parts, frame).await;
                let _ = tx.send(result);
            });
        });

        let recv_signal = signal.clone();
        let recv: RecvFn = Box::new(move |handler| Box::pin(run_response(rx, recv_signal, handler)));

        let request = RawRequest {
            parts: RequestParts {
                url,
                method: http::Method::POST,
                headers,
                signal,
            },
            send,
        };
        let response = RawResponse { recv };

        let ctx = CallContext {
            service,
            method: method.name,
            options: &options,
        };
        let (request, response) = apply_chain(&self.inner.interceptors, &ctx, request, response);

        (
            UnaryRequest {
                raw: request,
                _marker: PhantomData,
            },
            UnaryResponse {
                state: AtomicU8::new(STATE_INITIAL),
                raw: Mutex::new(Some(response)),
                _marker: PhantomData,
            },
        )
    }
}

fn build_headers(options: &CallOptions) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_GRPC_WEB));
    headers.insert(X_GRPC_WEB, HeaderValue::from_static("1"));
    headers.insert(X_USER_AGENT, HeaderValue::from_static(USER_AGENT));

    // Caller headers replace identically named defaults outright, but a
    // caller name repeated within its own map keeps all of its values.
    if let Some(user) = &options.headers {
        for name in user.keys() {
            headers.remove(name);
        }
        for (name, value) in user {
            headers.append(name, value.clone());
        }
    }

    if let Some(timeout_ms) = options.timeout_ms {
        headers.insert(
            GRPC_TIMEOUT,
            HeaderValue::from_str(&format!("{}m", timeout_ms)).unwrap(),
        );
    }

    headers
}

async fn perform_request(
    client: &reqwest::Client,
    parts: RequestParts,
    body: Bytes,
) -> Result<reqwest::Response, TransportError> {
    let request = client
        .request(parts.method, &parts.url)
        .headers(parts.headers)
        .body(body);

    match parts.signal {
        Some(signal) => tokio::select! {
            _ = signal.cancelled() => Err(TransportError::cancelled()),
            result = request.send() => result.map_err(TransportError::from),
        },
        None => request.send().await.map_err(TransportError::from),
    }
}

async fn run_response(
    rx: oneshot::Receiver<Result<reqwest::Response, TransportError>>,
    signal: Option<CancellationToken>,
    mut handler: Box<dyn RawHandler>,
) {
    let response = match rx.await {
        Ok(Ok(response)) => response,
        Ok(Err(error)) => {
            tracing::debug!(error = %error, "request failed before response headers");
            handler.on_close(Some(error));
            return;
        }
        Err(_) => {
            handler.on_close(Some(TransportError::new(
                StatusCode::Internal,
                "request was dropped before send",
            )));
            return;
        }
    };

    let status = response.status();
    let headers = response.headers().clone();
    tracing::debug!(status = %status, "response headers received");
    handler.on_headers(status, &headers);

    if let Some(error) = extract_error(status, &headers) {
        handler.on_close(Some(error));
        return;
    }

    let mut reader = FrameReader::new(Box::pin(response.bytes_stream()));
    let error = match signal {
        Some(signal) => tokio::select! {
            _ = signal.cancelled() => Some(TransportError::cancelled()),
            error = drive_frames(&mut reader, handler.as_mut()) => error,
        },
        None => drive_frames(&mut reader, handler.as_mut()).await,
    };

    if let Some(error) = &error {
        tracing::debug!(code = ?error.code, message = %error.message, "call closed with error");
    }
    handler.on_close(error);
}

/// Reads frames until the trailer, upholding the unary shape: at most one
/// DATA frame, then one TRAILER frame. Returns the error to close with,
/// if any.
async fn drive_frames<S, E>(
    reader: &mut FrameReader<S>,
    handler: &mut dyn RawHandler,
) -> Option<TransportError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<TransportError>,
{
    let mut saw_message = false;
    loop {
        let frame = match reader.read_frame().await {
            Ok(frame) => frame,
            Err(error) => return Some(error),
        };
        match frame {
            Frame::Data(payload) => {
                if saw_message {
                    return Some(TransportError::new(
                        StatusCode::Unimplemented,
                        "received more than one response message for a unary call",
                    ));
                }
                saw_message = true;
                if let Err(error) = handler.on_message(payload) {
                    return Some(error);
                }
            }
            Frame::Trailer(payload) => {
                let trailer = parse_trailer(&payload);
                handler.on_trailer(&trailer);
                return extract_trailer_error(&trailer);
            }
        }
    }
}
