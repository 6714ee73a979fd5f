use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use http::header::{HeaderName, HeaderValue};

pub const GRPC_STATUS: HeaderName = HeaderName::from_static("grpc-status");
pub const GRPC_MESSAGE: HeaderName = HeaderName::from_static("grpc-message");
pub const GRPC_STATUS_DETAILS_BIN: HeaderName =
    HeaderName::from_static("grpc-status-details-bin");
pub const GRPC_TIMEOUT: HeaderName = HeaderName::from_static("grpc-timeout");
pub const X_GRPC_WEB: HeaderName = HeaderName::from_static("x-grpc-web");
pub const X_USER_AGENT: HeaderName = HeaderName::from_static("x-user-agent");

// Servers differ on alphabet and padding for `-bin` trailer values, so
// decoding accepts standard and URL-safe input with or without padding.
const PAD_INDIFFERENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, PAD_INDIFFERENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, PAD_INDIFFERENT);

/// Decodes the base64 payload of a `-bin` header value.
pub fn decode_binary_header(value: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD_LENIENT
        .decode(value)
        .or_else(|_| URL_SAFE_LENIENT.decode(value))
}

/// Reverses the `%HH` escapes used to smuggle non-ASCII text into
/// `grpc-message`. Invalid escapes pass through untouched and non-UTF-8
/// results are replaced lossily rather than rejected.
pub fn percent_decode(value: &HeaderValue) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(value.as_bytes())).into_owned()
}
