/// Canonical gRPC status codes as carried in `grpc-status` trailers.
///
/// Only `Ok` is a non-error outcome; every other code turns into a
/// `TransportError` somewhere in the extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    Cancelled = 1,
    Unknown = 2,
    InvalidArgument = 3,
    DeadlineExceeded = 4,
    NotFound = 5,
    AlreadyExists = 6,
    PermissionDenied = 7,
    ResourceExhausted = 8,
    FailedPrecondition = 9,
    Aborted = 10,
    OutOfRange = 11,
    Unimplemented = 12,
    Internal = 13,
    Unavailable = 14,
    DataLoss = 15,
    Unauthenticated = 16,
}

impl StatusCode {
    /// Maps a wire integer to a status code. Values outside the canonical
    /// 0..=16 range are not recognized and must be treated as `DataLoss`
    /// by callers.
    pub fn from_i32(code: i32) -> Option<StatusCode> {
        match code {
            0 => Some(StatusCode::Ok),
            1 => Some(StatusCode::Cancelled),
            2 => Some(StatusCode::Unknown),
            3 => Some(StatusCode::InvalidArgument),
            4 => Some(StatusCode::DeadlineExceeded),
            5 => Some(StatusCode::NotFound),
            6 => Some(StatusCode::AlreadyExists),
            7 => Some(StatusCode::PermissionDenied),
            8 => Some(StatusCode::ResourceExhausted),
            9 => Some(StatusCode::FailedPrecondition),
            10 => Some(StatusCode::Aborted),
            11 => Some(StatusCode::OutOfRange),
            12 => Some(StatusCode::Unimplemented),
            13 => Some(StatusCode::Internal),
            14 => Some(StatusCode::Unavailable),
            15 => Some(StatusCode::DataLoss),
            16 => Some(StatusCode::Unauthenticated),
            _ => None,
        }
    }

    /// Maps an HTTP response status to a gRPC status code, for responses
    /// that carry no `grpc-status` of their own.
    pub fn from_http(status: u16) -> StatusCode {
        match status {
            200 => StatusCode::Ok,
            400 => StatusCode::Internal,
            401 => StatusCode::Unauthenticated,
            403 => StatusCode::PermissionDenied,
            404 => StatusCode::Unimplemented,
            429 => StatusCode::Unavailable,
            502 => StatusCode::Unavailable,
            503 => StatusCode::Unavailable,
            504 => StatusCode::Unavailable,
            _ => StatusCode::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_i32_canonical_range() {
        assert_eq!(StatusCode::from_i32(0), Some(StatusCode::Ok));
        assert_eq!(StatusCode::from_i32(5), Some(StatusCode::NotFound));
        assert_eq!(StatusCode::from_i32(16), Some(StatusCode::Unauthenticated));
    }

    #[test]
    fn test_from_i32_rejects_out_of_range() {
        assert_eq!(StatusCode::from_i32(17), None);
        assert_eq!(StatusCode::from_i32(999), None);
        assert_eq!(StatusCode::from_i32(-1), None);
    }

    #[test]
    fn test_from_http_mapping() {
        assert_eq!(StatusCode::from_http(200), StatusCode::Ok);
        assert_eq!(StatusCode::from_http(400), StatusCode::Internal);
        assert_eq!(StatusCode::from_http(401), StatusCode::Unauthenticated);
        assert_eq!(StatusCode::from_http(403), StatusCode::PermissionDenied);
        assert_eq!(StatusCode::from_http(404), StatusCode::Unimplemented);
        assert_eq!(StatusCode::from_http(429), StatusCode::Unavailable);
        assert_eq!(StatusCode::from_http(502), StatusCode::Unavailable);
        assert_eq!(StatusCode::from_http(503), StatusCode::Unavailable);
        assert_eq!(StatusCode::from_http(504), StatusCode::Unavailable);
        assert_eq!(StatusCode::from_http(418), StatusCode::Unknown);
        assert_eq!(StatusCode::from_http(500), StatusCode::Unknown);
    }
}
