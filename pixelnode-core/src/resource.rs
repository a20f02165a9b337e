//! REST resource contract
//!
//! The HTTP layer is not part of this crate. It routes requests to
//! [`Resource`] implementations and turns their output into responses:
//! `Ok(n)` is a 200 with `out[..n]` as the JSON body, `Err(e)` becomes a
//! response with status `e.code` and body `{"message": ..., "code": ...}`.

use serde::Serialize;

/// Structured error reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorResponse {
    pub message: &'static str,
    pub code: u16,
}

impl ErrorResponse {
    pub const fn new(message: &'static str, code: u16) -> Self {
        Self { message, code }
    }

    /// Reply for a method the resource does not implement
    pub const METHOD_NOT_ALLOWED: Self = Self::new("method not allowed", 405);

    /// Reply when the output buffer cannot hold the response
    pub const RESPONSE_TOO_LARGE: Self = Self::new("response too large", 500);

    /// Write this error as a JSON object into `out`
    pub fn write_json(&self, out: &mut [u8]) -> Result<usize, ErrorResponse> {
        serde_json_core::to_slice(self, out).map_err(|_| Self::RESPONSE_TOO_LARGE)
    }
}

#[derive(Serialize)]
struct Message<'m> {
    message: &'m str,
}

/// Write `{"message": message}` into `out`
pub fn write_message(message: &str, out: &mut [u8]) -> Result<usize, ErrorResponse> {
    serde_json_core::to_slice(&Message { message }, out)
        .map_err(|_| ErrorResponse::RESPONSE_TOO_LARGE)
}

/// An endpoint exposed through the REST layer
///
/// Both methods write a JSON body into `out` and return its length.
pub trait Resource {
    /// Handle a GET request
    fn get(&mut self, _out: &mut [u8]) -> Result<usize, ErrorResponse> {
        Err(ErrorResponse::METHOD_NOT_ALLOWED)
    }

    /// Handle a POST request with a JSON `body`
    fn post(&mut self, _body: &[u8], _out: &mut [u8]) -> Result<usize, ErrorResponse> {
        Err(ErrorResponse::METHOD_NOT_ALLOWED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ReadOnly;

    impl Resource for ReadOnly {
        fn get(&mut self, out: &mut [u8]) -> Result<usize, ErrorResponse> {
            write_message("hello", out)
        }
    }

    #[test]
    fn test_default_methods() {
        let mut buf = [0u8; 64];
        let n = ReadOnly.get(&mut buf).unwrap();
        assert_eq!(&buf[..n], br#"{"message":"hello"}"#);
        assert_eq!(
            ReadOnly.post(b"{}", &mut buf),
            Err(ErrorResponse::METHOD_NOT_ALLOWED)
        );
    }

    #[test]
    fn test_error_json() {
        let mut buf = [0u8; 64];
        let n = ErrorResponse::new("invalid value", 400)
            .write_json(&mut buf)
            .unwrap();
        assert_eq!(&buf[..n], br#"{"message":"invalid value","code":400}"#);
    }

    #[test]
    fn test_output_too_small() {
        let mut buf = [0u8; 4];
        assert_eq!(
            write_message("hello", &mut buf),
            Err(ErrorResponse::RESPONSE_TOO_LARGE)
        );
    }
}
