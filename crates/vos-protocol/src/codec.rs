use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::ErrorBody;

/// JSON encoding of protocol bodies.
pub struct JsonCodec;

impl JsonCodec {
    pub fn encode<T: Serialize>(value: &T) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| ProtocolError::Serialization(e.to_string()))
    }

    pub fn decode<T: DeserializeOwned>(data: &[u8]) -> ProtocolResult<T> {
        serde_json::from_slice(data).map_err(|e| ProtocolError::Deserialization(e.to_string()))
    }

    /// Turn an error response into a [`ProtocolError::RemoteError`].
    ///
    /// Bodies that are not an [`ErrorBody`] (a proxy's HTML page, say) are
    /// kept verbatim as the message.
    pub fn decode_error(status: u16, data: &[u8]) -> ProtocolError {
        match Self::decode::<ErrorBody>(data) {
            Ok(body) => ProtocolError::RemoteError {
                status,
                code: body.code,
                message: body.message,
            },
            Err(_) => ProtocolError::RemoteError {
                status,
                code: "unknown".into(),
                message: String::from_utf8_lossy(data).into_owned(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CreateBranchRequest;

    #[test]
    fn decode_rejects_wrong_shape() {
        let err = JsonCodec::decode::<CreateBranchRequest>(b"{\"nope\":1}").unwrap_err();
        assert!(matches!(err, ProtocolError::Deserialization(_)));
    }

    #[test]
    fn error_body_becomes_remote_error() {
        let bytes = JsonCodec::encode(&ErrorBody::new("repository_not_found", "no r9")).unwrap();
        match JsonCodec::decode_error(404, &bytes) {
            ProtocolError::RemoteError { status, code, message } => {
                assert_eq!(status, 404);
                assert_eq!(code, "repository_not_found");
                assert_eq!(message, "no r9");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn foreign_error_body_is_kept_verbatim() {
        match JsonCodec::decode_error(502, b"<html>bad gateway</html>") {
            ProtocolError::RemoteError { code, message, .. } => {
                assert_eq!(code, "unknown");
                assert_eq!(message, "<html>bad gateway</html>");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
