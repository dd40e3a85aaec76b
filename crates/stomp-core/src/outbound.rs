//! Server-to-client frame builders.
//!
//! Each builder returns frame text without the NUL terminator; pass it through
//! [`FrameCodec::encode`](crate::FrameCodec::encode) before writing.

use crate::PROTOCOL_VERSION;
use crate::errors::ProtocolError;
use crate::frame::Frame;
use crate::ids::SubscriptionId;

/// `CONNECTED` reply to a successful `CONNECT`.
pub fn connected() -> String {
    Frame::new("CONNECTED")
        .header("version", PROTOCOL_VERSION)
        .to_text()
}

/// `RECEIPT` acknowledging a frame that carried a `receipt` header.
pub fn receipt(receipt_id: &str) -> String {
    Frame::new("RECEIPT")
        .header("receipt-id", receipt_id)
        .to_text()
}

/// `MESSAGE` delivered to one subscriber.
pub fn message(
    subscription: SubscriptionId,
    destination: &str,
    message_id: u64,
    body: &str,
) -> String {
    Frame::new("MESSAGE")
        .header("subscription", subscription.to_string())
        .header("destination", destination)
        .header("message-id", message_id.to_string())
        .body(body)
        .to_text()
}

/// `ERROR` frame echoing the offending frame text.
pub fn error(receipt_id: Option<&str>, error: &ProtocolError, original_frame: &str) -> String {
    let mut frame = Frame::new("ERROR");
    if let Some(id) = receipt_id {
        frame = frame.header("receipt-id", id);
    }
    frame
        .header("message", error.short_message())
        .body(format!(
            "The message:\n-----\n{original_frame}\n-----\n{}\n",
            error.detail()
        ))
        .to_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_template() {
        assert_eq!(connected(), "CONNECTED\nversion:1.2\n\n");
    }

    #[test]
    fn receipt_template() {
        assert_eq!(receipt("42"), "RECEIPT\nreceipt-id:42\n\n");
    }

    #[test]
    fn message_template() {
        assert_eq!(
            message(SubscriptionId::new(0), "/chat", 1, "hi"),
            "MESSAGE\nsubscription:0\ndestination:/chat\nmessage-id:1\n\nhi"
        );
    }

    #[test]
    fn error_template_with_receipt() {
        let err = ProtocolError::malformed("SEND frame must contain a destination header.");
        let text = error(Some("9"), &err, "SEND\nreceipt:9\n\nbody");
        assert_eq!(
            text,
            "ERROR\nreceipt-id:9\nmessage:malformed frame received\n\n\
             The message:\n-----\nSEND\nreceipt:9\n\nbody\n-----\n\
             SEND frame must contain a destination header.\n"
        );
    }

    #[test]
    fn error_template_without_receipt() {
        let err = ProtocolError::unsupported_version("1.1");
        let text = error(None, &err, "");
        assert!(text.starts_with("ERROR\nmessage:version not supported\n\n"));
        assert!(text.contains("The message:\n-----\n\n-----\n"));
        assert!(text.ends_with('\n'));
    }
}
