use crate::codec::body::PayloadEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{Message, PayloadSize, RequestForm, RequestHeader, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

/// Encodes a request head followed by the payload items of its body.
#[derive(Debug, Default)]
pub struct RequestEncoder {
    header_encoder: HeaderEncoder,
    payload_encoder: Option<PayloadEncoder>,
}

impl RequestEncoder {
    pub fn new(form: RequestForm) -> Self {
        Self { header_encoder: HeaderEncoder::new(form), payload_encoder: None }
    }

    pub fn form(&self) -> RequestForm {
        self.header_encoder.form()
    }
}

impl<D: Buf> Encoder<Message<(RequestHeader, PayloadSize), D>> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(RequestHeader, PayloadSize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, payload_size)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive request head");
                    return Err(SendError::invalid_body("previous request body is unfinished"));
                }

                let payload_encoder = PayloadEncoder::try_from(payload_size)?;
                self.header_encoder.encode((head, payload_size), dst)?;
                if !payload_encoder.is_finish() {
                    self.payload_encoder = Some(payload_encoder);
                }
                Ok(())
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    error!("expect request head but receive payload item");
                    return Err(SendError::invalid_body("payload item without a request head"));
                };

                let result = payload_encoder.encode(payload_item, dst);
                if result.is_err() || payload_encoder.is_finish() {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}
