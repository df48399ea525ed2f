use super::{MessageId, ReceiptToken};

/// A message as handed out by the queue transport.
///
/// The receipt is bound to this particular delivery; a redelivered message
/// carries the same `id` but a fresh receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub receipt: ReceiptToken,
    pub body: String,

    /// How many times the transport has delivered this message, this one included.
    pub receive_count: u32,
}

impl Message {
    pub fn new(id: MessageId, receipt: ReceiptToken, body: impl Into<String>) -> Self {
        Self {
            id,
            receipt,
            body: body.into(),
            receive_count: 1,
        }
    }

    pub fn is_redelivery(&self) -> bool {
        self.receive_count > 1
    }
}
