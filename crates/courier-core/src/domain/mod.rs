//! Domain model: identifiers, the wire envelope, the lifecycle state machine,
//! task rows and the error taxonomy.

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod message;
pub mod record;
pub mod state;
pub mod task_type;

pub use self::envelope::TaskEnvelope;
pub use self::errors::{DispatchError, HandlerError, QueueError, StoreError};
pub use self::ids::{MessageId, ReceiptToken, TaskId, WorkerId};
pub use self::message::Message;
pub use self::record::{InvalidTransition, TaskRecord};
pub use self::state::TaskStatus;
pub use self::task_type::TaskType;
