pub mod builder;
pub mod deal;
pub mod enums;
pub mod error;
pub mod ids;
pub mod order;
pub mod tag;
pub mod typed;

pub use builder::{build_order, OrderFields};
pub use deal::{compute_task_id, Deal, ResultLocation, Task};
pub use enums::{OrderKind, TaskStatus, TeeFramework};
pub use error::{ErrorKind, SdkError};
pub use ids::{DealId, OrderHash, TaskId, TxHash};
pub use order::{
    AnyOrder, AnySignedOrder, AppOrder, DatasetOrder, Order, RequestOrder, SignedOrder,
    WorkerpoolOrder, NULL_ADDRESS,
};
