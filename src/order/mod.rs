pub mod item;
pub mod method;
pub mod order;
pub mod process;
pub mod status;

pub use item::PaymentOrderItem;
pub use method::{MethodRegistry, PaymentDirection, PaymentMethod};
pub use order::{CreateOrderParams, PaymentOrder};
pub use process::PaymentProcess;
pub use status::PaymentStatus;
