//! Cart management and order submission.

pub mod cart;
pub mod order;

pub use cart::{Cart, CartItem, CartRepository, FsCartRepository};
pub use order::{
    CustomerInfo, LineOutcome, LineStatus, MemoryOrderBackend, OrderBackend, OrderId,
    OrderReceipt, submit_order,
};
