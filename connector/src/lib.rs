pub mod gateway;
pub mod order_book;
