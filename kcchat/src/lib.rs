pub mod api;
pub mod attachment;
pub mod bot;
pub mod faq;
pub mod models;
pub mod render;
pub mod widget;
