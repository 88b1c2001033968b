pub mod chat;
pub mod client;
pub mod image;
pub mod types;
pub mod video;

pub use chat::GeminiChatClient;
pub use client::GeminiHttpClient;
pub use image::GeminiImageClient;
pub use video::GeminiVideoClient;
