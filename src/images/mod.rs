pub mod pixabay;
pub mod services;

pub use services::ImageResolver;
