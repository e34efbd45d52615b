pub mod client;
pub mod recipe;
pub mod types;

pub use recipe::GeminiRecipeClient;
