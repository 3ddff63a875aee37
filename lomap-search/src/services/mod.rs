//! External service clients

pub mod gemini_client;
pub mod listing_assistant;

pub use gemini_client::{GeminiClient, GeminiError, InlineData};
pub use listing_assistant::{
    ListingAssistant, ListingDraft, ListingError, ListingInput, ListingProposal, ListingReview,
};
