//! Wire models shared with the Lectern backend.

mod book;

pub use book::{
    Author, Book, BookFormat, BookList, BookMetadata, BookStatus, CoverCandidates, Genre,
    Recommendation, RecommendationResponse,
};
