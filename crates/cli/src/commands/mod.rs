//! Command handlers for the osindex CLI.

pub mod delete;
pub mod indices;
pub mod insert;
pub mod ping;
pub mod search;

pub use delete::DeleteCommand;
pub use indices::IndicesCommand;
pub use insert::InsertCommand;
pub use ping::PingCommand;
pub use search::SearchCommand;
