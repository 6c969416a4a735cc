//! Small text helpers shared by the parser and the storage layer.

mod text;

pub use text::{clean_title, html_to_text};
