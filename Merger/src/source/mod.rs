pub mod opener;
pub mod reader;

pub use opener::{default_opener, FallbackOpener, LiteralPathOpener, MediaStream, SchemeResolver, SourceOpener, UriSourceOpener};
pub use reader::SourceReader;
