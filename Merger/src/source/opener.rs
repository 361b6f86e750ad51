//! Turning an input reference into a readable stream.
//!
//! Two strategies are tried in order: URI resolution (`file://` plus any scheme a host
//! registers, e.g. `content://`) and opening the reference verbatim as a filesystem path.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

/// A byte source an input container can be demuxed from.
pub trait MediaStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> MediaStream for T {}

pub trait SourceOpener: Send + Sync {
    fn open(&self, reference: &str) -> io::Result<Box<dyn MediaStream>>;
}

/// Resolves URIs of one scheme into a stream.
pub trait SchemeResolver: Send + Sync {
    fn resolve(&self, uri: &Url) -> io::Result<Box<dyn MediaStream>>;
}

fn open_file(path: &Path) -> io::Result<Box<dyn MediaStream>> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("{} is not a regular file", path.display())));
    }
    Ok(Box::new(BufReader::new(file)))
}

/// True for references of the form `scheme://...`.
pub fn looks_like_uri(reference: &str) -> bool {
    match reference.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Structured URI resolution.
#[derive(Default, Clone)]
pub struct UriSourceOpener {
    resolvers: HashMap<String, Arc<dyn SchemeResolver>>,
}

impl UriSourceOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(mut self, scheme: &str, resolver: Arc<dyn SchemeResolver>) -> Self {
        self.resolvers.insert(scheme.to_ascii_lowercase(), resolver);
        self
    }
}

impl SourceOpener for UriSourceOpener {
    fn open(&self, reference: &str) -> io::Result<Box<dyn MediaStream>> {
        let uri = Url::parse(reference).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        if uri.scheme() == "file" {
            let path = uri
                .to_file_path()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("{} has no local path", reference)))?;
            debug!(path = %path.display(), "Resolved file URI");
            return open_file(&path);
        }
        match self.resolvers.get(uri.scheme()) {
            Some(resolver) => resolver.resolve(&uri),
            None => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("No resolver for scheme '{}'", uri.scheme()),
            )),
        }
    }
}

/// Opens the reference as a plain filesystem path.
#[derive(Default, Clone, Copy, Debug)]
pub struct LiteralPathOpener;

impl SourceOpener for LiteralPathOpener {
    fn open(&self, reference: &str) -> io::Result<Box<dyn MediaStream>> {
        open_file(Path::new(reference))
    }
}

/// URI-like references go to `primary` first and to `fallback` when that fails;
/// everything else goes straight to `fallback`.
pub struct FallbackOpener<P, F> {
    primary: P,
    fallback: F,
}

impl<P: SourceOpener, F: SourceOpener> FallbackOpener<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }
}

impl<P: SourceOpener, F: SourceOpener> SourceOpener for FallbackOpener<P, F> {
    fn open(&self, reference: &str) -> io::Result<Box<dyn MediaStream>> {
        if looks_like_uri(reference) {
            match self.primary.open(reference) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    warn!(reference = %reference, error = %e, "URI resolution failed, falling back to raw path");
                }
            }
        }
        self.fallback.open(reference)
    }
}

pub type DefaultOpener = FallbackOpener<UriSourceOpener, LiteralPathOpener>;

pub fn default_opener() -> DefaultOpener {
    FallbackOpener::new(UriSourceOpener::new(), LiteralPathOpener)
}
