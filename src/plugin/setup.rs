//! Plugin setup: argument parsing.
//!
//! The directive takes exactly one argument, the identifier of the
//! prefix list source:
//!
//! ```text
//! edgecdnxprefixlist /etc/edge/prefixlists
//! edgecdnxprefixlist edge-routing
//! ```

use std::io;
use std::path::PathBuf;

use super::stage::PLUGIN_NAME;
use crate::error::SetupError;

/// Where prefix lists come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceIdentifier {
    /// A directory of YAML files, watched by this crate.
    Directory(PathBuf),
    /// A namespace in a declarative resource store; events are pushed
    /// by the embedding application's watcher.
    Namespace(String),
}

impl SourceIdentifier {
    /// Classify `identifier`: an existing directory, else a namespace.
    ///
    /// Anything that looks like a path (absolute, or containing a
    /// separator) must name an existing directory; namespace names never
    /// contain a separator.
    pub fn resolve(identifier: &str) -> Result<Self, SetupError> {
        let path = PathBuf::from(identifier);
        if path.is_dir() {
            return Ok(SourceIdentifier::Directory(path));
        }
        if path.is_absolute() || identifier.contains(std::path::is_separator) || identifier.starts_with('.') {
            let source = match path.metadata() {
                Ok(_) => io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
                Err(e) => e,
            };
            return Err(SetupError::InitialList { path, source });
        }
        Ok(SourceIdentifier::Namespace(identifier.to_string()))
    }

    /// Keep only sources that run without an embedding application.
    ///
    /// A namespace source is fed by the host's resource watcher; on its
    /// own it would never become ready.
    pub fn standalone(self) -> Result<Self, SetupError> {
        match self {
            SourceIdentifier::Namespace(namespace) => Err(SetupError::NoEventSource(namespace)),
            directory => Ok(directory),
        }
    }
}

/// Parse the directive arguments.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<SourceIdentifier, SetupError> {
    match args {
        [identifier] if !identifier.as_ref().trim().is_empty() => {
            SourceIdentifier::resolve(identifier.as_ref().trim())
        }
        [_] => Err(SetupError::ArgumentCount(0)),
        _ => Err(SetupError::ArgumentCount(args.len())),
    }
}

/// Parse a configuration line such as `edgecdnxprefixlist <identifier>`.
pub fn parse_directive(line: &str) -> Result<SourceIdentifier, SetupError> {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some(PLUGIN_NAME) => {}
        Some(other) => return Err(SetupError::UnknownDirective(other.to_string())),
        None => return Err(SetupError::UnknownDirective(String::new())),
    }
    let args: Vec<&str> = tokens.collect();
    parse_args(&args)
}
