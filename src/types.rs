use std::path::PathBuf;

/// Where to look for `setman.toml` and for relative settings files.
///
/// Lists of search paths are ordered by ascending priority: the last
/// directory that holds a matching file wins.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// Every directory from the filesystem root (or the [`Boundary`]) down to
    /// the current working directory, shallowest first.
    Ancestors(Boundary),
    /// An explicit directory.
    Path(PathBuf),
}

/// Where an [`Ancestors`](SearchPath::Ancestors) walk stops.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    Root,
    /// Stop (inclusive) at the first directory containing this entry, e.g. `.git`.
    Marker(&'static str),
}

/// A diagnostic operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// List every declared setting grouped by namespace. With
    /// `default_values`, persist every declared default first.
    Check { default_values: bool, verbosity: u8 },
}
