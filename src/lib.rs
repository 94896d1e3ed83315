// Mixtape Library - Build M3U playlists from a music library
// panpipe plays the music, mixtape writes the playlists other players read

pub mod config;    // settings and preferences
pub mod error;     // fatal errors vs accumulated warnings
pub mod media;     // format registry and tag extraction
pub mod playlist;  // entries, filters, ordering, building, writing
pub mod scanner;   // directory traversal

// Export the stuff other modules actually use
pub use config::Config;
pub use error::{Error, Result, ScanWarning};
pub use media::{FormatRegistry, TagReader, Tags};
pub use playlist::{
    BuildConfig, BuildOutcome, OrderKey, Playlist, PlaylistBuilder, PlaylistEntry, PlaylistWriter,
    WriteOptions,
};
pub use scanner::Scanner;
