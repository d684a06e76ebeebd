#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Unknown raster source type `{0}`")]
    UnknownSourceType(String),

    #[error("Cannot open `{location}`: {source}")]
    Io {
        location: String,
        source: std::io::Error,
    },

    #[error("Cannot decode `{location}`: {source}")]
    Decode {
        location: String,
        source: png::DecodingError,
    },

    #[error("Malformed raster `{location}`: {message}")]
    Malformed { location: String, message: String },

    #[error("Unsupported raster layout in `{location}`: {message}")]
    Unsupported { location: String, message: String },
}
