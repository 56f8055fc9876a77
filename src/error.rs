use thiserror::Error;

#[derive(Error, Debug)]
pub enum Robot36Error {
    #[error("Unsupported WAV format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed WAV container: {0}")]
    MalformedContainer(String),

    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Robot36Error>;
