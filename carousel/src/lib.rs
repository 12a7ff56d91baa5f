pub mod entry;
pub mod fetcher;
pub mod slideshow;

pub use entry::{CarouselError, Config};
pub use fetcher::{FetchError, FetchReport, Fetcher, HttpRemote, Remote, RemoteError};
pub use slideshow::{Controller, LaunchError, SlideshowConfig, SlideshowError, Started};
