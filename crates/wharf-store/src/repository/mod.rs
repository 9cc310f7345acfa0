mod feed;
mod packages;

pub use feed::FeedRepository;
pub use packages::PackageRepository;
