pub mod parser;
mod subscriber;

pub use subscriber::FeedSubscriber;
