pub mod vtex_client;

pub use vtex_client::{ProductFetcher, VtexClient};
