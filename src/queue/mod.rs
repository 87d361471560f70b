pub mod broker;

pub use broker::{DispatchError, DownloadBroker, DownloadJob};
