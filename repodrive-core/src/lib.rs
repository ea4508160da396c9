mod backoff;
mod client;
mod retry;
mod store;

pub use backoff::Backoff;
pub use client::{RepoClient, RepoId};
pub use reqwest::StatusCode;
pub use retry::{RateLimitSignal, RetryPolicy, rate_limit_signal};
pub use store::{
    EntryKind, ErrorClass, PLACEHOLDER_NAME, RemoteEntry, RemoteObject, RemoteRef, RemoteStore,
    StoreError,
};
