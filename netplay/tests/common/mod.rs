pub mod test_environment;
pub mod test_peer;

#[allow(unused_imports)]
pub use test_environment::{TestEnvironment, eventually};
pub use test_peer::RawPeer;

/// Macro to wrap test bodies with a timeout to prevent hanging tests
#[macro_export]
macro_rules! timeout_test {
    ($duration:expr, $body:expr) => {
        tokio::time::timeout($duration, $body)
            .await
            .map_err(|_| anyhow::anyhow!("Test timed out after {:?}", $duration))?
    };
}
