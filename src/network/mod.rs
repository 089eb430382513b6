use lazy_static::*;

pub use transport::*;

use crate::constants::USER_AGENT;

mod transport;

lazy_static! {
    /// The client used for all HTTP requests.
    static ref HTTP_CLIENT: reqwest::Client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .gzip(true)
        .build()
        .expect("failed to build http client");
}
