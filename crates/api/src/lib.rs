pub mod auth;
pub mod endpoint;
pub mod logs;

pub use auth::{Token, TokenProvider};
pub use endpoint::Endpoint;
pub use logs::LogsClient;

use iclogs_core::IclogsError;

pub(crate) fn transport_error(err: reqwest::Error) -> IclogsError {
    if err.is_timeout() {
        IclogsError::Transport(format!("request timed out: {err}"))
    } else {
        IclogsError::Transport(err.to_string())
    }
}
