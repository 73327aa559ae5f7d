//! Send a single command to one node.

use anyhow::Result;
use kvprobe_client::{Dispatcher, TcpTransport};
use kvprobe_types::NodeEndpoint;

use crate::config::Config;

/// Run the send command.
///
/// `words` are joined with single spaces into the request line. An
/// exhausted call still prints `Response: ` with empty text.
pub async fn run(config: &Config, node: &NodeEndpoint, words: &[String]) -> Result<()> {
    let policy = config.dispatch.policy()?;
    let dispatcher = Dispatcher::new(TcpTransport::new(), policy);

    let response = dispatcher
        .send_command(node.host(), node.port(), &words.join(" "))
        .await?;
    println!("Response: {}", response);

    Ok(())
}
