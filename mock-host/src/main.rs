use std::io::BufRead;
use std::sync::Arc;

use dbgbridge_core::{init_logging, BridgeServer, LogConfig, ServerConfig};
use mock_host::MockHost;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LogConfig::default());

    let config = ServerConfig::from_env()?;
    let mut server = BridgeServer::start(config, Arc::new(MockHost::new()))?;
    println!("listening on {}", server.local_addr());
    println!("type 'quit' or close stdin to stop");

    for line in std::io::stdin().lock().lines() {
        if line?.trim() == "quit" {
            break;
        }
    }

    let outcome = server.stop();
    println!("stopped: {outcome:?}");
    Ok(())
}
