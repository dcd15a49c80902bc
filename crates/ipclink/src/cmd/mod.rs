use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Subcommand};
use ipclink_socket::{Endpoint, ServerSocket};

use crate::exit::{socket_error, CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod ids;
pub mod rpc_add;
pub mod rpc_serve;
pub mod send;
pub mod serve;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run an echo message server.
    Serve(ServeArgs),
    /// Send one string message and print the reply.
    Send(SendArgs),
    /// Run the demo RPC arithmetic server.
    RpcServe(ServeArgs),
    /// Call `add` on a running RPC server.
    RpcAdd(RpcAddArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::RpcServe(args) => rpc_serve::run(args, format),
        Command::RpcAdd(args) => rpc_add::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on: `unix:<path>` (or a bare path) or `tcp:<port>`.
    pub address: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Address to connect to: `unix:<path>` (or a bare path) or
    /// `tcp:<host>:<port>`.
    pub address: String,
    /// Text to send.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct RpcAddArgs {
    /// Address to connect to: `unix:<path>` (or a bare path) or
    /// `tcp:<host>:<port>`.
    pub address: String,
    pub a: i32,
    pub b: i32,
    /// Keep the addends local and let the server fetch them through reverse
    /// callbacks.
    #[arg(long)]
    pub with_callbacks: bool,
}

/// Parse a client address. A bare string is a Unix socket path.
pub fn parse_endpoint(address: &str) -> CliResult<Endpoint> {
    if let Some(rest) = address.strip_prefix("tcp:") {
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| CliError::usage(format!("expected tcp:<host>:<port>, got {address:?}")))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| CliError::usage(format!("invalid port in {address:?}")))?;
        return Ok(Endpoint::Tcp {
            host: host.to_string(),
            port,
        });
    }

    let path = address.strip_prefix("unix:").unwrap_or(address);
    Ok(Endpoint::Unix(path.into()))
}

/// Parse a server address and bind the listener.
pub fn bind_server(address: &str) -> CliResult<ServerSocket> {
    if let Some(port) = address.strip_prefix("tcp:") {
        let port = port
            .parse::<u16>()
            .map_err(|_| CliError::usage(format!("invalid port in {address:?}")))?;
        return ServerSocket::bind_tcp(port).map_err(|err| socket_error("bind failed", err));
    }

    let path = address.strip_prefix("unix:").unwrap_or(address);
    ServerSocket::bind_unix(path).map_err(|err| socket_error("bind failed", err))
}

/// Wire Ctrl-C to a flag the stop predicates read.
pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_address_is_a_unix_path() {
        let endpoint = parse_endpoint("/tmp/demo.sock").unwrap();
        assert!(matches!(endpoint, Endpoint::Unix(path) if path.ends_with("demo.sock")));
    }

    #[test]
    fn unix_prefix_is_stripped() {
        let endpoint = parse_endpoint("unix:foo").unwrap();
        assert!(matches!(endpoint, Endpoint::Unix(path) if path.as_os_str() == "foo"));
    }

    #[test]
    fn tcp_address_splits_host_and_port() {
        let endpoint = parse_endpoint("tcp:localhost:4100").unwrap();
        assert!(
            matches!(endpoint, Endpoint::Tcp { ref host, port: 4100 } if host == "localhost")
        );
    }

    #[test]
    fn tcp_address_without_port_is_usage_error() {
        let err = parse_endpoint("tcp:localhost").unwrap_err();
        assert_eq!(err.code, crate::exit::USAGE);
    }
}
