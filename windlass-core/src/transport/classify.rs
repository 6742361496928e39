//! Best-effort classification of transport-level failures
//!
//! Network errors reach the caller as a single descriptive string. The
//! classification inspects the underlying I/O error kind and degrades to the
//! error's own text when no specific kind matches.

use std::io;

/// Produces a human-readable description for a transport error.
#[must_use]
pub fn describe_transport_error(err: &russh::Error) -> String {
    match err {
        russh::Error::IO(io_err) => describe_io_error(io_err),
        russh::Error::Disconnect => "Connection closed by remote host".to_string(),
        other => other.to_string(),
    }
}

/// Maps well-known I/O error kinds onto stable descriptions
fn describe_io_error(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => "Connection refused by remote host".to_string(),
        io::ErrorKind::ConnectionReset => "Connection reset by remote host".to_string(),
        io::ErrorKind::ConnectionAborted => "Connection aborted".to_string(),
        io::ErrorKind::TimedOut => "Connection timed out".to_string(),
        io::ErrorKind::HostUnreachable | io::ErrorKind::NetworkUnreachable => {
            "Remote host unreachable".to_string()
        }
        _ => format!("Network error: {err}"),
    }
}
