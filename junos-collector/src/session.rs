//! Device sessions.
//!
//! All commands of a run share one authenticated SSH session; each command
//! gets its own exec channel on it.

use crate::utils::errors::{CollectorError, Result};
use std::io::{ErrorKind, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of one remote command. Stdout is kept as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub exit_status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    /// True when stdout carries nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.stdout.iter().all(u8::is_ascii_whitespace)
    }
}

/// Something that can run a CLI command on the device.
pub trait CommandSession {
    fn exec(&mut self, command: &str) -> Result<CommandOutput>;
}

/// Connection parameters for an SSH session.
#[derive(Debug, Clone)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub command_timeout: Duration,
}

/// Password-authenticated SSH session to a Junos device.
pub struct SshSession {
    session: ssh2::Session,
    command_timeout: Duration,
}

impl SshSession {
    /// Connect, handshake and authenticate. Any failure here is fatal for the run.
    ///
    /// `command_timeout` also bounds the handshake and authentication.
    pub fn connect(target: SshTarget, password: &str) -> Result<Self> {
        let endpoint = format!("{}:{}", target.host, target.port);
        let addr = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|e| {
                CollectorError::Connection(format!("cannot resolve {}: {}", target.host, e))
            })?
            .next()
            .ok_or_else(|| {
                CollectorError::Connection(format!("no address found for {}", target.host))
            })?;

        debug!(%addr, "Opening TCP connection");
        let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| CollectorError::Connection(format!("{}: {}", endpoint, e)))?;

        let mut session = ssh2::Session::new()?;
        // ssh2 takes milliseconds as u32; 0 disables the timeout.
        session.set_timeout(timeout_millis(target.command_timeout));
        session.set_tcp_stream(tcp);
        session.handshake().map_err(|e| {
            CollectorError::Connection(format!("SSH handshake with {} failed: {}", endpoint, e))
        })?;

        session
            .userauth_password(&target.username, password)
            .map_err(|e| CollectorError::Authentication(e.to_string()))?;

        if !session.authenticated() {
            return Err(CollectorError::Authentication(format!(
                "server rejected credentials for {}",
                target.username
            )));
        }

        info!(
            host = %target.host,
            port = target.port,
            username = %target.username,
            "SSH session established"
        );

        Ok(Self {
            session,
            command_timeout: target.command_timeout,
        })
    }

    /// Read stdout and stderr side by side until the remote end closes, so a
    /// chatty stderr cannot stall stdout behind the channel window.
    fn drain(&self, channel: &mut ssh2::Channel) -> Result<(Vec<u8>, Vec<u8>)> {
        self.session.set_blocking(false);
        let drained = drain_channel(channel, self.command_timeout);
        self.session.set_blocking(true);
        drained
    }
}

impl CommandSession for SshSession {
    fn exec(&mut self, command: &str) -> Result<CommandOutput> {
        let mut channel = self.session.channel_session()?;
        channel.exec(command)?;

        let (stdout, stderr) = self.drain(&mut channel)?;

        channel.wait_close()?;
        let exit_status = channel.exit_status()?;

        Ok(CommandOutput {
            stdout,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_status,
        })
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        let _ = self.session.disconnect(None, "collection finished", None);
    }
}

fn timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

fn drain_channel(channel: &mut ssh2::Channel, timeout: Duration) -> Result<(Vec<u8>, Vec<u8>)> {
    let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut buf = [0u8; 32 * 1024];

    loop {
        let mut progressed = read_available(channel, &mut buf, &mut stdout)?;
        progressed |= read_available(&mut channel.stderr(), &mut buf, &mut stderr)?;

        if progressed {
            continue;
        }
        if channel.eof() {
            return Ok((stdout, stderr));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(CollectorError::Io(std::io::Error::new(
                ErrorKind::TimedOut,
                "timed out waiting for command output",
            )));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Append whatever `reader` has ready; `WouldBlock` means nothing yet.
fn read_available<R: Read>(reader: &mut R, buf: &mut [u8], out: &mut Vec<u8>) -> Result<bool> {
    match reader.read(buf) {
        Ok(0) => Ok(false),
        Ok(n) => {
            out.extend_from_slice(&buf[..n]);
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(false),
        Err(e) => Err(e.into()),
    }
}
