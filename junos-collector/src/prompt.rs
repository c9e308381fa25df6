//! Interactive prompts for device connection details.
//!
//! Values already given on the command line or in the config file are used
//! as-is; only missing ones are asked for. The password is read once, hidden.

use crate::config::{DeviceConfig, DEVICE_PASSWORD_ENV};
use crate::session::SshTarget;
use crate::utils::errors::{CollectorError, Result};
use std::io::{self, BufRead, Write};

/// Ask for a value on `output`, read one line from `input`.
///
/// An empty answer yields `default` when there is one, otherwise an error.
pub fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &str,
    default: Option<&str>,
) -> Result<String> {
    match default {
        Some(d) => write!(output, "{} [{}]: ", label, d)?,
        None => write!(output, "{}: ", label)?,
    }
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 && default.is_none() {
        return Err(CollectorError::Config(format!("no value given for {}", label)));
    }

    let value = line.trim();
    if !value.is_empty() {
        return Ok(value.to_string());
    }

    default
        .map(str::to_string)
        .ok_or_else(|| CollectorError::Config(format!("{} is required", label)))
}

/// Fill in host, port and username, prompting for whatever `device` lacks.
///
/// The port is only asked for when the host had to be prompted for too.
pub fn resolve_target<R: BufRead, W: Write>(
    device: &DeviceConfig,
    input: &mut R,
    output: &mut W,
) -> Result<SshTarget> {
    let (host, port) = match &device.host {
        Some(host) => (host.clone(), device.port),
        None => {
            let host = ask(input, output, "Enter device hostname or IP", None)?;
            let default_port = device.port.to_string();
            let port = ask(input, output, "Enter SSH port", Some(default_port.as_str()))?;
            let port = port
                .parse::<u16>()
                .map_err(|_| CollectorError::Config(format!("invalid SSH port: {}", port)))?;
            (host, port)
        }
    };

    let username = match &device.username {
        Some(username) => username.clone(),
        None => ask(input, output, "Enter username", None)?,
    };

    Ok(SshTarget {
        host,
        port,
        username,
        command_timeout: device.command_timeout(),
    })
}

/// Device password from the environment, or a single hidden prompt.
pub fn device_password() -> Result<String> {
    if let Ok(password) = std::env::var(DEVICE_PASSWORD_ENV) {
        return Ok(password);
    }
    Ok(rpassword::prompt_password("Enter password: ")?)
}

/// Resolve the target against the process's stdin/stdout.
pub fn resolve_target_interactive(device: &DeviceConfig) -> Result<SshTarget> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    resolve_target(device, &mut input, &mut output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_ask_returns_trimmed_answer() {
        let mut input = Cursor::new("  192.0.2.1 \n");
        let mut output = Vec::new();
        let value = ask(&mut input, &mut output, "Enter device hostname or IP", None).unwrap();
        assert_eq!(value, "192.0.2.1");
        assert_eq!(String::from_utf8(output).unwrap(), "Enter device hostname or IP: ");
    }

    #[test]
    fn test_ask_uses_default_on_empty_answer() {
        let mut input = Cursor::new("\n");
        let mut output = Vec::new();
        let value = ask(&mut input, &mut output, "Enter SSH port", Some("22")).unwrap();
        assert_eq!(value, "22");
        assert_eq!(String::from_utf8(output).unwrap(), "Enter SSH port [22]: ");
    }

    #[test]
    fn test_ask_required_value_missing() {
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        assert!(ask(&mut input, &mut output, "Enter username", None).is_err());
    }

    #[test]
    fn test_resolve_target_prompts_for_missing() {
        let device = DeviceConfig::default();
        let mut input = Cursor::new("core-sw1\n\nnetops\n");
        let mut output = Vec::new();

        let target = resolve_target(&device, &mut input, &mut output).unwrap();
        assert_eq!(target.host, "core-sw1");
        assert_eq!(target.port, 22);
        assert_eq!(target.username, "netops");
        assert_eq!(target.command_timeout, device.command_timeout());
    }

    #[test]
    fn test_resolve_target_uses_configured_values() {
        let device = DeviceConfig {
            host: Some("192.0.2.1".to_string()),
            port: 2222,
            username: Some("audit".to_string()),
            ..DeviceConfig::default()
        };
        let mut input = Cursor::new("");
        let mut output = Vec::new();

        let target = resolve_target(&device, &mut input, &mut output).unwrap();
        assert_eq!(target.host, "192.0.2.1");
        assert_eq!(target.port, 2222);
        assert_eq!(target.username, "audit");
        assert!(output.is_empty());
    }

    #[test]
    fn test_resolve_target_invalid_port() {
        let device = DeviceConfig::default();
        let mut input = Cursor::new("core-sw1\nssh\nnetops\n");
        let mut output = Vec::new();
        assert!(matches!(
            resolve_target(&device, &mut input, &mut output),
            Err(CollectorError::Config(_))
        ));
    }
}
