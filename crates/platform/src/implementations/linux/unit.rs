//! systemd unit file rendering

use hotswap_types::{LaunchSpec, ServiceAccount, ServiceIdentity};
use std::path::Path;

/// Unit name systemd knows a service by
#[must_use]
pub fn unit_name(service: &str) -> String {
    if service.ends_with(".service") {
        service.to_string()
    } else {
        format!("{service}.service")
    }
}

/// Service name without the `.service` suffix
#[must_use]
pub fn service_name(unit: &str) -> &str {
    unit.strip_suffix(".service").unwrap_or(unit)
}

/// Quote one `ExecStart=` word.
///
/// `%` is doubled so systemd does not expand it as a specifier.
fn quote_word(word: &str) -> String {
    let escaped = word.replace('%', "%%");
    let needs_quotes = escaped.is_empty()
        || escaped
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | ';'));
    if !needs_quotes {
        return escaped;
    }
    let mut quoted = String::with_capacity(escaped.len() + 2);
    quoted.push('"');
    for c in escaped.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn exec_line(program: &Path, args: &[String]) -> String {
    let mut line = quote_word(&program.to_string_lossy());
    for arg in args {
        line.push(' ');
        line.push_str(&quote_word(arg));
    }
    line
}

/// Render the unit file registered for `identity`.
///
/// Pause/continue and session-change flags have no systemd counterpart and
/// are not written.
#[must_use]
pub fn render_unit(identity: &ServiceIdentity, launch: &LaunchSpec) -> String {
    let description = if identity.description().is_empty() {
        identity.display_name().to_string()
    } else {
        format!("{}: {}", identity.display_name(), identity.description())
    };

    let mut lines = vec![
        "[Unit]".to_string(),
        format!("Description={}", description.replace('\n', " ")),
        "After=network.target".to_string(),
        String::new(),
        "[Service]".to_string(),
        "Type=simple".to_string(),
        format!("ExecStart={}", exec_line(&launch.program, &launch.args)),
    ];
    if let Some(dir) = launch.program.parent().filter(|d| !d.as_os_str().is_empty()) {
        lines.push(format!("WorkingDirectory={}", dir.display()));
    }
    if let ServiceAccount::User(user) = &launch.account {
        lines.push(format!("User={user}"));
    }
    if let Some(instance) = identity.instance_name() {
        lines.push(format!("Environment=HOTSWAP_INSTANCE={}", quote_word(instance)));
    }
    lines.push(format!(
        "TimeoutStopSec={}",
        identity.stop_timeout().as_secs().max(1)
    ));
    if !identity.can_shutdown() {
        // without shutdown handling the payload only sees SIGKILL
        lines.push("KillSignal=SIGKILL".to_string());
    }
    lines.extend([
        "Restart=no".to_string(),
        String::new(),
        "[Install]".to_string(),
        "WantedBy=multi-user.target".to_string(),
        String::new(),
    ]);
    lines.join("\n")
}
