//! Commands executed inside the containers
//!
//! Everything the pipeline runs through `exec` is built here so the exact
//! argv can be asserted in tests.

use wpfleet_container::shell;

pub const AGENT_CONFIG_DIR: &str = "/etc/cloudflared";
pub const AGENT_CONFIG_PATH: &str = "/etc/cloudflared/config.yml";
pub const AGENT_LOG_PATH: &str = "/var/log/cloudflared.log";
/// Where the application listens inside its container
pub const LOCAL_SERVICE: &str = "http://localhost:80";

const AGENT_PACKAGE_PATH: &str = "/tmp/cloudflared.deb";

/// Public hostnames served for a domain: the apex and `www.`
pub fn hostnames(domain: &str) -> Vec<String> {
    vec![domain.to_string(), format!("www.{}", domain)]
}

pub fn credentials_path(tunnel_id: &str) -> String {
    format!("{}/{}.json", AGENT_CONFIG_DIR, tunnel_id)
}

/// Database readiness probe
///
/// Goes over TCP: the image's first-boot server listens on the socket only,
/// so a socket ping would succeed before the real server is up.
pub fn mysql_probe(root_password: &str) -> Vec<String> {
    vec![
        "mysqladmin".to_string(),
        "ping".to_string(),
        "-h".to_string(),
        "127.0.0.1".to_string(),
        "-uroot".to_string(),
        format!("-p{}", root_password),
        "--silent".to_string(),
    ]
}

/// Agent installation sequence; every command must exit 0
pub fn install_commands(package_url: &str) -> Vec<Vec<String>> {
    vec![
        shell("apt-get update"),
        shell("apt-get install -y wget"),
        shell(format!("wget -q -O {} {}", AGENT_PACKAGE_PATH, package_url)),
        shell(format!("dpkg -i {}", AGENT_PACKAGE_PATH)),
        shell(format!("rm {}", AGENT_PACKAGE_PATH)),
    ]
}

/// Write `content` to `path`, creating parent directories
///
/// Path and content travel as positional arguments, never through the
/// script text, so no quoting is involved.
pub fn write_file_command(path: &str, content: &str) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        r#"mkdir -p "$(dirname "$1")" && printf '%s' "$2" > "$1""#.to_string(),
        "sh".to_string(),
        path.to_string(),
        content.to_string(),
    ]
}

/// Start the agent detached from the exec session
pub fn start_command() -> Vec<String> {
    shell(format!(
        "nohup cloudflared tunnel --config {} run > {} 2>&1 &",
        AGENT_CONFIG_PATH, AGENT_LOG_PATH
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hostnames() {
        assert_eq!(hostnames("alice.com"), vec!["alice.com", "www.alice.com"]);
    }

    #[test]
    fn test_install_commands() {
        let commands = install_commands("https://example.com/agent.deb");
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[0], vec!["sh", "-c", "apt-get update"]);
        assert_eq!(
            commands[2][2],
            "wget -q -O /tmp/cloudflared.deb https://example.com/agent.deb"
        );
        assert_eq!(commands[4][2], "rm /tmp/cloudflared.deb");
    }

    #[test]
    fn test_write_file_command_keeps_content_out_of_script() {
        let content = "it's \"quoted\" $HOME";
        let command = write_file_command("/etc/cloudflared/t.json", content);

        assert_eq!(command[0], "sh");
        assert!(!command[2].contains(content));
        assert_eq!(command[4], "/etc/cloudflared/t.json");
        assert_eq!(command[5], content);
    }

    #[test]
    fn test_start_command() {
        assert_eq!(
            start_command()[2],
            "nohup cloudflared tunnel --config /etc/cloudflared/config.yml run > /var/log/cloudflared.log 2>&1 &"
        );
    }

    #[test]
    fn test_mysql_probe_uses_tcp() {
        let probe = mysql_probe("pw");
        assert_eq!(probe[0], "mysqladmin");
        assert!(probe.contains(&"127.0.0.1".to_string()));
        assert!(probe.contains(&"-ppw".to_string()));
    }

    #[test]
    fn test_credentials_path() {
        assert_eq!(credentials_path("t-1"), "/etc/cloudflared/t-1.json");
    }
}
