/// Host names and addresses that always refer to the local machine
const LOCALHOSTS: &[&str] = &["::1", "127.0.0.1", "localhost", "localhost.localdomain"];

/// Returns true if `host` names the local machine.
///
/// The value is trimmed and lower-cased first. An IPv6 loopback literal may carry a
/// zone id (`::1%eth0`) which is ignored.
pub fn is_localhost(host: &str) -> bool {
    let host = host.trim().to_lowercase();

    let host = if host.starts_with("::1") {
        host.rfind('%').map_or(host.as_str(), |pos| &host[..pos])
    } else {
        host.as_str()
    };

    LOCALHOSTS.contains(&host)
}
