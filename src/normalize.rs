//! Host normalization.
//!
//! Callers hand the client whatever they copied out of their project
//! dashboard — `https://abc.supabase.co`, `abc.supabase.co/`, sometimes a
//! full URL with a path. The socket open call needs a bare hostname, so the
//! scheme prefix, any path, and trailing slashes are stripped up front.

/// Strip a scheme prefix, path suffix, and surrounding whitespace from a
/// host string.
///
/// # Examples
///
/// ```rust
/// use realtime_link::normalize::normalize_host;
///
/// assert_eq!(normalize_host("https://x.supabase.co"), "x.supabase.co");
/// assert_eq!(normalize_host("wss://x.supabase.co/"), "x.supabase.co");
/// assert_eq!(normalize_host("x.supabase.co"), "x.supabase.co");
/// ```
pub fn normalize_host(raw: &str) -> String {
    let mut host = raw.trim();

    for scheme in ["https://", "http://", "wss://", "ws://"] {
        if let Some(stripped) = host.strip_prefix(scheme) {
            host = stripped;
            break;
        }
    }

    // Anything after the first slash is a path the caller pasted in.
    if let Some(idx) = host.find('/') {
        host = &host[..idx];
    }

    host.to_string()
}
