/// Default base path of the messenger endpoint on the server.
pub const DEFAULT_BASE_PATH: &str = "/_webmsg";

/// Placeholder path segment that asks the server for a new session.
pub const NEW_SESSION: &str = "new";

/// Build the request URL for a session.
///
/// `base` + `/` + session id, or [`NEW_SESSION`] when no session is known.
pub fn session_url(base: &str, session: Option<&str>) -> String {
    let segment = session.unwrap_or(NEW_SESSION);
    if base.ends_with('/') {
        format!("{base}{segment}")
    } else {
        format!("{base}/{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_placeholder() {
        assert_eq!(
            session_url("http://host:8000/_webmsg", None),
            "http://host:8000/_webmsg/new"
        );
    }

    #[test]
    fn known_session_id() {
        assert_eq!(
            session_url("http://host/_webmsg", Some("abc123")),
            "http://host/_webmsg/abc123"
        );
    }

    #[test]
    fn trailing_slash_not_doubled() {
        assert_eq!(session_url("http://host/msg/", Some("S1")), "http://host/msg/S1");
    }
}
