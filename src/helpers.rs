//! Helper utilities shared by the manager and the backends.

use std::sync::LazyLock;

use regex::Regex;

static PASSWORD_KV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(password\s*=\s*)('(?:[^'\\]|\\.)*'|[^\s;]+)")
        .expect("password key/value pattern is valid")
});

static PASSWORD_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z][a-z0-9+.-]*://[^:@/]*:)([^@]*)(@)").expect("url password pattern is valid")
});

/// Mask every password in a connection string so it can be logged.
///
/// Handles `password=...` pairs (quoted or bare, `;` or whitespace separated) and the
/// `user:password@` part of a URL.
/// ```rust
/// use pg_session_manager::helpers::redact_connection_string;
///
/// assert_eq!(
///     redact_connection_string("host=db user=app password=s3cret"),
///     "host=db user=app password=*****"
/// );
/// ```
#[must_use]
pub fn redact_connection_string(connection_string: &str) -> String {
    let masked = PASSWORD_KV.replace_all(connection_string, "${1}*****");
    PASSWORD_URL.replace(&masked, "${1}*****${3}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_passwords() {
        assert_eq!(
            redact_connection_string("host=h user=u password=secret dbname=d"),
            "host=h user=u password=***** dbname=d"
        );
        assert_eq!(
            redact_connection_string("host=h;PASSWORD=secret;dbname=d"),
            "host=h;PASSWORD=*****;dbname=d"
        );
        assert_eq!(
            redact_connection_string("host=h password = 'a b\\'c' dbname=d"),
            "host=h password = ***** dbname=d"
        );
        assert_eq!(
            redact_connection_string("postgresql://u:secret@h:5432/d"),
            "postgresql://u:*****@h:5432/d"
        );
    }

    #[test]
    fn leaves_password_free_strings_alone() {
        assert_eq!(redact_connection_string("host=h port=5432"), "host=h port=5432");
        assert_eq!(
            redact_connection_string("postgres://u@h:5432/d"),
            "postgres://u@h:5432/d"
        );
        assert_eq!(
            redact_connection_string("postgres://h:5432/d"),
            "postgres://h:5432/d"
        );
    }
}
