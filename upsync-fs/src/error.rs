//! Error types for upsync-fs.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from filesystem backends. Both kinds are fatal
/// to a sync run; nothing here is retried.
#[derive(Debug, Error)]
pub enum FsError {
    /// A remote operation failed; `replies` holds the raw server reply
    /// lines when the protocol surfaced any.
    #[error("{message}{}", fmt_replies(.replies))]
    Transport {
        message: String,
        replies: Vec<String>,
    },

    /// A local file or directory could not be read or written.
    #[error("I/O error at {path}: {source}")]
    Local {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn fmt_replies(replies: &[String]) -> String {
    if replies.is_empty() {
        String::new()
    } else {
        format!(" [{}]", replies.join("; "))
    }
}

/// Convenience constructor for [`FsError::Transport`].
pub(crate) fn transport(message: impl Into<String>, replies: Vec<String>) -> FsError {
    FsError::Transport {
        message: message.into(),
        replies,
    }
}

/// Convenience constructor for [`FsError::Local`].
pub(crate) fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> FsError {
    FsError::Local {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_appends_reply_lines() {
        let err = transport(
            "could not delete file /a.txt",
            vec!["550 No such file".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "could not delete file /a.txt [550 No such file]"
        );
    }

    #[test]
    fn transport_display_without_replies_is_just_the_message() {
        let err = transport("host key mismatch for example.com", Vec::new());
        assert_eq!(err.to_string(), "host key mismatch for example.com");
    }

    #[test]
    fn local_display_names_the_path() {
        let err = local_io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "I/O error at /tmp/x: denied");
    }
}
