// Consistent exit codes for the folio CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   10 = document or workspace not found
//   11 = malformed frontmatter
//   12 = permission denied

use std::io;
use std::process;

use folio_common::frontmatter::FrontmatterError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    NotFound = 10,
    Malformed = 11,
    Denied = 12,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.downcast_ref::<FrontmatterError>().is_some() {
                return Self::Malformed;
            }
            if let Some(io_err) = cause.downcast_ref::<io::Error>() {
                return match io_err.kind() {
                    io::ErrorKind::NotFound => Self::NotFound,
                    io::ErrorKind::PermissionDenied => Self::Denied,
                    _ => Self::Error,
                };
            }
        }
        Self::Error
    }

    /// Exit the process with this code.
    pub fn exit(self) -> ! {
        process::exit(self.code())
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use folio_session::error::SessionError;
    use std::path::PathBuf;

    #[test]
    fn exit_code_values() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Error.code(), 1);
        assert_eq!(ExitCode::Usage.code(), 2);
        assert_eq!(ExitCode::NotFound.code(), 10);
        assert_eq!(ExitCode::Malformed.code(), 11);
        assert_eq!(ExitCode::Denied.code(), 12);
    }

    #[test]
    fn from_error_missing_file_is_not_found() {
        let err = anyhow::Error::new(SessionError::OpenFailed {
            path: PathBuf::from("/ws/posts/gone.md"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        });
        assert_eq!(ExitCode::from_error(&err), ExitCode::NotFound);
    }

    #[test]
    fn from_error_permission_denied() {
        let err = anyhow::Error::new(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            .context("failed to save `a.md`");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Denied);
    }

    #[test]
    fn from_error_frontmatter_is_malformed() {
        let err = Err::<(), _>(FrontmatterError::Unterminated)
            .context("reading `a.md`")
            .unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::Malformed);
    }

    #[test]
    fn from_error_generic_is_error() {
        let err = anyhow::anyhow!("something went wrong");
        assert_eq!(ExitCode::from_error(&err), ExitCode::Error);
    }
}
