//! Password reading functionality

use crate::error::{ErrorCategory, ErrorKind, Result, VaultError};
use std::io::{self, IsTerminal, Read, Write};
use zeroize::Zeroizing;

/// Trait for reading passwords from various sources
pub trait PasswordReader {
    /// Read a password.
    ///
    /// Returns the password wrapped in `Zeroizing` to ensure it is securely
    /// wiped from memory when dropped.
    fn read_password(&mut self) -> Result<Zeroizing<String>>;
}

/// Returns a fixed password (for testing)
pub struct ConstantPasswordReader {
    password: Zeroizing<String>,
}

impl ConstantPasswordReader {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: Zeroizing::new(password.into()),
        }
    }
}

impl PasswordReader for ConstantPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new((*self.password).clone()))
    }
}

/// Reads a password from any io::Read source
///
/// Reads to end of stream; a single trailing newline is stripped so piped
/// input like `echo secret | audiovault ...` behaves as expected.
pub struct ReaderPasswordReader {
    reader: Box<dyn Read>,
}

impl ReaderPasswordReader {
    pub fn new(reader: Box<dyn Read>) -> Self {
        Self { reader }
    }
}

impl PasswordReader for ReaderPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        let mut data = Zeroizing::new(String::new());
        self.reader.read_to_string(&mut data).map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("error reading password: {}", e),
                e,
            )
        })?;
        let mut trimmed = Zeroizing::new(data.as_str().to_string());
        if trimmed.ends_with('\n') {
            trimmed.pop();
            if trimmed.ends_with('\r') {
                trimmed.pop();
            }
        }
        Ok(trimmed)
    }
}

/// Reads a password from the terminal with no echo
pub struct TerminalPasswordReader;

impl TerminalPasswordReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalPasswordReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordReader for TerminalPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        if !io::stdin().is_terminal() {
            return Err(VaultError::with_kind(
                ErrorCategory::User,
                ErrorKind::PasswordUnavailable,
                "cannot read password from terminal - stdin is not a terminal",
            ));
        }

        io::stderr()
            .write_all(b"Password (audiovault): ")
            .map_err(|e| {
                VaultError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::Io,
                    format!("failed to write prompt: {}", e),
                    e,
                )
            })?;
        io::stderr().flush().map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::Io,
                format!("failed to flush prompt: {}", e),
                e,
            )
        })?;

        // Read password *without echo*
        let password = rpassword::read_password().map_err(|e| {
            VaultError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PasswordUnavailable,
                format!("failure reading password: {}", e),
                e,
            )
        })?;

        Ok(Zeroizing::new(password))
    }
}

/// Wraps another PasswordReader and caches the result
///
/// Provides "at most once" semantics - the upstream reader is called
/// only on the first invocation, and subsequent calls return the cached
/// value. This is how a pipeline run captures the password exactly once and
/// reuses it verbatim for the decrypt/re-encrypt pair. The cached password
/// is wrapped in `Zeroizing` and will be securely wiped when this reader is
/// dropped.
pub struct CachingPasswordReader {
    upstream: Box<dyn PasswordReader>,
    cached: Option<Zeroizing<String>>,
}

impl CachingPasswordReader {
    pub fn new(upstream: Box<dyn PasswordReader>) -> Self {
        Self {
            upstream,
            cached: None,
        }
    }
}

impl PasswordReader for CachingPasswordReader {
    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        if self.cached.is_none() {
            let password = self.upstream.read_password()?;
            self.cached = Some(password);
        }
        let inner: &String = self.cached.as_ref().unwrap();
        Ok(Zeroizing::new(inner.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCategory, ErrorKind, VaultError};

    #[test]
    fn test_constant_reader() {
        let mut reader = ConstantPasswordReader::new("test123");
        assert_eq!(&*reader.read_password().unwrap(), "test123");
        assert_eq!(&*reader.read_password().unwrap(), "test123");
    }

    #[test]
    fn test_reader_password_reader() {
        let data = b"mypassword";
        let mut reader = ReaderPasswordReader::new(Box::new(&data[..]));
        assert_eq!(&*reader.read_password().unwrap(), "mypassword");
    }

    #[test]
    fn test_reader_password_reader_strips_trailing_newline() {
        let data = b"mypassword\n";
        let mut reader = ReaderPasswordReader::new(Box::new(&data[..]));
        assert_eq!(&*reader.read_password().unwrap(), "mypassword");

        let data = b"mypassword\r\n";
        let mut reader = ReaderPasswordReader::new(Box::new(&data[..]));
        assert_eq!(&*reader.read_password().unwrap(), "mypassword");
    }

    #[test]
    fn test_reader_password_reader_empty() {
        let data = b"";
        let mut reader = ReaderPasswordReader::new(Box::new(&data[..]));
        assert_eq!(&*reader.read_password().unwrap(), "");
    }

    #[test]
    fn test_caching_reader() {
        // Track how many times upstream is called
        use std::cell::RefCell;
        use std::rc::Rc;

        struct CountingReader {
            password: String,
            call_count: Rc<RefCell<usize>>,
        }

        impl PasswordReader for CountingReader {
            fn read_password(&mut self) -> Result<Zeroizing<String>> {
                *self.call_count.borrow_mut() += 1;
                Ok(Zeroizing::new(self.password.clone()))
            }
        }

        let call_count = Rc::new(RefCell::new(0));
        let upstream = CountingReader {
            password: "cached_pass".to_string(),
            call_count: call_count.clone(),
        };

        let mut caching = CachingPasswordReader::new(Box::new(upstream));

        // First call should invoke upstream
        assert_eq!(&*caching.read_password().unwrap(), "cached_pass");
        assert_eq!(*call_count.borrow(), 1);

        // Second call should return cached value without calling upstream
        assert_eq!(&*caching.read_password().unwrap(), "cached_pass");
        assert_eq!(*call_count.borrow(), 1);
    }

    #[test]
    fn test_caching_reader_with_error() {
        // Reader that always fails
        struct FailingReader;

        impl PasswordReader for FailingReader {
            fn read_password(&mut self) -> Result<Zeroizing<String>> {
                Err(VaultError::with_kind(
                    ErrorCategory::Internal,
                    ErrorKind::PasswordUnavailable,
                    "simulated error",
                ))
            }
        }

        let mut caching = CachingPasswordReader::new(Box::new(FailingReader));

        // First call should propagate error
        assert!(caching.read_password().is_err());

        // Error should not be cached - subsequent call should try again
        assert!(caching.read_password().is_err());
    }
}
