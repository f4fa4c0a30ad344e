//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Get path to the audiovault binary
fn audiovault_bin() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test binary name
    path.pop(); // Remove deps/
    path.push("audiovault");
    path
}

/// Run audiovault with password from stdin
fn run_audiovault_with_password(
    args: &[&str],
    password: &str,
) -> Result<std::process::Output, std::io::Error> {
    let mut child = Command::new(audiovault_bin())
        .arg("--password-stdin")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        // if it encounters an error (e.g., file not found)
        let _ = stdin.write_all(password.as_bytes());
    }

    child.wait_with_output()
}

#[test]
fn test_encrypt_decrypt_roundtrip_in_place() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audio.wav");
    let plaintext = b"RIFF fake audio container bytes";
    fs::write(&path, plaintext).unwrap();

    let result =
        run_audiovault_with_password(&["encrypt", "-f", path.to_str().unwrap()], "test").unwrap();
    assert!(
        result.status.success(),
        "encrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("has been encrypted"), "got: {}", stdout);
    assert_ne!(fs::read(&path).unwrap(), plaintext);

    let result =
        run_audiovault_with_password(&["decrypt", "-f", path.to_str().unwrap()], "test").unwrap();
    assert!(
        result.status.success(),
        "decrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("has been decrypted"), "got: {}", stdout);
    assert_eq!(fs::read(&path).unwrap(), plaintext);
}

#[test]
fn test_decrypt_with_wrong_password_fails_and_preserves_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audio.wav");
    fs::write(&path, b"secret audio").unwrap();

    let result =
        run_audiovault_with_password(&["encrypt", "-f", path.to_str().unwrap()], "correct")
            .unwrap();
    assert!(result.status.success());
    let encrypted = fs::read(&path).unwrap();

    let result =
        run_audiovault_with_password(&["decrypt", "-f", path.to_str().unwrap()], "wrong").unwrap();
    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("Decryption failed"),
        "expected decryption failure message, got: {}",
        stderr
    );
    assert_eq!(fs::read(&path).unwrap(), encrypted);
}

#[test]
fn test_decrypt_plaintext_file_fails_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audio.wav");
    let plaintext = b"never was encrypted";
    fs::write(&path, plaintext).unwrap();

    let result =
        run_audiovault_with_password(&["decrypt", "-f", path.to_str().unwrap()], "test").unwrap();
    assert!(!result.status.success());
    assert_eq!(fs::read(&path).unwrap(), plaintext);
}

#[test]
fn test_double_encrypt_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audio.wav");
    fs::write(&path, b"audio").unwrap();

    let result =
        run_audiovault_with_password(&["encrypt", "-f", path.to_str().unwrap()], "test").unwrap();
    assert!(result.status.success());
    let encrypted = fs::read(&path).unwrap();

    let result =
        run_audiovault_with_password(&["encrypt", "-f", path.to_str().unwrap()], "test").unwrap();
    assert!(!result.status.success());
    assert_eq!(fs::read(&path).unwrap(), encrypted);
}

#[test]
fn test_status_reports_asset_state() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audio.wav");
    fs::write(&path, b"audio").unwrap();

    let result =
        run_audiovault_with_password(&["status", "-f", path.to_str().unwrap()], "").unwrap();
    assert!(result.status.success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("plaintext"));

    let result =
        run_audiovault_with_password(&["encrypt", "-f", path.to_str().unwrap()], "test").unwrap();
    assert!(result.status.success());

    let result =
        run_audiovault_with_password(&["status", "-f", path.to_str().unwrap()], "").unwrap();
    assert!(result.status.success());
    assert!(String::from_utf8_lossy(&result.stdout).contains("encrypted"));
}

#[test]
fn test_encrypt_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nonexistent.wav");

    let result =
        run_audiovault_with_password(&["encrypt", "-f", path.to_str().unwrap()], "test").unwrap();
    assert!(!result.status.success());
    assert!(!path.exists());
}

#[test]
fn test_empty_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("empty.wav");
    fs::write(&path, b"").unwrap();

    let result =
        run_audiovault_with_password(&["encrypt", "-f", path.to_str().unwrap()], "test").unwrap();
    assert!(result.status.success());

    let result =
        run_audiovault_with_password(&["decrypt", "-f", path.to_str().unwrap()], "test").unwrap();
    assert!(result.status.success());
    assert_eq!(fs::read(&path).unwrap(), b"");
}

#[test]
fn test_large_file_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("large.wav");
    let large_content = vec![0x42u8; 1024 * 1024];
    fs::write(&path, &large_content).unwrap();

    let result =
        run_audiovault_with_password(&["encrypt", "-f", path.to_str().unwrap()], "test").unwrap();
    assert!(result.status.success());

    let result =
        run_audiovault_with_password(&["decrypt", "-f", path.to_str().unwrap()], "test").unwrap();
    assert!(result.status.success());
    assert_eq!(fs::read(&path).unwrap(), large_content);
}

#[test]
#[cfg(unix)]
fn test_run_pipeline_with_fake_transcriber() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audio.wav");
    fs::write(&path, b"fake audio").unwrap();

    let result =
        run_audiovault_with_password(&["encrypt", "-f", path.to_str().unwrap()], "secret").unwrap();
    assert!(result.status.success());
    let encrypted = fs::read(&path).unwrap();

    let script = temp_dir.path().join("fake-whisper.sh");
    let mut f = fs::File::create(&script).unwrap();
    writeln!(f, "#!/bin/sh").unwrap();
    writeln!(
        f,
        "echo '{{\"text\": \"hello from the vault\", \"language\": \"en\"}}'"
    )
    .unwrap();
    drop(f);
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let result = run_audiovault_with_password(
        &[
            "run",
            "-f",
            path.to_str().unwrap(),
            "--transcribe-cmd",
            script.to_str().unwrap(),
        ],
        "secret",
    )
    .unwrap();
    assert!(
        result.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("Detected language: en"), "got: {}", stdout);
    assert!(
        stdout.contains("Transcription: hello from the vault"),
        "got: {}",
        stdout
    );

    // Asset re-encrypted; ciphertext differs from the original (fresh nonce)
    // but still decrypts with the same password.
    let reencrypted = fs::read(&path).unwrap();
    assert_ne!(reencrypted, encrypted);
    let result =
        run_audiovault_with_password(&["decrypt", "-f", path.to_str().unwrap()], "secret").unwrap();
    assert!(result.status.success());
    assert_eq!(fs::read(&path).unwrap(), b"fake audio");
}

#[test]
#[cfg(unix)]
fn test_run_pipeline_failing_transcriber_reencrypts() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audio.wav");
    fs::write(&path, b"fake audio").unwrap();

    let result =
        run_audiovault_with_password(&["encrypt", "-f", path.to_str().unwrap()], "secret").unwrap();
    assert!(result.status.success());

    let script = temp_dir.path().join("broken-whisper.sh");
    let mut f = fs::File::create(&script).unwrap();
    writeln!(f, "#!/bin/sh").unwrap();
    writeln!(f, "echo 'model exploded' >&2; exit 1").unwrap();
    drop(f);
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let result = run_audiovault_with_password(
        &[
            "run",
            "-f",
            path.to_str().unwrap(),
            "--transcribe-cmd",
            script.to_str().unwrap(),
        ],
        "secret",
    )
    .unwrap();
    assert!(!result.status.success());
    // Exit code 1 (processing failure), not 2 (asset left plaintext)
    assert_eq!(result.status.code(), Some(1));

    // Asset was re-encrypted despite the failure.
    let result =
        run_audiovault_with_password(&["decrypt", "-f", path.to_str().unwrap()], "secret").unwrap();
    assert!(
        result.status.success(),
        "decrypt after failed run: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert_eq!(fs::read(&path).unwrap(), b"fake audio");
}

#[test]
#[cfg(unix)]
fn test_run_exits_2_when_asset_left_unencrypted() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("audio.wav");
    fs::write(&path, b"fake audio").unwrap();

    let result =
        run_audiovault_with_password(&["encrypt", "-f", path.to_str().unwrap()], "secret").unwrap();
    assert!(result.status.success());

    // The script deletes the asset mid-processing, so re-encryption cannot
    // find it and the pipeline ends in the loud unrecoverable failure.
    let script = temp_dir.path().join("asset-eater.sh");
    let mut f = fs::File::create(&script).unwrap();
    writeln!(f, "#!/bin/sh").unwrap();
    writeln!(f, "rm -f '{}'", path.to_str().unwrap()).unwrap();
    writeln!(f, "echo '{{\"text\": \"gone\", \"language\": \"en\"}}'").unwrap();
    drop(f);
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let result = run_audiovault_with_password(
        &[
            "run",
            "-f",
            path.to_str().unwrap(),
            "--transcribe-cmd",
            script.to_str().unwrap(),
        ],
        "secret",
    )
    .unwrap();

    assert_eq!(result.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("UNENCRYPTED"),
        "expected loud plaintext warning, got: {}",
        stderr
    );
}

#[test]
#[cfg(unix)]
fn test_reencode_invokes_transcoder() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("in.wav");
    let output = temp_dir.path().join("out.mp3");
    fs::write(&input, b"wav bytes").unwrap();

    let script = temp_dir.path().join("fake-ffmpeg.sh");
    let mut f = fs::File::create(&script).unwrap();
    writeln!(f, "#!/bin/sh").unwrap();
    writeln!(f, "cp \"$1\" \"$2\"").unwrap();
    drop(f);
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let result = run_audiovault_with_password(
        &[
            "reencode",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--cmd",
            script.to_str().unwrap(),
        ],
        "",
    )
    .unwrap();
    assert!(
        result.status.success(),
        "reencode failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert!(String::from_utf8_lossy(&result.stdout).contains("re-encoded"));
    assert_eq!(fs::read(&output).unwrap(), b"wav bytes");
}
