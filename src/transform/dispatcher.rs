// Runs the external telephone transformer as a child process
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::settings::TransformerSettings;

/// Reported when the transformer exits non-zero without writing anything
/// to its error channel.
const GENERIC_FAILURE: &str = "transformer failed without diagnostic output";

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("could not launch transformer `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{0}")]
    Failed(String),
    #[error("transformer timed out after {0} seconds")]
    TimedOut(u64),
    #[error("transformer exited successfully but did not produce {}", .0.display())]
    MissingOutput(PathBuf),
    #[error("transformer process error: {0}")]
    Process(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub output_path: PathBuf,
}

/// Path the transformer is expected to write: same directory as the input,
/// filename `<stem>_telephone<extension>`. Pure function of the input path.
pub fn derive_output_path(input: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push("_telephone");
    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }
    input.with_file_name(name)
}

/// Invokes the external transformer for one input file.
///
/// Every call spawns exactly one child process and shares no state with any
/// other call; serializing submissions is the caller's job, not the
/// dispatcher's. The child is invoked with two positional arguments, input
/// path then output path, and its stderr is collected as one text blob for
/// failure reports. Stdout is ignored.
pub struct Dispatcher {
    program: String,
    script: Option<PathBuf>,
    timeout: Option<Duration>,
    verify_output: bool,
}

impl Dispatcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            script: None,
            timeout: None,
            verify_output: false,
        }
    }

    /// Script handed to the program ahead of the input/output paths,
    /// for interpreter-style transformers (`python telephone.py in out`).
    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Kill the child and fail the job after this long. Unset means wait
    /// for process exit no matter how long it takes.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Require the predicted output file to exist before reporting success.
    /// Off by default: exit code 0 is trusted as-is.
    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify_output = verify;
        self
    }

    pub fn from_settings(settings: &TransformerSettings) -> Self {
        let mut dispatcher = Dispatcher::new(settings.program.clone())
            .with_timeout(settings.timeout_secs.map(Duration::from_secs))
            .with_verification(settings.verify_output);
        if let Some(script) = &settings.script {
            dispatcher = dispatcher.with_script(script);
        }
        dispatcher
    }

    pub async fn dispatch(&self, input: &Path) -> Result<TransformOutcome, TransformError> {
        let output_path = derive_output_path(input);

        let mut command = Command::new(&self.program);
        if let Some(script) = &self.script {
            command.arg(script);
        }
        command
            .arg(input)
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| TransformError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let mut stderr = child.stderr.take();
        let child_ref = &mut child;
        let wait = async move {
            let mut raw = Vec::new();
            if let Some(pipe) = stderr.as_mut() {
                let _ = pipe.read_to_end(&mut raw).await;
            }
            let status = child_ref.wait().await?;
            Ok::<_, std::io::Error>((status, raw))
        };

        let (status, raw) = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, wait).await;
                match waited {
                    Ok(finished) => finished?,
                    Err(_) => {
                        let _ = child.start_kill();
                        let _ = child.wait().await;
                        return Err(TransformError::TimedOut(limit.as_secs()));
                    }
                }
            }
            None => wait.await?,
        };

        if !status.success() {
            let diagnostics = String::from_utf8_lossy(&raw);
            let message = diagnostics.trim();
            if message.is_empty() {
                return Err(TransformError::Failed(GENERIC_FAILURE.to_string()));
            }
            return Err(TransformError::Failed(message.to_string()));
        }

        if self.verify_output && !output_path.exists() {
            return Err(TransformError::MissingOutput(output_path));
        }

        Ok(TransformOutcome { output_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_appends_suffix_before_extension() {
        let out = derive_output_path(Path::new("/music/song.mp3"));
        assert_eq!(out, Path::new("/music/song_telephone.mp3"));
    }

    #[test]
    fn output_path_keeps_directory_and_extension_case() {
        let out = derive_output_path(Path::new("/a/b/Track One.FLAC"));
        assert_eq!(out, Path::new("/a/b/Track One_telephone.FLAC"));
    }

    #[test]
    fn output_path_without_extension() {
        let out = derive_output_path(Path::new("/music/song"));
        assert_eq!(out, Path::new("/music/song_telephone"));
    }

    #[test]
    fn output_path_is_not_idempotent() {
        // Transforming an already transformed file stacks the suffix.
        let once = derive_output_path(Path::new("/music/song.ogg"));
        let twice = derive_output_path(&once);
        assert_eq!(twice, Path::new("/music/song_telephone_telephone.ogg"));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn stub_transformer(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("transformer.sh");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path
        }

        fn input_file(dir: &Path) -> PathBuf {
            let input = dir.join("song.wav");
            std::fs::write(&input, b"RIFF").unwrap();
            input
        }

        #[tokio::test]
        async fn exit_zero_is_success_without_checking_the_output() {
            let dir = tempfile::tempdir().unwrap();
            let stub = stub_transformer(dir.path(), "exit 0");
            let input = input_file(dir.path());

            let outcome = Dispatcher::new(stub.to_string_lossy())
                .dispatch(&input)
                .await
                .unwrap();

            assert_eq!(outcome.output_path, dir.path().join("song_telephone.wav"));
            // The exit code is trusted; nothing was actually written there.
            assert!(!outcome.output_path.exists());
        }

        #[tokio::test]
        async fn nonzero_exit_reports_captured_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let stub = stub_transformer(dir.path(), "echo 'bad codec' >&2\nexit 1");
            let input = input_file(dir.path());

            let err = Dispatcher::new(stub.to_string_lossy())
                .dispatch(&input)
                .await
                .unwrap_err();

            match err {
                TransformError::Failed(message) => assert_eq!(message, "bad codec"),
                other => panic!("expected Failed, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn nonzero_exit_without_stderr_reports_generic_message() {
            let dir = tempfile::tempdir().unwrap();
            let stub = stub_transformer(dir.path(), "exit 1");
            let input = input_file(dir.path());

            let err = Dispatcher::new(stub.to_string_lossy())
                .dispatch(&input)
                .await
                .unwrap_err();

            match err {
                TransformError::Failed(message) => {
                    assert!(!message.is_empty());
                    assert_eq!(message, GENERIC_FAILURE);
                }
                other => panic!("expected Failed, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn missing_program_is_a_spawn_failure() {
            let dir = tempfile::tempdir().unwrap();
            let input = input_file(dir.path());
            let missing = dir.path().join("no-such-transformer");

            let err = Dispatcher::new(missing.to_string_lossy())
                .dispatch(&input)
                .await
                .unwrap_err();

            assert!(matches!(err, TransformError::Spawn { .. }));
        }

        #[tokio::test]
        async fn script_argument_precedes_the_file_paths() {
            let dir = tempfile::tempdir().unwrap();
            let script = dir.path().join("check_args.sh");
            std::fs::write(&script, "[ -f \"$1\" ] || exit 3\n[ -n \"$2\" ] || exit 4\nexit 0\n")
                .unwrap();
            let input = input_file(dir.path());

            let outcome = Dispatcher::new("sh")
                .with_script(&script)
                .dispatch(&input)
                .await
                .unwrap();
            assert_eq!(outcome.output_path, dir.path().join("song_telephone.wav"));
        }

        #[tokio::test]
        async fn timeout_kills_a_hung_transformer() {
            let dir = tempfile::tempdir().unwrap();
            let stub = stub_transformer(dir.path(), "sleep 30");
            let input = input_file(dir.path());

            let err = Dispatcher::new(stub.to_string_lossy())
                .with_timeout(Some(Duration::from_secs(1)))
                .dispatch(&input)
                .await
                .unwrap_err();

            assert!(matches!(err, TransformError::TimedOut(1)));
        }

        #[tokio::test]
        async fn verification_rejects_a_missing_output() {
            let dir = tempfile::tempdir().unwrap();
            let stub = stub_transformer(dir.path(), "exit 0");
            let input = input_file(dir.path());

            let err = Dispatcher::new(stub.to_string_lossy())
                .with_verification(true)
                .dispatch(&input)
                .await
                .unwrap_err();

            assert!(matches!(err, TransformError::MissingOutput(_)));
        }

        #[tokio::test]
        async fn verification_accepts_a_produced_output() {
            let dir = tempfile::tempdir().unwrap();
            let stub = stub_transformer(dir.path(), ": > \"$2\"\nexit 0");
            let input = input_file(dir.path());

            let outcome = Dispatcher::new(stub.to_string_lossy())
                .with_verification(true)
                .dispatch(&input)
                .await
                .unwrap();
            assert!(outcome.output_path.exists());
        }
    }
}
