//! Signature capture capability
//!
//! Capture runs outside this process: a device program records the signature
//! and, when a reader is attached, the fingerprint, and writes them as images
//! named after the party.

use crate::error::IntakeError;
use std::path::{Path, PathBuf};
use std::process::Command;
use uuid::Uuid;

/// Signature image name for a party
#[must_use]
pub fn signature_file_name(party_id: Uuid) -> String {
    format!("{}.png", party_key(party_id))
}

/// Fingerprint image name for a party
#[must_use]
pub fn fingerprint_file_name(party_id: Uuid) -> String {
    format!("{}_fp.png", party_key(party_id))
}

fn party_key(party_id: Uuid) -> String {
    party_id.hyphenated().to_string().to_lowercase()
}

/// Images produced by one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImages {
    pub signature: PathBuf,
    pub fingerprint: Option<PathBuf>,
}

impl CapturedImages {
    /// Every image path, signature first
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.signature.as_path()).chain(self.fingerprint.as_deref())
    }
}

/// Blocking signature capture
#[cfg_attr(test, mockall::automock)]
pub trait SignatureCapture {
    /// Capture for one party; `Ok(None)` when the party declined
    ///
    /// # Errors
    /// Returns error if the capture could not be run at all
    fn capture(
        &mut self,
        party_id: Uuid,
        party_name: &str,
    ) -> Result<Option<CapturedImages>, IntakeError>;
}

/// Capture through an external program
///
/// Invoked as `<tool> <file option> <dir>/<party>.png <name option> <party name>`
/// and waited on with no timeout.
#[derive(Debug, Clone)]
pub struct ProcessSignatureCapture {
    tool: PathBuf,
    file_path_option: String,
    party_name_option: String,
    signatures_dir: PathBuf,
}

impl ProcessSignatureCapture {
    #[must_use]
    pub fn new(
        tool: impl Into<PathBuf>,
        file_path_option: impl Into<String>,
        party_name_option: impl Into<String>,
        signatures_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool: tool.into(),
            file_path_option: file_path_option.into(),
            party_name_option: party_name_option.into(),
            signatures_dir: signatures_dir.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn signatures_dir(&self) -> &Path {
        &self.signatures_dir
    }

    /// Command line for one party
    #[must_use]
    pub fn command(&self, party_id: Uuid, party_name: &str) -> Command {
        let mut command = Command::new(&self.tool);
        command
            .arg(&self.file_path_option)
            .arg(self.signatures_dir.join(signature_file_name(party_id)))
            .arg(&self.party_name_option)
            .arg(party_name);
        command
    }
}

impl SignatureCapture for ProcessSignatureCapture {
    fn capture(
        &mut self,
        party_id: Uuid,
        party_name: &str,
    ) -> Result<Option<CapturedImages>, IntakeError> {
        std::fs::create_dir_all(&self.signatures_dir)
            .map_err(|e| IntakeError::io_error(&self.signatures_dir, e))?;

        tracing::info!(party = %party_id, tool = %self.tool.display(), "starting signature capture");
        let status = self
            .command(party_id, party_name)
            .status()
            .map_err(|source| IntakeError::CaptureTool {
                tool: self.tool.clone(),
                source,
            })?;
        if !status.success() {
            tracing::warn!(party = %party_id, %status, "capture tool exited with failure");
        }

        let signature = self.signatures_dir.join(signature_file_name(party_id));
        if !signature.exists() {
            return Ok(None);
        }
        let fingerprint = self.signatures_dir.join(fingerprint_file_name(party_id));
        tracing::info!(file = %signature.display(), "signature file");
        Ok(Some(CapturedImages {
            signature,
            fingerprint: fingerprint.exists().then_some(fingerprint),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_names_use_lowercase_party_id() {
        let id = Uuid::parse_str("6F9619FF-8B86-D011-B42D-00C04FC964FF").unwrap();
        assert_eq!(signature_file_name(id), "6f9619ff-8b86-d011-b42d-00c04fc964ff.png");
        assert_eq!(fingerprint_file_name(id), "6f9619ff-8b86-d011-b42d-00c04fc964ff_fp.png");
    }

    #[test]
    fn command_line_layout() {
        let id = Uuid::new_v4();
        let capture = ProcessSignatureCapture::new("capture.exe", "-f", "-n", "signatures");
        let command = capture.command(id, "Ana Perez");
        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(command.get_program(), "capture.exe");
        assert_eq!(
            args,
            vec![
                "-f".to_string(),
                Path::new("signatures")
                    .join(signature_file_name(id))
                    .to_string_lossy()
                    .into_owned(),
                "-n".to_string(),
                "Ana Perez".to_string(),
            ]
        );
    }

    #[test]
    fn missing_tool_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut capture = ProcessSignatureCapture::new(
            dir.path().join("no-such-tool"),
            "-f",
            "-n",
            dir.path().join("signatures"),
        );
        let err = capture.capture(Uuid::new_v4(), "Ana").unwrap_err();
        assert!(matches!(err, IntakeError::CaptureTool { .. }));
        assert!(err.is_structural());
    }

    #[test]
    fn captured_paths_list_signature_first() {
        let images = CapturedImages {
            signature: PathBuf::from("a.png"),
            fingerprint: Some(PathBuf::from("a_fp.png")),
        };
        let paths: Vec<&Path> = images.paths().collect();
        assert_eq!(paths, vec![Path::new("a.png"), Path::new("a_fp.png")]);
    }
}
