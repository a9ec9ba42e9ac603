use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::{AgentSession, Command};
use crate::lifecycle::DeliveryStatus;
use crate::signature::{encode_data_uri, ImageSurface, SignaturePad, StrokeStyle, PNG_DATA_URI_PREFIX};
use crate::sync::SubmitOutcome;
use crate::types::DeliveryId;
use crate::workflow::StatusUpdateSession;

pub struct UpdateCommand {
    pub id: DeliveryId,
    pub status: String,
    pub notes: Option<String>,
    pub signature_file: Option<PathBuf>,
}

impl UpdateCommand {
    pub fn new(
        id: impl Into<DeliveryId>,
        status: String,
        notes: Option<String>,
        signature_file: Option<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            status,
            notes,
            signature_file,
        }
    }

    fn signature_pad(session: &AgentSession) -> SignaturePad {
        SignaturePad::with_style(
            Box::new(ImageSurface),
            StrokeStyle {
                width: session.config.signature.stroke_width,
                ..StrokeStyle::default()
            },
        )
    }
}

/// Accept either a raw PNG or a text file holding a PNG data URI
async fn read_signature_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read signature file {}", path.display()))?;

    match std::str::from_utf8(&bytes) {
        Ok(text) if text.trim_start().starts_with(PNG_DATA_URI_PREFIX) => Ok(text.trim().to_string()),
        _ => Ok(encode_data_uri(&bytes)),
    }
}

impl Command for UpdateCommand {
    async fn execute(&self, session: &mut AgentSession) -> Result<()> {
        let status = DeliveryStatus::parse(&self.status)?;

        if session.reconciler.record(&self.id).is_none() {
            if let Err(e) = session.reconciler.refresh(&session.ctx).await {
                println!("📴 Working offline ({e})");
            }
        }

        let record = session
            .reconciler
            .record(&self.id)
            .cloned()
            .ok_or_else(|| anyhow!("delivery {} is not assigned to {}", self.id, session.ctx.agent))?;
        if !session.ctx.owns(&record) {
            return Err(anyhow!("delivery {} is not assigned to {}", self.id, session.ctx.agent));
        }

        let mut draft = StatusUpdateSession::open(&record, Self::signature_pad(session));
        draft.select_status(status);
        if let Some(notes) = &self.notes {
            draft.set_notes(notes.clone());
        }

        if let Some(path) = &self.signature_file {
            let encoded = read_signature_file(path).await?;
            draft.pad_mut().load_existing(&encoded)?;
        } else if draft.requires_signature() {
            // the stored signature must not silently stand in for a new delivery
            draft.pad_mut().clear();
        }

        match draft.submit(&mut session.reconciler).await? {
            SubmitOutcome::Confirmed { .. } => {
                println!("✅ Delivery #{} is now {}", self.id, status.label());
            }
            SubmitOutcome::Queued { queue_len, .. } => {
                println!(
                    "📥 Saved offline: delivery #{} marked {}, pending sync ({} queued)",
                    self.id,
                    status.label(),
                    queue_len
                );
            }
        }

        session.print_durability_warning();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_signature_file_accepts_data_uri_or_png() {
        let dir = TempDir::new().unwrap();

        let uri_file = dir.path().join("sig.txt");
        std::fs::write(&uri_file, "data:image/png;base64,AAAA\n").unwrap();
        assert_eq!(
            read_signature_file(&uri_file).await.unwrap(),
            "data:image/png;base64,AAAA"
        );

        let png_file = dir.path().join("sig.png");
        std::fs::write(&png_file, [0x89, b'P', b'N', b'G']).unwrap();
        assert_eq!(
            read_signature_file(&png_file).await.unwrap(),
            "data:image/png;base64,iVBORw=="
        );
    }
}
