//! System clipboard access

/// Copy `text` to the system clipboard
pub fn copy_text(text: &str) -> anyhow::Result<()> {
    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| anyhow::anyhow!("clipboard unavailable: {}", e))?;
    clipboard
        .set_text(text.to_string())
        .map_err(|e| anyhow::anyhow!("copy failed: {}", e))?;
    tracing::debug!(chars = text.chars().count(), "copied reply to clipboard");
    Ok(())
}
