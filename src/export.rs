//! Export renderers: turn a [`Summary`] into a printable HTML page, plain
//! text or pretty JSON.
//!
//! Rendering is pure and total. Empty takeaway/note/flashcard lists render as
//! empty sections (flashcards are omitted entirely), a missing title falls
//! back to [`crate::model::DEFAULT_TITLE`], and the display-only `flipped` flag on
//! flashcards never reaches the output.

use crate::error::ClientError;
use crate::model::Summary;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Base name used for export files when the summary has no title.
pub const DEFAULT_FILE_STEM: &str = "lecture-summary";

/// Output format for [`render`] and [`write_export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ExportFormat {
    /// Plain text with emoji section headers.
    #[default]
    Text,
    /// Self-contained HTML page that opens the print dialog on load.
    Html,
    /// The summary as pretty-printed JSON.
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
        }
    }

    /// Pick a format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "text" => Some(ExportFormat::Text),
            "html" | "htm" => Some(ExportFormat::Html),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

/// Render `summary` in the requested format.
pub fn render(summary: &Summary, format: ExportFormat) -> Result<String, ClientError> {
    match format {
        ExportFormat::Text => Ok(render_plain_text(summary)),
        ExportFormat::Html => Ok(render_printable(summary)),
        ExportFormat::Json => serde_json::to_string_pretty(summary)
            .map_err(|e| ClientError::Serialization(e.to_string())),
    }
}

/// Suggested download name: the title, or `lecture-summary`, plus extension.
///
/// The title is used verbatim apart from path separators, which are replaced
/// so the name stays a single path component.
pub fn export_filename(summary: &Summary, format: ExportFormat) -> String {
    let stem = summary
        .title()
        .map(|t| t.replace(['/', '\\'], "-"))
        .unwrap_or_else(|| DEFAULT_FILE_STEM.to_string());
    format!("{}.{}", stem, format.extension())
}

/// Where an export for `target` goes.
///
/// An existing directory, or a path ending in a separator (`notes/`), gets
/// [`export_filename`] appended; anything else is used as the file path.
/// Missing directories are created by [`write_export`].
pub fn export_path(target: &Path, summary: &Summary, format: ExportFormat) -> PathBuf {
    let names_dir = target
        .as_os_str()
        .to_string_lossy()
        .ends_with(std::path::is_separator);
    if names_dir || target.is_dir() {
        target.join(export_filename(summary, format))
    } else {
        target.to_path_buf()
    }
}

/// Render and write `summary` to `path`.
///
/// The file is written to a sibling temp file first and then renamed, so a
/// crash never leaves a half-written export behind.
pub async fn write_export(
    summary: &Summary,
    path: impl AsRef<Path>,
    format: ExportFormat,
) -> Result<(), ClientError> {
    let path = path.as_ref();
    let content = render(summary, format)?;
    let write_err = |e: std::io::Error| ClientError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension(format!("{}.tmp", format.extension()));
    tokio::fs::write(&tmp_path, content.as_bytes())
        .await
        .map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Wrote {} export to {}", format.extension(), path.display());
    Ok(())
}

/// Plain-text export.
///
/// Section order: title, main summary, key takeaways (`N. `), detailed notes
/// (`• `), flashcards (`Q:`/`A:` followed by a blank line).
pub fn render_plain_text(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}\n\n", summary.display_title());
    let _ = write!(out, "📝 MAIN SUMMARY\n{}\n\n", summary.summary);

    out.push_str("💡 KEY TAKEAWAYS\n");
    for (i, takeaway) in summary.key_takeaways.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, takeaway);
    }

    out.push_str("\n📋 DETAILED NOTES\n");
    for note in &summary.bulleted_notes {
        let _ = writeln!(out, "• {}", note);
    }

    out.push_str("\n🃏 FLASHCARDS\n");
    for card in &summary.flashcards {
        let _ = write!(out, "Q: {}\nA: {}\n\n", card.question, card.answer);
    }
    out
}

/// Printable HTML export.
///
/// A standalone page with inline styles; its on-load script opens the print
/// dialog so the browser can save it as PDF. All summary text is escaped.
pub fn render_printable(summary: &Summary) -> String {
    let title = escape_html(summary.display_title());
    let mut out = String::with_capacity(PRINT_CSS.len() + 2048);

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", title);
    let _ = writeln!(out, "<style>{}</style>", PRINT_CSS);
    out.push_str("</head>\n<body>\n");
    let _ = writeln!(out, "<h1>{}</h1>", title);

    out.push_str("<div class=\"summary\">\n<h2>📝 Main Summary</h2>\n");
    let _ = writeln!(out, "<p>{}</p>", escape_html(&summary.summary));
    out.push_str("</div>\n");

    out.push_str("<div class=\"takeaways\">\n<h2>💡 Key Takeaways</h2>\n");
    for (i, takeaway) in summary.key_takeaways.iter().enumerate() {
        let _ = writeln!(
            out,
            "<div class=\"takeaway-item\"><strong>{}.</strong> {}</div>",
            i + 1,
            escape_html(takeaway)
        );
    }
    out.push_str("</div>\n");

    out.push_str("<div class=\"notes\">\n<h2>📋 Detailed Notes</h2>\n");
    for note in &summary.bulleted_notes {
        let _ = writeln!(out, "<div class=\"note-item\">{}</div>", escape_html(note));
    }
    out.push_str("</div>\n");

    if !summary.flashcards.is_empty() {
        out.push_str("<div class=\"flashcards\">\n<h2>🃏 Flashcards</h2>\n");
        for (i, card) in summary.flashcards.iter().enumerate() {
            let n = i + 1;
            out.push_str("<div class=\"flashcard\">\n");
            let _ = writeln!(
                out,
                "<div class=\"flashcard-question\">Q{}: {}</div>",
                n,
                escape_html(&card.question)
            );
            let _ = writeln!(
                out,
                "<div class=\"flashcard-answer\">A{}: {}</div>",
                n,
                escape_html(&card.answer)
            );
            out.push_str("</div>\n");
        }
        out.push_str("</div>\n");
    }

    out.push_str("<div class=\"footer\">\nGenerated by Video/Audio Lecture Summarizer\n</div>\n");
    out.push_str(PRINT_SCRIPT);
    out.push_str("</body>\n</html>\n");
    out
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const PRINT_SCRIPT: &str = "<script>\nwindow.onload = function() {\n  window.print();\n  setTimeout(function() { window.close(); }, 1000);\n};\n</script>\n";

const PRINT_CSS: &str = r#"
body { font-family: 'Inter', 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; max-width: 800px; margin: 0 auto; padding: 40px 20px; line-height: 1.6; color: #333; background: white; }
h1 { color: #667eea; text-align: center; margin-bottom: 40px; font-size: 2.5rem; font-weight: 800; text-shadow: 0 2px 4px rgba(0,0,0,0.1); }
h2 { color: #4a5568; margin-top: 40px; margin-bottom: 20px; font-size: 1.5rem; font-weight: 600; border-bottom: 2px solid #e2e8f0; padding-bottom: 10px; }
.summary { background: #f8f9fa; padding: 25px; border-radius: 12px; margin-bottom: 30px; border-left: 5px solid #667eea; }
.takeaways { background: #e8f5e8; padding: 25px; border-radius: 12px; margin-bottom: 30px; border-left: 5px solid #48bb78; }
.takeaway-item { margin-bottom: 15px; padding: 10px; background: white; border-radius: 8px; border-left: 4px solid #48bb78; }
.notes { background: #fff3cd; padding: 25px; border-radius: 12px; margin-bottom: 30px; border-left: 5px solid #ed8936; }
.note-item { margin-bottom: 10px; padding: 8px; background: white; border-radius: 6px; border-left: 3px solid #ed8936; }
.flashcards { background: #d1ecf1; padding: 25px; border-radius: 12px; margin-bottom: 30px; border-left: 5px solid #319795; }
.flashcard { margin-bottom: 20px; padding: 20px; background: white; border-radius: 12px; border: 1px solid #bee3f8; page-break-inside: avoid; }
.flashcard-question { font-weight: bold; color: #2c5282; margin-bottom: 10px; }
.flashcard-answer { color: #2c5282; font-style: italic; }
.footer { margin-top: 50px; text-align: center; font-size: 0.9rem; color: #718096; border-top: 1px solid #e2e8f0; padding-top: 20px; }
@media print { body { padding: 20px; } .no-print { display: none; } }
"#;
