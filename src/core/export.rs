/// Document export — lays a scenario out as Map, Characters and Quests pages.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{error, info};

use crate::core::render::{PageRenderer, PdfRenderer, RenderError};
use crate::schema::scenario::Scenario;
use crate::schema::terrain::Grid;

pub const MAP_HEADING: &str = "Generated Map:";
pub const CHARACTERS_HEADING: &str = "Characters:";
pub const QUESTS_HEADING: &str = "Quests:";

/// Space left after each character or quest block, in millimetres.
const BLOCK_GAP: f32 = 5.0;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not move finished document to {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Summary of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub physical_pages: usize,
    pub bytes: usize,
}

/// Turns a scenario into a three-page document.
#[derive(Debug, Clone)]
pub struct DocumentExporter {
    title: String,
}

impl Default for DocumentExporter {
    fn default() -> Self {
        Self::new("Board Game Quest")
    }
}

impl DocumentExporter {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
        }
    }

    /// Lay the scenario out on `renderer`: Map, Characters, Quests, always
    /// in that order and always all three, even when a collection is empty.
    pub fn render(&self, scenario: &Scenario, renderer: &mut dyn PageRenderer) {
        renderer.add_page();
        renderer.add_heading(MAP_HEADING);
        let rows: Vec<String> = scenario.grid.rows.iter().map(|r| Grid::row_line(r)).collect();
        renderer.add_text_block(&rows);

        renderer.add_page();
        renderer.add_heading(CHARACTERS_HEADING);
        for character in &scenario.characters {
            renderer.add_text_block(&[
                format!("Name: {}, Role: {}", character.name, character.role),
                format!("Backstory: {}", character.backstory),
                format!("Location: {}", character.location),
            ]);
            renderer.add_gap(BLOCK_GAP);
        }

        renderer.add_page();
        renderer.add_heading(QUESTS_HEADING);
        for quest in &scenario.quests {
            renderer.add_text_block(&[
                format!("Quest Giver: {}", quest.quest_giver),
                format!("Objective: {}", quest.objective),
                format!("Location: {}", quest.location),
                format!("Details: {}", quest.details),
            ]);
            renderer.add_gap(BLOCK_GAP);
        }
    }

    /// Render to PDF and write it to `path`.
    ///
    /// The bytes land in a temporary file next to `path` that replaces the
    /// target only once fully written; on error nothing is left behind.
    pub fn export_pdf(&self, scenario: &Scenario, path: &Path) -> Result<ExportReport, ExportError> {
        match self.write_pdf(scenario, path) {
            Ok(report) => {
                info!(
                    path = %path.display(),
                    pages = report.physical_pages,
                    bytes = report.bytes,
                    "document written"
                );
                Ok(report)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "export failed");
                Err(e)
            }
        }
    }

    fn write_pdf(&self, scenario: &Scenario, path: &Path) -> Result<ExportReport, ExportError> {
        let mut renderer = PdfRenderer::new(&self.title)?;
        self.render(scenario, &mut renderer);
        let physical_pages = renderer.page_count();
        let bytes = renderer.into_bytes()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;
        // dropping the returned temp file on failure removes it
        staged.persist(path).map_err(|e| ExportError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        Ok(ExportReport {
            physical_pages,
            bytes: bytes.len(),
        })
    }
}
