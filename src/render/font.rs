use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::{ShortsError, ShortsResult};

/// Raw font bytes plus the face index inside them.
#[derive(Clone)]
pub struct FontFace {
    pub bytes: Arc<Vec<u8>>,
    pub index: u32,
    /// Human-readable origin for diagnostics (a path or `system:<family>`).
    pub origin: String,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("origin", &self.origin)
            .field("index", &self.index)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FontFace {
    /// Read a font file from disk.
    pub fn from_path(path: &Path) -> ShortsResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ShortsError::resource(format!("failed to read font '{}': {e}", path.display()))
        })?;
        if bytes.is_empty() {
            return Err(ShortsError::resource(format!(
                "font '{}' is empty",
                path.display()
            )));
        }
        Ok(Self {
            bytes: Arc::new(bytes),
            index: 0,
            origin: path.display().to_string(),
        })
    }
}

/// Bold sans fonts commonly present on each platform, in preference order.
pub fn platform_font_candidates() -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/System/Library/Fonts/Supplemental/Impact.ttf",
            "/System/Library/Fonts/Supplemental/Verdana Bold.ttf",
            "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
            "/System/Library/Fonts/Helvetica.ttc",
            "/Library/Fonts/Arial Bold.ttf",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            "C:\\Windows\\Fonts\\Arial.ttf",
            "C:\\Windows\\Fonts\\ArialBD.ttf",
            "C:\\Windows\\Fonts\\Impact.ttf",
            "C:\\Windows\\Fonts\\Verdana.ttf",
            "C:\\Windows\\Fonts\\VerdanaBD.ttf",
        ]
    } else {
        &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/truetype/freefont/FreeSansBold.ttf",
            "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
            "/usr/share/fonts/TTF/Arial.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
        ]
    };
    paths.iter().map(PathBuf::from).collect()
}

/// Query the system font database for its default bold sans-serif face.
pub fn system_default_font() -> Option<FontFace> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    let query = usvg::fontdb::Query {
        families: &[usvg::fontdb::Family::SansSerif],
        weight: usvg::fontdb::Weight::BOLD,
        ..usvg::fontdb::Query::default()
    };
    let id = db.query(&query)?;
    let family = db
        .face(id)
        .and_then(|face| face.families.first().map(|(name, _)| name.clone()))
        .unwrap_or_else(|| "sans-serif".to_string());
    db.with_face_data(id, |data, index| FontFace {
        bytes: Arc::new(data.to_vec()),
        index,
        origin: format!("system:{family}"),
    })
}

/// Resolve the font used for narration text.
///
/// Order: the configured path, the first readable platform candidate, then the system
/// database's default sans-serif. Each miss is logged; `None` means text cannot be drawn and
/// frames carry the background only.
pub fn resolve_font(configured: Option<&Path>) -> Option<FontFace> {
    if let Some(path) = configured {
        match FontFace::from_path(path) {
            Ok(face) => return Some(face),
            Err(e) => tracing::warn!(error = %e, "configured font unavailable, falling back"),
        }
    }

    for candidate in platform_font_candidates() {
        if !candidate.is_file() {
            continue;
        }
        match FontFace::from_path(&candidate) {
            Ok(face) => return Some(face),
            Err(e) => tracing::debug!(error = %e, "skipping platform font"),
        }
    }

    let system = system_default_font();
    if system.is_none() {
        tracing::warn!("no usable font found; frames will be rendered without text");
    }
    system
}
