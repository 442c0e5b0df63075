//! Process-wide font table
//!
//! Fonts activated by any editor instance are registered here under their
//! declared family name and stay for the life of the process: the table is
//! append-only, so remounting an editor never pays for a family twice.
//! Fallback families are looked up among the system fonts through fontdb.

use crate::{FontError, Result};
use fontdb::{Database, Family, Query, Stretch, Style, Weight, ID};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};

/// Fallback chain used when the selected family is unavailable
pub const DEFAULT_FALLBACK_FAMILIES: &[&str] = &["Arial", "sans-serif"];

/// A parsed, activatable font face
#[derive(Debug)]
pub struct FontFace {
    family: String,
    data: Arc<Vec<u8>>,
    index: u32,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    line_gap: i16,
}

impl FontFace {
    /// Validate `data` as a TrueType/OpenType face and capture its metrics
    pub fn from_data(family: impl Into<String>, data: Vec<u8>, index: u32) -> Result<Self> {
        let family = family.into();
        let face = ttf_parser::Face::parse(&data, index).map_err(|e| FontError::Parse {
            family: family.clone(),
            message: e.to_string(),
        })?;

        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();
        let line_gap = face.line_gap();

        Ok(Self {
            family,
            data: Arc::new(data),
            index,
            units_per_em,
            ascender,
            descender,
            line_gap,
        })
    }

    /// Family name the face was registered under
    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Scale from font units to pixels at `size_px`
    pub fn scale(&self, size_px: f32) -> f32 {
        size_px / self.units_per_em.max(1) as f32
    }

    /// Ascender, descender (negative) and line gap in font units
    pub fn vertical_metrics(&self) -> (i16, i16, i16) {
        (self.ascender, self.descender, self.line_gap)
    }
}

/// Result of resolving a family name for rendering
#[derive(Debug, Clone)]
pub struct ResolvedFont {
    /// Family asked for
    pub requested: String,
    /// Family actually used, `None` when no face at all is available
    pub family: Option<String>,
    pub face: Option<Arc<FontFace>>,
    /// The requested family was unavailable
    pub is_fallback: bool,
}

/// Generic family tried after the fallback chain is exhausted
const LAST_RESORT_FAMILY: &str = "sans-serif";

/// Installed families tried, in order, when a generic family's default
/// name is not installed
const GENERIC_SUBSTITUTES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Helvetica",
    "Roboto",
    "Segoe UI",
];

/// System font database, scanned once on first fallback lookup
struct SystemFonts {
    db: Database,
    cache: Mutex<FxHashMap<String, Option<Arc<FontFace>>>>,
}

impl SystemFonts {
    fn scan() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        tracing::debug!("font table: scanned {} system faces", db.len());
        Self::from_database(db)
    }

    fn from_database(db: Database) -> Self {
        Self {
            db,
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<FontFace>> {
        let key = name.to_ascii_lowercase();
        if let Some(cached) = self.cache.lock().get(&key) {
            return cached.clone();
        }

        let generic = match key.as_str() {
            "sans-serif" | "system-ui" => Some(Family::SansSerif),
            "serif" => Some(Family::Serif),
            "monospace" => Some(Family::Monospace),
            "cursive" => Some(Family::Cursive),
            "fantasy" => Some(Family::Fantasy),
            _ => None,
        };

        let id = match generic {
            Some(family) => self.query(family).or_else(|| self.substitute(name)),
            None => self.query(Family::Name(name)),
        };
        let face = id.and_then(|id| self.load(id, name));

        self.cache.lock().insert(key, face.clone());
        face
    }

    fn query(&self, family: Family<'_>) -> Option<ID> {
        self.db.query(&Query {
            families: &[family],
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        })
    }

    /// Any installed face standing in for a generic family whose configured
    /// name is missing
    fn substitute(&self, generic: &str) -> Option<ID> {
        let id = GENERIC_SUBSTITUTES
            .iter()
            .find_map(|name| self.query(Family::Name(*name)))
            .or_else(|| self.db.faces().next().map(|face| face.id));
        if id.is_some() {
            tracing::debug!("no default face for '{}', substituting", generic);
        }
        id
    }

    fn load(&self, id: ID, name: &str) -> Option<Arc<FontFace>> {
        self.db
            .with_face_data(id, |data, index| {
                FontFace::from_data(name, data.to_vec(), index)
            })
            .and_then(|parsed| match parsed {
                Ok(face) => Some(Arc::new(face)),
                Err(e) => {
                    tracing::warn!("system font '{}' unusable: {}", name, e);
                    None
                }
            })
    }
}

/// Append-only table of active font faces, keyed by family name
/// (case-insensitive)
pub struct FontTable {
    faces: RwLock<FxHashMap<String, Arc<FontFace>>>,
    /// Families in activation order
    activations: Mutex<Vec<String>>,
    use_system_fonts: bool,
    system: OnceLock<SystemFonts>,
}

impl FontTable {
    /// An empty table that falls back to system fonts
    pub fn new() -> Self {
        Self::with_system_fonts(true)
    }

    /// An empty table; when `use_system_fonts` is false only registered
    /// faces resolve
    pub fn with_system_fonts(use_system_fonts: bool) -> Self {
        Self {
            faces: RwLock::new(FxHashMap::default()),
            activations: Mutex::new(Vec::new()),
            use_system_fonts,
            system: OnceLock::new(),
        }
    }

    /// An empty table falling back to the faces in `db` instead of a scan of
    /// the system fonts
    pub fn with_font_database(db: Database) -> Self {
        Self {
            faces: RwLock::new(FxHashMap::default()),
            activations: Mutex::new(Vec::new()),
            use_system_fonts: true,
            system: OnceLock::from(SystemFonts::from_database(db)),
        }
    }

    /// The table shared by every editor in the process
    pub fn global() -> Arc<FontTable> {
        static GLOBAL_TABLE: OnceLock<Arc<FontTable>> = OnceLock::new();
        Arc::clone(GLOBAL_TABLE.get_or_init(|| Arc::new(FontTable::new())))
    }

    /// Activate `face`. Returns `false` (and changes nothing) when its
    /// family is already active.
    pub fn register(&self, face: FontFace) -> bool {
        let key = face.family.to_ascii_lowercase();
        let mut faces = self.faces.write();
        if faces.contains_key(&key) {
            return false;
        }

        tracing::debug!("font table: activated '{}'", face.family);
        self.activations.lock().push(face.family.clone());
        faces.insert(key, Arc::new(face));
        true
    }

    pub fn contains(&self, family: &str) -> bool {
        self.faces.read().contains_key(&family.to_ascii_lowercase())
    }

    pub fn get(&self, family: &str) -> Option<Arc<FontFace>> {
        self.faces.read().get(&family.to_ascii_lowercase()).cloned()
    }

    /// Families currently active, sorted
    pub fn families(&self) -> Vec<String> {
        let mut families: Vec<String> = self
            .faces
            .read()
            .values()
            .map(|f| f.family.clone())
            .collect();
        families.sort();
        families
    }

    /// How many times `family` was activated (0 or 1)
    pub fn activations(&self, family: &str) -> usize {
        self.activations
            .lock()
            .iter()
            .filter(|f| f.eq_ignore_ascii_case(family))
            .count()
    }

    /// Resolve `family` for rendering.
    ///
    /// A registered face wins. Otherwise each name in `fallbacks` is tried,
    /// first among registered faces and then among system fonts, and finally
    /// any installed sans-serif face. `face` is `None` only when no font is
    /// installed at all.
    pub fn resolve(&self, family: &str, fallbacks: &[String]) -> ResolvedFont {
        if let Some(face) = self.get(family) {
            return ResolvedFont {
                requested: family.to_string(),
                family: Some(face.family.clone()),
                face: Some(face),
                is_fallback: false,
            };
        }

        for name in fallbacks {
            let face = self.get(name).or_else(|| self.system_lookup(name));
            if let Some(face) = face {
                tracing::trace!("font '{}' unavailable, using fallback '{}'", family, name);
                return ResolvedFont {
                    requested: family.to_string(),
                    family: Some(name.clone()),
                    face: Some(face),
                    is_fallback: true,
                };
            }
        }

        if let Some(face) = self.system_lookup(LAST_RESORT_FAMILY) {
            tracing::debug!("'{}' and its fallbacks unavailable, using any system face", family);
            return ResolvedFont {
                requested: family.to_string(),
                family: Some(LAST_RESORT_FAMILY.to_string()),
                face: Some(face),
                is_fallback: true,
            };
        }

        tracing::debug!("no face available for '{}' or its fallbacks", family);
        ResolvedFont {
            requested: family.to_string(),
            family: None,
            face: None,
            is_fallback: true,
        }
    }

    fn system_lookup(&self, name: &str) -> Option<Arc<FontFace>> {
        if !self.use_system_fonts {
            return None;
        }
        self.system.get_or_init(SystemFonts::scan).lookup(name)
    }
}

impl Default for FontTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{minimal_font, named_font};

    fn fallbacks() -> Vec<String> {
        vec!["Backup".to_string(), "sans-serif".to_string()]
    }

    #[test]
    fn test_register_is_append_only() {
        let table = FontTable::with_system_fonts(false);
        assert!(table.register(FontFace::from_data("Anton", minimal_font(), 0).unwrap()));
        assert!(!table.register(FontFace::from_data("anton", minimal_font(), 0).unwrap()));

        assert_eq!(table.families(), vec!["Anton".to_string()]);
        assert_eq!(table.activations("Anton"), 1);
        assert!(table.contains("ANTON"));
    }

    #[test]
    fn test_invalid_font_data_rejected() {
        assert!(FontFace::from_data("Broken", b"not a font".to_vec(), 0).is_err());
    }

    #[test]
    fn test_resolve_registered_face() {
        let table = FontTable::with_system_fonts(false);
        table.register(FontFace::from_data("Anton", minimal_font(), 0).unwrap());

        let resolved = table.resolve("Anton", &fallbacks());
        assert!(!resolved.is_fallback);
        assert_eq!(resolved.family.as_deref(), Some("Anton"));
    }

    #[test]
    fn test_resolve_uses_registered_fallback() {
        let table = FontTable::with_system_fonts(false);
        table.register(FontFace::from_data("Backup", minimal_font(), 0).unwrap());

        let resolved = table.resolve("Anton", &fallbacks());
        assert!(resolved.is_fallback);
        assert_eq!(resolved.requested, "Anton");
        assert_eq!(resolved.family.as_deref(), Some("Backup"));
        assert!(resolved.face.is_some());
    }

    #[test]
    fn test_resolve_nothing_available() {
        let table = FontTable::with_system_fonts(false);
        let resolved = table.resolve("Anton", &fallbacks());
        assert!(resolved.is_fallback);
        assert!(resolved.face.is_none());
    }

    #[test]
    fn test_generic_family_substitutes_an_installed_face() {
        let mut db = Database::new();
        db.load_font_data(named_font("Backup Sans"));
        let table = FontTable::with_font_database(db);

        let chain: Vec<String> = DEFAULT_FALLBACK_FAMILIES.iter().map(|f| f.to_string()).collect();
        let resolved = table.resolve("Missing", &chain);
        assert!(resolved.is_fallback);
        assert_eq!(resolved.family.as_deref(), Some("sans-serif"));
        assert!(resolved.face.is_some());
    }

    #[test]
    fn test_chain_without_generics_still_finds_a_face() {
        let mut db = Database::new();
        db.load_font_data(named_font("Backup Sans"));
        let table = FontTable::with_font_database(db);

        let resolved = table.resolve("Missing", &["Nope".to_string()]);
        assert!(resolved.face.is_some());
    }

    #[test]
    fn test_named_family_from_font_database() {
        let mut db = Database::new();
        db.load_font_data(named_font("Backup Sans"));
        let table = FontTable::with_font_database(db);

        let resolved = table.resolve("Missing", &["Backup Sans".to_string()]);
        assert_eq!(resolved.family.as_deref(), Some("Backup Sans"));
        assert!(resolved.face.is_some());
    }

    #[test]
    fn test_default_chain_against_installed_fonts() {
        let mut db = Database::new();
        db.load_system_fonts();
        if db.is_empty() {
            return;
        }

        let chain: Vec<String> = DEFAULT_FALLBACK_FAMILIES.iter().map(|f| f.to_string()).collect();
        let resolved = FontTable::with_font_database(db).resolve("Missing", &chain);
        assert!(resolved.face.is_some());
    }

    #[test]
    fn test_face_metrics() {
        let face = FontFace::from_data("Anton", minimal_font(), 0).unwrap();
        assert_eq!(face.units_per_em(), 1000);
        assert_eq!(face.vertical_metrics(), (800, -200, 0));
        assert_eq!(face.scale(32.0), 0.032);
    }
}
