//! Persona files: load and save persona sets as JSON.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::types::PersonaRecord;
use crate::error::{Error, Result};
use crate::survey::export::write_json_atomic;

/// Accepted on-disk layouts: a bare array, or any document with a
/// `personas` array (a persona file or an exported survey report).
#[derive(Deserialize)]
#[serde(untagged)]
enum PersonaFile {
    List(Vec<PersonaRecord>),
    Wrapped { personas: Vec<PersonaRecord> },
}

/// Load personas from a JSON file.
pub fn load_personas(path: &Path) -> Result<Vec<PersonaRecord>> {
    let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let file: PersonaFile = serde_json::from_str(&content).map_err(|e| {
        Error::InvalidInput(format!("{}: not a persona file: {}", path.display(), e))
    })?;
    let personas = match file {
        PersonaFile::List(p) | PersonaFile::Wrapped { personas: p } => p,
    };

    validate_personas(&personas)?;
    info!(path = %path.display(), count = personas.len(), "Loaded personas");
    Ok(personas)
}

/// Write personas as a pretty JSON array.
pub fn save_personas(personas: &[PersonaRecord], path: &Path) -> Result<()> {
    write_json_atomic(&personas, path)?;
    debug!(path = %path.display(), count = personas.len(), "Saved personas");
    Ok(())
}

fn validate_personas(personas: &[PersonaRecord]) -> Result<()> {
    if personas.is_empty() {
        return Err(Error::EmptyPersonas);
    }

    let mut seen = HashSet::new();
    for p in personas {
        if p.id.trim().is_empty() {
            return Err(Error::InvalidInput("persona with empty id".into()));
        }
        if !seen.insert(p.id.as_str()) {
            return Err(Error::DuplicatePersonaId { id: p.id.clone() });
        }
        if p.interests.is_empty() {
            return Err(Error::InvalidInput(format!(
                "persona '{}' has no interests",
                p.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::PersonaFactory;
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("personas.json");
        let personas = PersonaFactory::seeded(1).generate_random(4).unwrap();

        save_personas(&personas, &path).unwrap();
        let loaded = load_personas(&path).unwrap();
        assert_eq!(loaded, personas);
    }

    #[test]
    fn test_load_wrapped_document() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("report.json");
        let personas = PersonaFactory::seeded(2).generate_random(2).unwrap();
        let doc = serde_json::json!({ "run_id": "x", "personas": personas });
        fs::write(&path, doc.to_string()).unwrap();

        assert_eq!(load_personas(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("dupes.json");
        let mut personas = PersonaFactory::seeded(3).generate_random(2).unwrap();
        personas[1].id = personas[0].id.clone();
        fs::write(&path, serde_json::to_string(&personas).unwrap()).unwrap();

        assert!(matches!(
            load_personas(&path),
            Err(Error::DuplicatePersonaId { .. })
        ));
    }

    #[test]
    fn test_empty_file_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.json");
        fs::write(&path, "[]").unwrap();
        assert!(matches!(load_personas(&path), Err(Error::EmptyPersonas)));
    }
}
