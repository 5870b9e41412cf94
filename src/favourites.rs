use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{CarparkError, Result};
use crate::models::CarparkReference;

/// On-disk layout of the favourites file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FavouritesFile {
    #[serde(rename = "Favourite Carparks", default)]
    carparks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

/// Durable set of favourite carpark numbers.
///
/// Opened once per session; every mutation is written through so a crash
/// after `add` or `remove` returns does not lose it.
#[derive(Debug)]
pub struct FavouritesStore {
    path: PathBuf,
    data: FavouritesFile,
}

impl FavouritesStore {
    /// Open the store at `path`, starting empty when the file does not exist yet
    pub fn open(path: &Path) -> Result<Self> {
        let data = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FavouritesFile::default(),
            Err(e) => return Err(CarparkError::from_io(path, e)),
        };
        info!(path = %path.display(), count = data.carparks.len(), "opened favourites");
        Ok(Self {
            path: path.to_path_buf(),
            data,
        })
    }

    /// Favourite carpark numbers, in the order they were added
    pub fn list(&self) -> &[String] {
        &self.data.carparks
    }

    pub fn is_empty(&self) -> bool {
        self.data.carparks.is_empty()
    }

    pub fn contains(&self, carpark_number: &str) -> bool {
        self.data.carparks.iter().any(|c| c == carpark_number)
    }

    /// Add a carpark that exists in `known` and is not already a favourite
    pub fn add(&mut self, carpark_number: &str, known: &[CarparkReference]) -> Result<()> {
        if !known.iter().any(|c| c.carpark_number == carpark_number) {
            return Err(CarparkError::UnknownCarpark(carpark_number.to_owned()));
        }
        if self.contains(carpark_number) {
            return Err(CarparkError::AlreadyFavourite(carpark_number.to_owned()));
        }
        self.data.carparks.push(carpark_number.to_owned());
        self.persist()?;
        debug!(carpark = carpark_number, "favourite added");
        Ok(())
    }

    pub fn remove(&mut self, carpark_number: &str) -> Result<()> {
        let position = self
            .data
            .carparks
            .iter()
            .position(|c| c == carpark_number)
            .ok_or_else(|| CarparkError::NotFavourite(carpark_number.to_owned()))?;
        self.data.carparks.remove(position);
        self.persist()?;
        debug!(carpark = carpark_number, "favourite removed");
        Ok(())
    }

    /// Flush and release the store at session end
    pub fn close(mut self) -> Result<()> {
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        self.data.updated_at = Some(Utc::now());
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| CarparkError::from_io(dir, e))?;
        let mut staged = NamedTempFile::new_in(dir).map_err(|e| CarparkError::from_io(dir, e))?;
        serde_json::to_writer_pretty(&mut staged, &self.data)?;
        staged
            .persist(&self.path)
            .map_err(|e| CarparkError::from_io(&self.path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn known() -> Vec<CarparkReference> {
        ["A1", "B2", "C3"]
            .into_iter()
            .map(|number| CarparkReference {
                carpark_number: number.into(),
                carpark_type: None,
                address: None,
                parking_system_type: None,
                coordinates: None,
            })
            .collect()
    }

    #[test]
    fn add_rejects_unknown_and_duplicate() {
        let dir = TempDir::new().unwrap();
        let mut store = FavouritesStore::open(&dir.path().join("favourites.json")).unwrap();
        let known = known();

        let err = store.add("ZZ9", &known).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        store.add("A1", &known).unwrap();
        let err = store.add("A1", &known).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(store.list(), ["A1"]);
    }

    #[test]
    fn remove_rejects_non_member() {
        let dir = TempDir::new().unwrap();
        let mut store = FavouritesStore::open(&dir.path().join("favourites.json")).unwrap();
        let err = store.remove("A1").unwrap_err();
        assert!(matches!(err, CarparkError::NotFavourite(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn favourites_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user").join("favourites.json");
        let known = known();

        let mut store = FavouritesStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.add("B2", &known).unwrap();
        store.add("C3", &known).unwrap();
        store.add("A1", &known).unwrap();
        store.remove("C3").unwrap();
        store.close().unwrap();

        let reopened = FavouritesStore::open(&path).unwrap();
        assert_eq!(reopened.list(), ["B2", "A1"]);
        assert!(reopened.contains("A1"));
        assert!(!reopened.contains("C3"));
    }

    #[test]
    fn file_uses_favourite_carparks_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("favourites.json");
        let mut store = FavouritesStore::open(&path).unwrap();
        store.add("A1", &known()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["Favourite Carparks"], serde_json::json!(["A1"]));
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("favourites.json");
        fs::write(&path, "not json").unwrap();
        let err = FavouritesStore::open(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
