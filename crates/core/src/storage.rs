//! Storage folder categories and owner-namespaced path building.
//!
//! Every stored binary lives under `{owner_id}/{folder}/{file_name}` so one
//! user's uploads, results, and storefront imagery never collide with
//! another's.

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Folder categories
// ---------------------------------------------------------------------------

/// Storage folder category for an uploaded or generated binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderKind {
    Uploads,
    Results,
    Avatars,
    Products,
    Models,
    Banners,
}

impl FolderKind {
    /// Parse a folder name.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "uploads" => Ok(Self::Uploads),
            "results" => Ok(Self::Results),
            "avatars" => Ok(Self::Avatars),
            "products" => Ok(Self::Products),
            "models" => Ok(Self::Models),
            "banners" => Ok(Self::Banners),
            _ => Err(CoreError::Validation(format!(
                "Invalid storage folder '{s}'. Must be one of: uploads, results, \
                 avatars, products, models, banners"
            ))),
        }
    }

    /// Folder name as stored in paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploads => "uploads",
            Self::Results => "results",
            Self::Avatars => "avatars",
            Self::Products => "products",
            Self::Models => "models",
            Self::Banners => "banners",
        }
    }
}

// ---------------------------------------------------------------------------
// Path building
// ---------------------------------------------------------------------------

/// Build the owner-namespaced relative path for a stored binary.
///
/// `file_name` must be a bare name: separators and parent references are
/// rejected so a crafted name cannot escape the owner's namespace.
pub fn object_path(owner_id: DbId, folder: FolderKind, file_name: &str) -> Result<String, CoreError> {
    if file_name.is_empty()
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains("..")
    {
        return Err(CoreError::Validation(format!(
            "Invalid file name '{file_name}'"
        )));
    }
    Ok(format!("{owner_id}/{}/{file_name}", folder.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_roundtrip() {
        for folder in [
            FolderKind::Uploads,
            FolderKind::Results,
            FolderKind::Avatars,
            FolderKind::Products,
            FolderKind::Models,
            FolderKind::Banners,
        ] {
            assert_eq!(FolderKind::from_str_db(folder.as_str()).unwrap(), folder);
        }
    }

    #[test]
    fn unknown_folder_rejected() {
        assert!(FolderKind::from_str_db("temp").is_err());
    }

    #[test]
    fn object_path_is_owner_namespaced() {
        let path = object_path(42, FolderKind::Results, "look-7.jpg").unwrap();
        assert_eq!(path, "42/results/look-7.jpg");
    }

    #[test]
    fn traversal_names_rejected() {
        assert!(object_path(1, FolderKind::Uploads, "../etc/passwd").is_err());
        assert!(object_path(1, FolderKind::Uploads, "a/b.jpg").is_err());
        assert!(object_path(1, FolderKind::Uploads, "").is_err());
    }
}
