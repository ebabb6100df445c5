use crate::error::Result;
use std::path::Path;

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

pub fn format_usd(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("${:.4}/hr", v),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("nested").join("dir").join("out.json");

        ensure_parent_dir(&file).unwrap();
        assert!(file.parent().unwrap().is_dir());
    }

    #[test]
    fn test_ensure_parent_dir_bare_filename() {
        assert!(ensure_parent_dir(Path::new("out.json")).is_ok());
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(Some(1.5)), "$1.5000/hr");
        assert_eq!(format_usd(None), "unknown");
    }
}
