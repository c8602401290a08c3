use std::fs;
use std::path::PathBuf;

use anyhow::Result;

pub const OUT_DIR: &str = "gazette_all";

/// Serialized line buffer for one year's scrape.
pub fn buffer_path(year: u16) -> PathBuf {
    PathBuf::from(OUT_DIR).join(format!("XPaths_gazette_{}.txt", year))
}

/// JSON-lines table. Link-only parses get their own file so a full parse
/// and a link-only parse of the same year can coexist.
pub fn json_path(year: u16, only_linked: bool) -> PathBuf {
    let stem = if only_linked { "links" } else { "titles" };
    PathBuf::from(OUT_DIR).join(format!("{}_gazette_{}.json", stem, year))
}

pub fn csv_path(year: u16, only_linked: bool) -> PathBuf {
    let stem = if only_linked { "links" } else { "titles" };
    PathBuf::from(OUT_DIR).join(format!("{}_gazette_{}.csv", stem, year))
}

pub fn ensure_out_dir() -> Result<()> {
    fs::create_dir_all(OUT_DIR)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_scoped_names() {
        assert!(buffer_path(2024).ends_with("XPaths_gazette_2024.txt"));
        assert!(json_path(2024, false).ends_with("titles_gazette_2024.json"));
        assert!(json_path(2024, true).ends_with("links_gazette_2024.json"));
        assert!(csv_path(1999, false).ends_with("titles_gazette_1999.csv"));
    }
}
