//! Loading price files through the content cache.

use hobart_data::{
    ContentKey, DataError, IndexSeries, IngestedFile, PanelCache, PricePanel, SeriesKind,
    read_price_csv,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Prices merged from a set of files.
#[derive(Debug, Clone, Default)]
pub struct LoadedPrices {
    /// Merged asset prices.
    pub panel: PricePanel,
    /// Benchmark index, if an index file was given.
    pub index: Option<IndexSeries>,
    /// Asset files merged into the panel.
    pub files: Vec<PathBuf>,
    /// Files skipped because their content matched an earlier file.
    pub duplicates: Vec<PathBuf>,
}

fn series_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

fn parse_cached<'c>(
    cache: &'c mut PanelCache<IngestedFile>,
    bytes: &[u8],
    kind: SeriesKind,
    name: &str,
) -> Result<&'c IngestedFile, DataError> {
    let file = cache.get_or_try_insert_with(bytes, |b| read_price_csv(b, kind, name))?;
    if file.kind() != kind {
        return Err(DataError::KindMismatch {
            expected: kind,
            found: file.kind(),
        });
    }
    Ok(file)
}

/// Read asset price files and an optional index file.
///
/// Files are parsed through `cache`, so content seen in an earlier call is not
/// parsed again. Within one call, a file whose content matches an earlier file
/// is skipped and reported in [`LoadedPrices::duplicates`].
///
/// # Errors
/// Fails on unreadable or malformed files, and when two files disagree on a
/// `(date, code)` pair.
pub fn load_prices<P: AsRef<Path>>(
    price_files: &[P],
    index_file: Option<&Path>,
    cache: &mut PanelCache<IngestedFile>,
) -> Result<LoadedPrices, DataError> {
    let mut loaded = LoadedPrices::default();
    let mut seen: HashSet<ContentKey> = HashSet::new();

    for path in price_files {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        if !seen.insert(ContentKey::of(&bytes)) {
            tracing::info!(path = %path.display(), "skipping duplicate price file");
            loaded.duplicates.push(path.to_path_buf());
            continue;
        }

        let name = series_name(path);
        if let IngestedFile::Assets(panel) = parse_cached(cache, &bytes, SeriesKind::Asset, &name)? {
            loaded.panel.merge(panel.clone())?;
        }
        loaded.files.push(path.to_path_buf());
    }

    if let Some(path) = index_file {
        let bytes = fs::read(path)?;
        let name = series_name(path);
        if let IngestedFile::Index(index) = parse_cached(cache, &bytes, SeriesKind::Index, &name)? {
            loaded.index = Some(index.clone());
        }
    }

    tracing::info!(
        files = loaded.files.len(),
        duplicates = loaded.duplicates.len(),
        assets = loaded.panel.n_assets(),
        observations = loaded.panel.n_observations(),
        gaps = loaded.panel.gaps(),
        index = loaded.index.as_ref().map(IndexSeries::name),
        "loaded prices"
    );

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hobart-loader-{}-{}", test, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_duplicates_skipped_and_cached() {
        let dir = fixture_dir("duplicates");
        let day1 = write(&dir, "day1.csv", "date,code,close\n2024-03-01,AAA,10\n2024-03-01,BBB,20\n");
        let copy = write(&dir, "day1_copy.csv", "date,code,close\n2024-03-01,AAA,10\n2024-03-01,BBB,20\n");
        let day2 = write(&dir, "day2.csv", "date,code,close\n2024-03-04,AAA,11\n2024-03-04,BBB,19\n");
        let index = write(&dir, "xjo.csv", "date,close\n2024-03-01,7000\n2024-03-04,7070\n");

        let mut cache = PanelCache::new();
        let loaded = load_prices(&[&day1, &copy, &day2], Some(index.as_path()), &mut cache).unwrap();
        assert_eq!(loaded.files.len(), 2);
        assert_eq!(loaded.duplicates, vec![copy.clone()]);
        assert_eq!(loaded.panel.n_observations(), 4);
        assert_eq!(loaded.index.as_ref().map(IndexSeries::name), Some("XJO"));

        let again = load_prices(&[&day1, &day2], None, &mut cache).unwrap();
        assert!(again.duplicates.is_empty());
        assert_eq!(cache.stats().hits, 2);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_kind_mismatch() {
        let dir = fixture_dir("kind");
        let path = write(&dir, "both.csv", "date,code,close\n2024-03-01,AAA,10\n");
        let mut cache = PanelCache::new();
        load_prices(&[&path], None, &mut cache).unwrap();
        let err = load_prices::<&Path>(&[], Some(path.as_path()), &mut cache).unwrap_err();
        assert!(matches!(err, DataError::KindMismatch { .. }));

        fs::remove_dir_all(dir).unwrap();
    }
}
