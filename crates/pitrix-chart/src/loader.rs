//! Chart archive loader

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path};
use tracing::debug;

use pitrix_import_types::{BundleDecoder, BundleDescriptor, ImportResult};

use crate::error::ChartError;
use crate::metadata::ChartFile;

const CHART_FILE_NAME: &str = "Chart.yaml";

/// Decodes `*.tgz` chart archives
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartLoader;

impl ChartLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load chart metadata from an archive on disk
    pub fn load_file(&self, path: &Path) -> Result<BundleDescriptor, ChartError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        let chart = Self::read_chart_file(file)?;
        debug!(
            "Loaded chart {} {} from {} ({} bytes)",
            chart.name,
            chart.version,
            path.display(),
            size
        );
        Ok(chart.into_descriptor(size))
    }

    /// Find and parse `<chart>/Chart.yaml` inside a gzip tar stream
    pub fn read_chart_file<R: Read>(reader: R) -> Result<ChartFile, ChartError> {
        let mut archive = tar::Archive::new(GzDecoder::new(reader));

        for entry in archive.entries()? {
            let mut entry = entry?;
            if !is_top_level_chart_file(&entry.path()?) {
                continue;
            }

            let mut contents = String::new();
            entry.read_to_string(&mut contents)?;
            return ChartFile::from_yaml(&contents);
        }

        Err(ChartError::MissingChartFile)
    }
}

impl BundleDecoder for ChartLoader {
    fn decode(&self, path: &Path) -> ImportResult<BundleDescriptor> {
        self.load_file(path).map_err(|e| e.into_import_error(path))
    }
}

/// `redis/Chart.yaml` matches, `redis/charts/common/Chart.yaml` does not
fn is_top_level_chart_file(path: &Path) -> bool {
    let components: Vec<_> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    match components.as_slice() {
        [Component::Normal(_), Component::Normal(file)] => *file == CHART_FILE_NAME,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use pitrix_import_types::ImportError;
    use std::io::Write;

    fn write_archive(dir: &Path, file_name: &str, entries: &[(&str, &str)]) -> std::path::PathBuf {
        let path = dir.join(file_name);
        let file = File::create(&path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, contents.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    #[test]
    fn test_load_top_level_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_archive(
            dir.path(),
            "redis-1.0.0.tgz",
            &[
                ("redis/charts/common/Chart.yaml", "name: common\nversion: 9.9.9\n"),
                ("redis/values.yaml", "replicas: 1\n"),
                ("redis/Chart.yaml", "name: redis\nversion: 1.0.0\n"),
            ],
        );

        let bundle = ChartLoader::new().decode(&path).unwrap();
        assert_eq!(bundle.name, "redis");
        assert_eq!(bundle.version, "1.0.0");
        assert!(bundle.size > 0);
    }

    #[test]
    fn test_missing_chart_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_archive(dir.path(), "empty.tgz", &[("redis/values.yaml", "a: b\n")]);

        let err = ChartLoader::new().decode(&path).unwrap_err();
        match err {
            ImportError::Decode { path: p, reason } => {
                assert!(p.ends_with("empty.tgz"));
                assert!(reason.contains("Chart.yaml not found"));
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_not_an_archive_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.tgz");
        File::create(&path)
            .unwrap()
            .write_all(b"definitely not gzip")
            .unwrap();

        let err = ChartLoader::new().decode(&path).unwrap_err();
        assert!(matches!(err, ImportError::Decode { .. }));
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ChartLoader::new()
            .decode(&dir.path().join("absent.tgz"))
            .unwrap_err();
        assert!(matches!(err, ImportError::Decode { .. }));
    }

    #[test]
    fn test_top_level_chart_file_detection() {
        assert!(is_top_level_chart_file(Path::new("redis/Chart.yaml")));
        assert!(is_top_level_chart_file(Path::new("./redis/Chart.yaml")));
        assert!(!is_top_level_chart_file(Path::new("Chart.yaml")));
        assert!(!is_top_level_chart_file(Path::new("redis/charts/x/Chart.yaml")));
        assert!(!is_top_level_chart_file(Path::new("redis/values.yaml")));
    }
}
