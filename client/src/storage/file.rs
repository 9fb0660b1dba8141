use std::path::Path;

use serde::{Deserialize, Serialize};

pub trait FileIoWithBackup {
    /// Writes the given content to a file, keeping a `.bak` copy of the
    /// previous content when one exists.
    fn write_with_backup<P: AsRef<Path>>(path: P, content: &str) -> Result<(), std::io::Error> {
        let path = path.as_ref();

        if path.exists() {
            let backup_path = path.with_extension("bak");
            std::fs::copy(path, backup_path)?;
        } else if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

/// JSON-file persistence for configuration-like state.
pub trait Config: FileIoWithBackup {
    type ConfigType: Serialize + for<'de> Deserialize<'de>;

    fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Self::ConfigType> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self::ConfigType = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn save_config<P: AsRef<Path>>(path: P, config: &Self::ConfigType) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(config)?;
        Self::write_with_backup(path, &content)?;
        Ok(())
    }

    fn load_config_or_default<P: AsRef<Path>, F: FnOnce() -> Self::ConfigType>(
        path: P,
        default: F,
    ) -> anyhow::Result<Self::ConfigType> {
        match std::fs::metadata(path.as_ref()) {
            Ok(metadata) if metadata.is_file() => Self::load_config(path),
            _ => {
                let config = default();
                Self::save_config(path, &config)?;
                Ok(config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        value: u32,
    }

    struct SampleIo;
    impl FileIoWithBackup for SampleIo {}
    impl Config for SampleIo {
        type ConfigType = Sample;
    }

    #[test]
    fn load_or_default_writes_the_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");

        let loaded = SampleIo::load_config_or_default(&path, || Sample { value: 7 }).unwrap();
        assert_eq!(loaded, Sample { value: 7 });
        assert!(path.is_file());

        let reloaded = SampleIo::load_config_or_default(&path, || Sample { value: 0 }).unwrap();
        assert_eq!(reloaded, Sample { value: 7 });
    }

    #[test]
    fn rewrites_keep_a_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");

        SampleIo::save_config(&path, &Sample { value: 1 }).unwrap();
        SampleIo::save_config(&path, &Sample { value: 2 }).unwrap();

        let backup: Sample =
            serde_json::from_str(&std::fs::read_to_string(path.with_extension("bak")).unwrap())
                .unwrap();
        assert_eq!(backup, Sample { value: 1 });
    }
}
