use std::{
    collections::BTreeSet,
    fs::DirEntry,
    path::{Path, PathBuf},
};

use log::debug;

use crate::platforms::{extensions_for, platform_for_extension, resolve_platform};

/// A ROM file paired with the catalog platform it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DiscoveredRom {
    pub platform: &'static str,
    pub path: PathBuf,
}

impl DiscoveredRom {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_rom_for_platform(path: &Path, platform: &str) -> bool {
    file_extension(path)
        .map(|ext| extensions_for(platform).contains(&ext.as_str()))
        .unwrap_or(false)
}

fn read_entries(directory: &Path) -> Vec<DirEntry> {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("Failed to read directory {}: {}", directory.display(), err);
            return Vec::new();
        }
    };

    let mut readable = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) => readable.push(entry),
            Err(err) => {
                debug!(
                    "Failed to read a directory entry in {}: {}",
                    directory.display(),
                    err
                );
            }
        }
    }
    readable
}

fn collect_platform_files(folder_path: &Path, platform: &'static str) -> Vec<PathBuf> {
    let mut pending_directories = vec![folder_path.to_path_buf()];
    let mut roms = Vec::new();

    while let Some(directory) = pending_directories.pop() {
        for entry in read_entries(&directory) {
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    debug!("Failed to inspect {}: {}", path.display(), err);
                    continue;
                }
            };

            if file_type.is_dir() {
                pending_directories.push(path);
                continue;
            }

            if file_type.is_file() && is_rom_for_platform(&path, platform) {
                roms.push(path);
            }
        }
    }
    roms
}

/// Finds ROMs under `root`.
///
/// Subdirectories named after a platform (or one of its aliases) contribute
/// files with that platform's extensions, recursively. Files directly in
/// `root` are kept only when their extension names a single platform.
pub fn discover_roms(root: &Path) -> Vec<DiscoveredRom> {
    let mut roms = BTreeSet::new();
    for entry in read_entries(root) {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                debug!("Failed to inspect {}: {}", path.display(), err);
                continue;
            }
        };

        if file_type.is_dir() {
            let folder_name = entry.file_name().to_string_lossy().to_string();
            let Some(platform) = resolve_platform(&folder_name) else {
                debug!("Skipping {}: not a known platform folder", path.display());
                continue;
            };
            for rom in collect_platform_files(&path, platform) {
                roms.insert(DiscoveredRom {
                    platform,
                    path: rom,
                });
            }
            continue;
        }

        if !file_type.is_file() {
            continue;
        }
        if let Some(platform) = file_extension(&path).and_then(|ext| platform_for_extension(&ext)) {
            roms.insert(DiscoveredRom { platform, path });
        }
    }

    let mut sorted: Vec<DiscoveredRom> = roms.into_iter().collect();
    sorted.sort_by(|left, right| left.path.cmp(&right.path));
    sorted
}

#[cfg(test)]
mod tests {
    use super::{discover_roms, is_rom_for_platform};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const SNES: &str = "Nintendo - Super Nintendo Entertainment System";

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir should be created");
        }
        fs::write(path, b"rom").expect("file should be written");
    }

    #[test]
    fn test_is_rom_for_platform_ignores_case() {
        assert!(is_rom_for_platform(Path::new("a/Game.SFC"), SNES));
        assert!(!is_rom_for_platform(Path::new("a/Game.gba"), SNES));
        assert!(!is_rom_for_platform(Path::new("a/README"), SNES));
    }

    #[test]
    fn test_discover_roms_from_platform_folders_and_root() {
        let temp = TempDir::new().expect("temp dir should be created");
        let root = temp.path();
        touch(&root.join("snes").join("Super Mario World (U) [!].sfc"));
        touch(&root.join("snes").join("hacks").join("Kaizo (Hack).smc"));
        touch(&root.join("snes").join("notes.txt"));
        touch(&root.join("Genesis").join("Sonic The Hedgehog (W).md"));
        touch(&root.join("music").join("track.sfc"));
        touch(&root.join("Metroid Fusion (U).gba"));
        touch(&root.join("Ambiguous.cue"));

        let roms = discover_roms(root);
        let names: Vec<(String, &str)> = roms
            .iter()
            .map(|rom| (rom.file_name(), rom.platform))
            .collect();
        assert_eq!(
            names,
            vec![
                (
                    "Sonic The Hedgehog (W).md".to_string(),
                    "Sega - Mega Drive - Genesis"
                ),
                (
                    "Metroid Fusion (U).gba".to_string(),
                    "Nintendo - Game Boy Advance"
                ),
                ("Super Mario World (U) [!].sfc".to_string(), SNES),
                ("Kaizo (Hack).smc".to_string(), SNES),
            ]
        );
    }

    #[test]
    fn test_discover_roms_missing_root_is_empty() {
        let temp = TempDir::new().expect("temp dir should be created");
        assert!(discover_roms(&temp.path().join("missing")).is_empty());
    }
}
