// std imports
use std::path::{Path, PathBuf};

/// Arguments of one MSGF invocation
///
#[derive(Debug, Clone)]
pub struct MsgfCommand {
    /// Java heap size in MB
    pub java_memory_mb: u32,
    pub jar_path: PathBuf,
    pub input_path: PathBuf,
    /// Directory containing the spectrum files
    pub spectrum_dir: PathBuf,
    pub output_path: PathBuf,
    /// Fragmentation mode, 0 = as written/CID, 1 = ETD
    pub fragmentation_mode: u8,
    pub enzyme: u32,
}

impl MsgfCommand {
    /// Java arguments running MSGF, e.g.
    /// `-Xmx2000M -cp MSGFDB.jar ui.MSGF -i in.txt -d . -o out.txt -m 0 -e 1 -fixMod 0 -x 0`
    ///
    pub fn to_arguments(&self) -> Vec<String> {
        vec![
            format!("-Xmx{}M", self.java_memory_mb),
            "-cp".to_string(),
            path_to_string(&self.jar_path),
            "ui.MSGF".to_string(),
            "-i".to_string(),
            path_to_string(&self.input_path),
            "-d".to_string(),
            path_to_string(&self.spectrum_dir),
            "-o".to_string(),
            path_to_string(&self.output_path),
            "-m".to_string(),
            self.fragmentation_mode.to_string(),
            "-e".to_string(),
            self.enzyme.to_string(),
            // modifications are already part of the annotation
            "-fixMod".to_string(),
            "0".to_string(),
            "-x".to_string(),
            "0".to_string(),
        ]
    }
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
