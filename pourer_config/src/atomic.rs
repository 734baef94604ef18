use std::{fs, io::Write, path::Path};

/// Write `bytes` to a sibling temp file, fsync, then rename over `path`.
///
/// A power cut mid-save leaves either the old or the new calibration on disk,
/// never a truncated one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("new");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}
