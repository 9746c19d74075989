use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use crate::config::defs::FASTQ_SUFFIXES;

pub fn is_gzipped<P: AsRef<Path>>(path: P) -> io::Result<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1F, 0x8B]), // Gzip magic bytes
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}


/// Resolves a user supplied path against the working directory.
/// Absolute paths are returned untouched.
pub fn resolve_path(path: &str, cwd: &Path) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}


/// Builds a new file path from the file name of `path`.
///
/// # Arguments
///
/// * `path` - Source path, only its file name is used.
/// * `dir` - Directory for the new path; defaults to the parent of `path`.
/// * `prefix` - Optional text placed before the file name.
/// * `suffix` - Optional text placed after the file name.
/// * `delimiter` - Joins prefix, file name and suffix.
///
/// # Returns
/// `<dir>/<prefix><delimiter><name><delimiter><suffix>`
pub fn file_path_manipulator(
    path: &Path,
    dir: Option<&Path>,
    prefix: Option<&str>,
    suffix: Option<&str>,
    delimiter: &str,
) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut name = String::new();
    if let Some(prefix) = prefix {
        name.push_str(prefix);
        name.push_str(delimiter);
    }
    name.push_str(&file_name);
    if let Some(suffix) = suffix {
        name.push_str(delimiter);
        name.push_str(suffix);
    }

    match dir {
        Some(dir) => dir.join(name),
        None => match path.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        },
    }
}


/// Removes the last extension from a path, keeping its directory.
pub fn extension_remover(path: &Path) -> PathBuf {
    match path.file_stem() {
        Some(stem) => path.with_file_name(stem),
        None => path.to_path_buf(),
    }
}


/// File name without its last extension.
pub fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}


pub fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}


/// Basename of a FASTQ file with the usual FASTQ suffixes stripped,
/// as trim_galore does when naming its outputs.
pub fn fastq_stem(path: &Path) -> String {
    let mut name = file_name_string(path);
    for suffix in FASTQ_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped.to_string();
        }
    }
    name
}


/// Replaces the `old_suffix` of a file name with `new_suffix` and moves it into `dst_dir`.
/// A file name without `old_suffix` gets `new_suffix` appended.
pub fn edit_file_path(path: &Path, old_suffix: &str, new_suffix: &str, dst_dir: &Path) -> PathBuf {
    let name = file_name_string(path);
    let base = name.strip_suffix(old_suffix).unwrap_or(&name);
    dst_dir.join(format!("{}{}", base, new_suffix))
}


/// Inserts `-<tag>` before the last extension: `peaks.txt` -> `peaks-annotated.txt`.
pub fn insert_name_tag(path: &Path, tag: &str) -> PathBuf {
    let name = file_name_string(path);
    let new_name = match name.rfind('.') {
        Some(pos) if pos > 0 => format!("{}-{}{}", &name[..pos], tag, &name[pos..]),
        _ => format!("{}-{}", name, tag),
    };
    path.with_file_name(new_name)
}


/// Creates a fresh, uniquely named working directory under `parent`.
/// The directory outlives the returned path; removal is left to the caller.
pub fn create_work_dir(parent: &Path, prefix: &str) -> io::Result<PathBuf> {
    let dir = tempfile::Builder::new().prefix(prefix).tempdir_in(parent)?;
    Ok(dir.keep())
}


/// Moves a file, falling back to copy and delete across filesystems.
pub fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    fs::copy(src, dst)?;
    fs::remove_file(src)
}


/// Moves every regular file in `src_dir` whose name ends with one of `suffixes` into `dst_dir`.
///
/// # Returns
/// Destination paths of the moved files, sorted.
pub fn move_files_with_suffix(src_dir: &Path, suffixes: &[&str], dst_dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dst_dir)?;
    let mut matches = Vec::new();
    for entry in fs::read_dir(src_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if suffixes.iter().any(|s| name.ends_with(s)) {
            matches.push((entry.path(), dst_dir.join(&name)));
        }
    }

    let mut moved = Vec::new();
    for (src, dst) in matches {
        move_file(&src, &dst)?;
        moved.push(dst);
    }
    moved.sort();
    Ok(moved)
}
